//! Prometheus metrics for the BFF server.

use prometheus::{
    Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    pub http_requests_total: Counter,
    pub http_request_duration_seconds: Histogram,
    pub http_requests_in_flight: Gauge,
    pub backend_requests_total: Counter,
    pub backend_errors_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = Counter::with_opts(Opts::new(
            "http_requests_total",
            "Total HTTP requests handled",
        ))?;
        let http_request_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ))?;
        let http_requests_in_flight = Gauge::with_opts(Opts::new(
            "http_requests_in_flight",
            "HTTP requests currently being handled",
        ))?;
        let backend_requests_total = Counter::with_opts(Opts::new(
            "backend_requests_total",
            "Requests issued to the prediction backend",
        ))?;
        let backend_errors_total = Counter::with_opts(Opts::new(
            "backend_errors_total",
            "Failed requests to the prediction backend",
        ))?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_requests_in_flight.clone()))?;
        registry.register(Box::new(backend_requests_total.clone()))?;
        registry.register(Box::new(backend_errors_total.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            http_requests_in_flight,
            backend_requests_total,
            backend_errors_total,
        })
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn export(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

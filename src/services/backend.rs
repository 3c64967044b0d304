//! Prediction backend interface and the REST implementation.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::metrics::Metrics;
use crate::models::{AggregateRequest, PredictionRequest};

pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// The three endpoints the ML backend exposes. Responses come back as
/// raw JSON; shape resolution happens in the models layer.
#[async_trait::async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Historical + predicted yearly trend for the given filters.
    async fn yearly_trend(&self, request: &PredictionRequest) -> Result<Value, BackendError>;

    /// Forward quarterly prediction (seasonality view).
    async fn quarterly_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Value, BackendError>;

    /// Dynamic aggregation, used by drill-down.
    async fn aggregate(&self, request: &AggregateRequest) -> Result<Value, BackendError>;
}

/// HTTP client for the ML backend.
pub struct RestPredictionBackend {
    base_url: String,
    client: reqwest::Client,
    metrics: Option<Arc<Metrics>>,
}

impl RestPredictionBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Construct with an injected client, for tests pointing at a mock
    /// server.
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<Value, BackendError> {
        if let Some(metrics) = &self.metrics {
            metrics.backend_requests_total.inc();
        }
        let url = format!("{}{}", self.base_url, path);
        let outcome = self.request(&url, payload).await;
        if outcome.is_err() {
            if let Some(metrics) = &self.metrics {
                metrics.backend_errors_total.inc();
            }
        }
        outcome
    }

    async fn request<T: serde::Serialize>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<Value, BackendError> {
        let response = self.client.post(url).json(payload).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait::async_trait]
impl PredictionBackend for RestPredictionBackend {
    async fn yearly_trend(&self, request: &PredictionRequest) -> Result<Value, BackendError> {
        self.post_json("/api/mishaps/yearly-trend", request).await
    }

    async fn quarterly_prediction(
        &self,
        request: &PredictionRequest,
    ) -> Result<Value, BackendError> {
        self.post_json("/api/mishaps/quarterly-prediction", request).await
    }

    async fn aggregate(&self, request: &AggregateRequest) -> Result<Value, BackendError> {
        self.post_json("/api/mishaps/aggregate", request).await
    }
}

/// Canned backend serving fixed responses. Used in tests and demos; the
/// aggregate response can differ from the trend responses so drills are
/// observable.
pub struct StaticPredictionBackend {
    trend: Arc<RwLock<Value>>,
    aggregate: Arc<RwLock<Value>>,
}

impl StaticPredictionBackend {
    pub fn new(trend: Value, aggregate: Value) -> Self {
        Self {
            trend: Arc::new(RwLock::new(trend)),
            aggregate: Arc::new(RwLock::new(aggregate)),
        }
    }

    pub async fn set_trend(&self, value: Value) {
        *self.trend.write().await = value;
    }

    pub async fn set_aggregate(&self, value: Value) {
        *self.aggregate.write().await = value;
    }
}

impl Default for StaticPredictionBackend {
    fn default() -> Self {
        Self::new(Value::Array(Vec::new()), Value::Array(Vec::new()))
    }
}

#[async_trait::async_trait]
impl PredictionBackend for StaticPredictionBackend {
    async fn yearly_trend(&self, _request: &PredictionRequest) -> Result<Value, BackendError> {
        Ok(self.trend.read().await.clone())
    }

    async fn quarterly_prediction(
        &self,
        _request: &PredictionRequest,
    ) -> Result<Value, BackendError> {
        Ok(self.trend.read().await.clone())
    }

    async fn aggregate(&self, _request: &AggregateRequest) -> Result<Value, BackendError> {
        Ok(self.aggregate.read().await.clone())
    }
}

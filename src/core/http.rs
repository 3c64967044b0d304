//! HTTP endpoint server using Axum.
//!
//! Thin surface between the browser and the engine: dashboard actions
//! go in, the published chart state comes out.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::config::Config;
use crate::dashboard::{DashboardNavigator, DrillAction, NavigatorConfig};
use crate::metrics::Metrics;
use crate::series::{RowFilter, TrendMode};
use crate::services::RestPredictionBackend;

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub navigator: Arc<DashboardNavigator<RestPredictionBackend>>,
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "service": "mishtrix-trend-engine"
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    mode: TrendMode,
}

/// Snapshot of the published dashboard state, as the browser sees it.
async fn chart_state(state: &AppState) -> Value {
    let navigator = &state.navigator;
    let result = navigator.current_result();
    let body = match result.as_deref() {
        Some(result) => json!({
            "mode": result.mode,
            "drilled": result.drilled,
            "chart": result.chart,
            "predictions": result.aggregated,
            "summary_insight": result.summary_insight,
            "unrecognized": result.unrecognized,
        }),
        None => json!({
            "mode": navigator.mode().await,
            "drilled": navigator.is_drilled().await,
            "chart": Value::Null,
        }),
    };

    let mut body = body;
    if let Some(obj) = body.as_object_mut() {
        obj.insert("loading".to_string(), json!(navigator.is_loading()));
        obj.insert(
            "breadcrumbs".to_string(),
            json!(navigator.breadcrumb_labels().await),
        );
    }
    body
}

async fn get_chart(State(state): State<AppState>) -> Json<Value> {
    Json(chart_state(&state).await)
}

async fn apply_filters(
    State(state): State<AppState>,
    Json(request): Json<ApplyRequest>,
) -> Json<Value> {
    state.navigator.apply_filters(request.mode).await;
    Json(chart_state(&state).await)
}

async fn drill(
    State(state): State<AppState>,
    Json(action): Json<DrillAction>,
) -> Json<Value> {
    state.navigator.drill(action).await;
    Json(chart_state(&state).await)
}

async fn back(State(state): State<AppState>) -> Json<Value> {
    state.navigator.back().await;
    Json(chart_state(&state).await)
}

async fn mode_selection_changed(State(state): State<AppState>) -> Json<Value> {
    state.navigator.mode_selection_changed().await;
    Json(chart_state(&state).await)
}

async fn reset(State(state): State<AppState>) -> Json<Value> {
    state.navigator.reset().await;
    Json(chart_state(&state).await)
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/dashboard/chart", get(get_chart))
        .route("/api/dashboard/apply", post(apply_filters))
        .route("/api/dashboard/drill", post(drill))
        .route("/api/dashboard/back", post(back))
        .route("/api/dashboard/mode", post(mode_selection_changed))
        .route("/api/dashboard/reset", post(reset))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = Arc::new(Metrics::new()?);
    let start_time = Arc::new(Instant::now());

    let backend = RestPredictionBackend::new(config.backend_base_url.clone())
        .with_metrics(metrics.clone());
    let filter = RowFilter::new(config.excluded_entities.clone(), config.quarter_boundary);
    let navigator = Arc::new(DashboardNavigator::new(
        backend,
        filter,
        NavigatorConfig {
            n_quarters: config.n_quarters,
            weights: config.weights,
            ..NavigatorConfig::default()
        },
    ));

    let state = AppState {
        health: Arc::new(RwLock::new(HealthStatus::default())),
        metrics,
        start_time,
        navigator,
    };
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    info!(port = config.port, "HTTP server listening on port {}", config.port);
    info!(backend = %config.backend_base_url, "Prediction backend");
    axum::serve(listener, app).await?;

    Ok(())
}

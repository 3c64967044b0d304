//! Unit tests for the drill-down navigator

use chrono::NaiveDate;
use mishtrix::dashboard::{DashboardNavigator, DrillAction, NavigatorConfig};
use mishtrix::models::{AggregateRequest, PredictionRequest};
use mishtrix::series::{RowFilter, TrendMode};
use mishtrix::services::{BackendError, PredictionBackend, StaticPredictionBackend};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::{sleep, Duration};

fn test_config() -> NavigatorConfig {
    NavigatorConfig {
        today: Some(NaiveDate::from_ymd_opt(2026, 5, 15).expect("valid date")),
        ..NavigatorConfig::default()
    }
}

fn trend_rows() -> Value {
    json!([
        { "year": 2023, "entity_value": "Aviation", "data_type": "actual", "mishap_count": 4 },
        { "year": 2024, "entity_value": "Aviation", "data_type": "predicted", "mishap_count": 6 },
        { "year": 2023, "entity_value": "Ground", "data_type": "actual", "mishap_count": 2 }
    ])
}

fn aggregate_rows() -> Value {
    json!([
        { "year": 2024, "MishapClassification": "A", "count": 3 },
        { "year": 2024, "MishapClassification": "A", "count": 4 },
        { "year": 2024, "MishapClassification": "B", "count": 1 }
    ])
}

fn static_navigator() -> DashboardNavigator<StaticPredictionBackend> {
    DashboardNavigator::new(
        StaticPredictionBackend::new(trend_rows(), aggregate_rows()),
        RowFilter::default(),
        test_config(),
    )
}

fn drill_aviation() -> DrillAction {
    DrillAction {
        entity: "Aviation".to_string(),
        year: Some(2024),
        quarter: None,
        label: None,
    }
}

#[tokio::test]
async fn test_apply_filters_publishes_chart() {
    let navigator = static_navigator();
    navigator.apply_filters(TrendMode::Year).await;

    let result = navigator.current_result().expect("result published");
    assert_eq!(result.mode, TrendMode::Year);
    assert!(!result.drilled);
    assert_eq!(result.chart.labels, vec!["2023", "2024"]);
    assert_eq!(result.chart.series.len(), 2);
    assert!(!navigator.is_loading());
}

#[tokio::test]
async fn test_quarter_mode_shows_future_predictions_only() {
    let backend = StaticPredictionBackend::new(
        json!([
            { "year": 2026, "quarter": 1, "entity_value": "Aviation", "data_type": "predicted", "mishap_count": 2 },
            { "year": 2026, "quarter": 3, "entity_value": "Aviation", "data_type": "predicted", "mishap_count": 4 },
            { "year": 2026, "quarter": 3, "entity_value": "Aviation", "data_type": "actual", "mishap_count": 9 },
            { "year": 2027, "quarter": 1, "entity_value": "Aviation", "data_type": "predicted", "mishap_count": 5 }
        ]),
        aggregate_rows(),
    );
    let navigator = DashboardNavigator::new(backend, RowFilter::default(), test_config());

    // "Today" is fixed at Q2 2026: Q1 is history, Q3 onward is forecast.
    navigator.apply_filters(TrendMode::Quarter).await;

    let result = navigator.current_result().expect("result published");
    assert_eq!(result.chart.labels, vec!["2026-Q3", "2027-Q1"]);
    assert_eq!(result.chart.series.len(), 1);
    assert_eq!(result.chart.series[0].data, vec![Some(4.0), Some(5.0)]);
}

#[tokio::test]
async fn test_drill_round_trip_restores_exact_state() {
    let navigator = static_navigator();
    navigator.apply_filters(TrendMode::Year).await;
    let before = navigator.current_result().expect("pre-drill result");

    navigator.drill(drill_aviation()).await;
    assert_eq!(navigator.mode().await, TrendMode::Classification);
    assert!(navigator.is_drilled().await);
    assert_eq!(navigator.breadcrumb_depth().await, 1);
    assert_eq!(navigator.breadcrumb_labels().await, vec!["Aviation 2024"]);

    let drilled = navigator.current_result().expect("drill result");
    assert_eq!(drilled.mode, TrendMode::Classification);
    // dedup-sum: the two partial "A" rows merged to 7
    let a_row = drilled
        .aggregated
        .iter()
        .find(|r| r.entity_value == "A")
        .expect("class A row");
    assert_eq!(a_row.mishap_count, 7.0);

    navigator.back().await;
    assert_eq!(navigator.mode().await, TrendMode::Year);
    assert!(!navigator.is_drilled().await);
    assert_eq!(navigator.breadcrumb_depth().await, 0);

    let restored = navigator.current_result().expect("restored result");
    assert!(Arc::ptr_eq(&before, &restored), "snapshot must be the same object");
}

#[tokio::test]
async fn test_nested_drills_unwind_in_order() {
    let navigator = static_navigator();
    navigator.apply_filters(TrendMode::Year).await;

    navigator.drill(drill_aviation()).await;
    navigator
        .drill(DrillAction {
            entity: "Ground".to_string(),
            year: None,
            quarter: None,
            label: None,
        })
        .await;

    assert_eq!(navigator.breadcrumb_depth().await, 2);
    assert_eq!(
        navigator.breadcrumb_labels().await,
        vec!["Aviation 2024", "Ground"]
    );

    navigator.back().await;
    // Still drilled: one breadcrumb remains above the displayed view.
    assert!(navigator.is_drilled().await);
    assert_eq!(navigator.mode().await, TrendMode::Classification);

    navigator.back().await;
    assert!(!navigator.is_drilled().await);
    assert_eq!(navigator.mode().await, TrendMode::Year);
}

#[tokio::test]
async fn test_back_on_empty_stack_is_noop() {
    let navigator = static_navigator();
    navigator.apply_filters(TrendMode::Year).await;
    let before = navigator.current_result().expect("result");

    navigator.back().await;

    assert_eq!(navigator.breadcrumb_depth().await, 0);
    let after = navigator.current_result().expect("result unchanged");
    assert!(Arc::ptr_eq(&before, &after));
}

#[tokio::test]
async fn test_drill_requires_entity() {
    let navigator = static_navigator();
    navigator.apply_filters(TrendMode::Year).await;

    navigator
        .drill(DrillAction {
            entity: "  ".to_string(),
            year: None,
            quarter: None,
            label: None,
        })
        .await;

    assert_eq!(navigator.breadcrumb_depth().await, 0);
    assert_eq!(navigator.mode().await, TrendMode::Year);
}

#[tokio::test]
async fn test_mode_selection_change_clears_display_keeps_stack() {
    let navigator = static_navigator();
    navigator.apply_filters(TrendMode::Year).await;
    navigator.drill(drill_aviation()).await;

    navigator.mode_selection_changed().await;

    assert!(navigator.current_result().is_none());
    assert_eq!(navigator.breadcrumb_depth().await, 1);
}

#[tokio::test]
async fn test_reset_clears_breadcrumbs() {
    let navigator = static_navigator();
    navigator.apply_filters(TrendMode::Year).await;
    navigator.drill(drill_aviation()).await;

    navigator.reset().await;

    assert_eq!(navigator.breadcrumb_depth().await, 0);
    assert!(navigator.current_result().is_none());
    assert!(!navigator.is_drilled().await);
}

#[tokio::test]
async fn test_unrecognized_response_shows_as_no_data() {
    let backend =
        StaticPredictionBackend::new(json!({ "predictions": "oops" }), aggregate_rows());
    let navigator = DashboardNavigator::new(backend, RowFilter::default(), test_config());

    navigator.apply_filters(TrendMode::Year).await;

    let result = navigator.current_result().expect("result published");
    assert!(result.chart.is_empty());
    assert!(result.rows.is_empty());
    assert_eq!(
        result.unrecognized,
        Some(json!({ "predictions": "oops" }))
    );
}

/// Backend that always fails, for the error paths.
struct FailingBackend;

#[async_trait::async_trait]
impl PredictionBackend for FailingBackend {
    async fn yearly_trend(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        Err("connection refused".into())
    }

    async fn quarterly_prediction(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        Err("connection refused".into())
    }

    async fn aggregate(&self, _: &AggregateRequest) -> Result<Value, BackendError> {
        Err("connection refused".into())
    }
}

/// Backend that succeeds once, then starts failing.
struct FlakyBackend {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl PredictionBackend for FlakyBackend {
    async fn yearly_trend(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(trend_rows())
        } else {
            Err("backend went away".into())
        }
    }

    async fn quarterly_prediction(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        Err("backend went away".into())
    }

    async fn aggregate(&self, _: &AggregateRequest) -> Result<Value, BackendError> {
        Err("backend went away".into())
    }
}

#[tokio::test]
async fn test_failed_prediction_keeps_previous_chart() {
    let navigator = DashboardNavigator::new(
        FlakyBackend { calls: AtomicUsize::new(0) },
        RowFilter::default(),
        test_config(),
    );

    navigator.apply_filters(TrendMode::Year).await;
    let before = navigator.current_result().expect("first apply succeeds");

    navigator.apply_filters(TrendMode::Year).await;

    // No destructive clear on error: the earlier chart stays up.
    let after = navigator.current_result().expect("result kept");
    assert!(Arc::ptr_eq(&before, &after));
    assert!(!navigator.is_loading());
}

#[tokio::test]
async fn test_failed_prediction_with_no_prior_result_stays_empty() {
    let failing = DashboardNavigator::new(FailingBackend, RowFilter::default(), test_config());
    failing.apply_filters(TrendMode::Year).await;
    assert!(failing.current_result().is_none());
    assert!(!failing.is_loading());
}

#[tokio::test]
async fn test_failed_drill_leaves_display_cleared() {
    let failing = DashboardNavigator::new(FailingBackend, RowFilter::default(), test_config());
    failing.drill(drill_aviation()).await;

    assert!(failing.current_result().is_none());
    assert!(!failing.is_loading());
    assert_eq!(failing.breadcrumb_depth().await, 1);
}

/// Backend whose first aggregate call blocks until released; later
/// calls answer immediately. Lets tests overlap two drills.
struct RaceBackend {
    calls: AtomicUsize,
    release_first: Arc<Notify>,
}

#[async_trait::async_trait]
impl PredictionBackend for RaceBackend {
    async fn yearly_trend(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        Ok(trend_rows())
    }

    async fn quarterly_prediction(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        Ok(trend_rows())
    }

    async fn aggregate(&self, _: &AggregateRequest) -> Result<Value, BackendError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.release_first.notified().await;
            Ok(json!([{ "year": 2024, "MishapClassification": "stale", "count": 1 }]))
        } else {
            Ok(json!([{ "year": 2024, "MishapClassification": "fresh", "count": 2 }]))
        }
    }
}

#[tokio::test]
async fn test_stale_drill_response_is_dropped() {
    let release_first = Arc::new(Notify::new());
    let navigator = Arc::new(DashboardNavigator::new(
        RaceBackend {
            calls: AtomicUsize::new(0),
            release_first: release_first.clone(),
        },
        RowFilter::default(),
        test_config(),
    ));

    let slow = {
        let navigator = navigator.clone();
        tokio::spawn(async move { navigator.drill(drill_aviation()).await })
    };
    // Let the first drill reach the backend before issuing the second.
    sleep(Duration::from_millis(50)).await;

    navigator
        .drill(DrillAction {
            entity: "Ground".to_string(),
            year: None,
            quarter: None,
            label: None,
        })
        .await;

    release_first.notify_one();
    slow.await.expect("slow drill task");

    // Both drills pushed a breadcrumb, but only the later response won.
    assert_eq!(navigator.breadcrumb_depth().await, 2);
    let result = navigator.current_result().expect("result");
    assert_eq!(result.aggregated.len(), 1);
    assert_eq!(result.aggregated[0].entity_value, "fresh");
    assert!(!navigator.is_loading());
}

/// Backend that parks every trend call until released, for observing
/// the loading flag mid-flight.
struct GatedBackend {
    gate: Arc<Notify>,
}

#[async_trait::async_trait]
impl PredictionBackend for GatedBackend {
    async fn yearly_trend(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        self.gate.notified().await;
        Ok(trend_rows())
    }

    async fn quarterly_prediction(&self, _: &PredictionRequest) -> Result<Value, BackendError> {
        self.gate.notified().await;
        Ok(trend_rows())
    }

    async fn aggregate(&self, _: &AggregateRequest) -> Result<Value, BackendError> {
        self.gate.notified().await;
        Ok(aggregate_rows())
    }
}

#[tokio::test]
async fn test_loading_flag_transitions_once_per_action() {
    let gate = Arc::new(Notify::new());
    let navigator = Arc::new(DashboardNavigator::new(
        GatedBackend { gate: gate.clone() },
        RowFilter::default(),
        test_config(),
    ));

    assert!(!navigator.is_loading());

    let task = {
        let navigator = navigator.clone();
        tokio::spawn(async move { navigator.apply_filters(TrendMode::Year).await })
    };
    sleep(Duration::from_millis(50)).await;
    assert!(navigator.is_loading());

    gate.notify_one();
    task.await.expect("apply task");

    assert!(!navigator.is_loading());
    assert!(navigator.current_result().is_some());
}

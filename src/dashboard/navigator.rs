//! Drill-down navigation state machine.
//!
//! Owns everything the dashboard mutates: the active mode, the drill
//! flag, the breadcrumb stack, the published result and the loading
//! flag. All transitions go through the methods here; nothing else
//! touches the state.

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{error, warn};

use crate::models::{
    normalize_response, AggregateRequest, AggregatedRow, EnsembleWeights, NormalizedResponse,
    RawRow, TrendPreset,
};
use crate::series::{
    build_chart, dedup_sum, ChartData, RowFilter, SeriesGrouping, TrendMode,
};
use crate::services::PredictionBackend;

/// The chart-bound outcome of one request, shared immutably so a
/// breadcrumb can republish the exact object it snapshotted.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardResult {
    pub mode: TrendMode,
    pub drilled: bool,
    pub rows: Vec<RawRow>,
    pub aggregated: Vec<AggregatedRow>,
    pub chart: ChartData,
    pub summary_insight: Option<String>,
    /// Unrecognized backend payload, kept for diagnostic visibility.
    pub unrecognized: Option<Value>,
}

/// Snapshot reference held by a breadcrumb. `None` means the display
/// was empty when the drill happened.
pub type ResultSnapshot = Option<Arc<DashboardResult>>;

/// One undo step: enough state to reverse a single drill.
#[derive(Debug, Clone)]
pub struct Breadcrumb {
    pub label: String,
    pub previous_mode: TrendMode,
    previous_result: ResultSnapshot,
}

/// A click on a rendered point, decoded by the chart layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DrillAction {
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Tunables the navigator carries into every request.
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub n_quarters: u32,
    pub weights: EnsembleWeights,
    pub grouping: SeriesGrouping,
    /// Fixed date for tests; `None` uses the current date.
    pub today: Option<NaiveDate>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            n_quarters: 8,
            weights: EnsembleWeights::default(),
            grouping: SeriesGrouping::default(),
            today: None,
        }
    }
}

struct NavState {
    mode: TrendMode,
    drilled: bool,
    breadcrumbs: Vec<Breadcrumb>,
    latest_request: u64,
}

pub struct DashboardNavigator<B> {
    backend: B,
    filter: RowFilter,
    config: NavigatorConfig,
    state: Mutex<NavState>,
    result_tx: watch::Sender<ResultSnapshot>,
    loading_tx: watch::Sender<bool>,
}

impl<B: PredictionBackend> DashboardNavigator<B> {
    pub fn new(backend: B, filter: RowFilter, config: NavigatorConfig) -> Self {
        let (result_tx, _) = watch::channel(None);
        let (loading_tx, _) = watch::channel(false);
        Self {
            backend,
            filter,
            config,
            state: Mutex::new(NavState {
                mode: TrendMode::Year,
                drilled: false,
                breadcrumbs: Vec::new(),
                latest_request: 0,
            }),
            result_tx,
            loading_tx,
        }
    }

    /// Subscribe to published results.
    pub fn watch_result(&self) -> watch::Receiver<ResultSnapshot> {
        self.result_tx.subscribe()
    }

    /// Subscribe to the loading flag. Exactly one true -> false
    /// transition happens per applied action.
    pub fn watch_loading(&self) -> watch::Receiver<bool> {
        self.loading_tx.subscribe()
    }

    pub fn current_result(&self) -> ResultSnapshot {
        self.result_tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading_tx.borrow()
    }

    pub async fn mode(&self) -> TrendMode {
        self.state.lock().await.mode
    }

    pub async fn is_drilled(&self) -> bool {
        self.state.lock().await.drilled
    }

    pub async fn breadcrumb_labels(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .breadcrumbs
            .iter()
            .map(|b| b.label.clone())
            .collect()
    }

    pub async fn breadcrumb_depth(&self) -> usize {
        self.state.lock().await.breadcrumbs.len()
    }

    /// Top -> Top: set the active mode and issue a fresh top-level
    /// prediction request. The only way to change top-level mode; any
    /// drill flag is cleared up front.
    pub async fn apply_filters(&self, mode: TrendMode) {
        let seq = {
            let mut st = self.state.lock().await;
            st.mode = mode;
            st.drilled = false;
            st.latest_request += 1;
            st.latest_request
        };

        let request =
            TrendPreset::for_mode(mode, self.config.n_quarters).into_request(self.config.weights);

        self.loading_tx.send_replace(true);

        let outcome = match mode {
            TrendMode::Quarter => self.backend.quarterly_prediction(&request).await,
            _ => self.backend.yearly_trend(&request).await,
        };

        let st = self.state.lock().await;
        if seq != st.latest_request {
            // Superseded by a later action; the later completion owns
            // the loading flag.
            return;
        }
        drop(st);

        match outcome {
            Ok(value) => {
                let result = self.build_top_result(mode, &value);
                self.result_tx.send_replace(Some(Arc::new(result)));
            }
            Err(e) => {
                // Previous chart state stays displayed on failure.
                error!(mode = %mode, error = %e, "prediction request failed");
            }
        }
        self.loading_tx.send_replace(false);
    }

    /// Top or Drilled -> Drilled: push a breadcrumb, switch to the
    /// classification bar view, and issue the aggregate request for the
    /// clicked entity.
    pub async fn drill(&self, action: DrillAction) {
        if action.entity.trim().is_empty() {
            warn!("drill ignored: empty entity");
            return;
        }

        let seq = {
            let mut st = self.state.lock().await;
            let label = match action.year {
                Some(year) => format!("{} {}", action.entity, year),
                None => action.entity.clone(),
            };
            let previous_mode = st.mode;
            let previous_result = self.result_tx.borrow().clone();
            st.breadcrumbs.push(Breadcrumb {
                label,
                previous_mode,
                previous_result,
            });
            st.mode = TrendMode::Classification;
            st.drilled = true;
            st.latest_request += 1;
            st.latest_request
        };

        // Clear the display before the request so a stale,
        // mode-mismatched chart never shows during load.
        self.result_tx.send_replace(None);
        self.loading_tx.send_replace(true);

        let request = AggregateRequest::for_drill(
            &action.entity,
            action.year,
            self.config.n_quarters,
            self.config.weights,
        );

        let outcome = self.backend.aggregate(&request).await;

        let st = self.state.lock().await;
        if seq != st.latest_request {
            return;
        }
        drop(st);

        match outcome {
            Ok(value) => {
                let result = self.build_drill_result(&value);
                self.result_tx.send_replace(Some(Arc::new(result)));
            }
            Err(e) => {
                // Display was cleared proactively; it stays empty.
                error!(entity = %action.entity, error = %e, "aggregate request failed");
            }
        }
        self.loading_tx.send_replace(false);
    }

    /// Drilled -> previous state: pop the most recent breadcrumb and
    /// republish its snapshot without re-querying. No-op on an empty
    /// stack. Abandons any in-flight request.
    pub async fn back(&self) {
        let mut st = self.state.lock().await;
        let Some(crumb) = st.breadcrumbs.pop() else {
            return;
        };
        st.mode = crumb.previous_mode;
        st.drilled = !st.breadcrumbs.is_empty();
        // Invalidate in-flight completions; they must not clobber the
        // restored snapshot.
        st.latest_request += 1;
        drop(st);

        self.result_tx.send_replace(crumb.previous_result);
        self.loading_tx.send_replace(false);
    }

    /// Top -> Top, pre-apply: hide the chart until the user re-applies,
    /// so stale data never shows under a mismatched mode label. The
    /// breadcrumb stack is untouched.
    pub async fn mode_selection_changed(&self) {
        self.result_tx.send_replace(None);
    }

    /// Full page reset: the only operation that clears the breadcrumb
    /// stack.
    pub async fn reset(&self) {
        let mut st = self.state.lock().await;
        st.mode = TrendMode::Year;
        st.drilled = false;
        st.breadcrumbs.clear();
        st.latest_request += 1;
        drop(st);

        self.result_tx.send_replace(None);
        self.loading_tx.send_replace(false);
    }

    fn today(&self) -> NaiveDate {
        self.config.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn build_top_result(&self, mode: TrendMode, value: &Value) -> DashboardResult {
        match normalize_response(value) {
            NormalizedResponse::Rows { rows, summary_insight } => {
                let chart =
                    build_chart(&rows, mode, &self.filter, self.config.grouping, self.today());
                let aggregated = dedup_sum(&rows);
                DashboardResult {
                    mode,
                    drilled: false,
                    rows,
                    aggregated,
                    chart,
                    summary_insight,
                    unrecognized: None,
                }
            }
            NormalizedResponse::Unrecognized(raw) => {
                warn!("unexpected prediction response shape");
                DashboardResult {
                    mode,
                    drilled: false,
                    rows: Vec::new(),
                    aggregated: Vec::new(),
                    chart: ChartData::empty(),
                    summary_insight: None,
                    unrecognized: Some(raw),
                }
            }
        }
    }

    fn build_drill_result(&self, value: &Value) -> DashboardResult {
        match normalize_response(value) {
            NormalizedResponse::Rows { rows, summary_insight } => {
                // Aggregate responses arrive sharded by data source;
                // sum them per logical bucket before charting.
                let aggregated = dedup_sum(&rows);
                let chart_rows: Vec<RawRow> = aggregated.iter().map(raw_from_aggregated).collect();
                let chart = build_chart(
                    &chart_rows,
                    TrendMode::Classification,
                    &self.filter,
                    SeriesGrouping::Entity,
                    self.today(),
                );
                DashboardResult {
                    mode: TrendMode::Classification,
                    drilled: true,
                    rows,
                    aggregated,
                    chart,
                    summary_insight,
                    unrecognized: None,
                }
            }
            NormalizedResponse::Unrecognized(raw) => {
                warn!("unexpected aggregate response shape");
                DashboardResult {
                    mode: TrendMode::Classification,
                    drilled: true,
                    rows: Vec::new(),
                    aggregated: Vec::new(),
                    chart: ChartData::empty(),
                    summary_insight: None,
                    unrecognized: Some(raw),
                }
            }
        }
    }
}

fn raw_from_aggregated(row: &AggregatedRow) -> RawRow {
    RawRow {
        year: row.year,
        quarter: row.quarter,
        label: None,
        entity_type: Some(row.entity_type.clone()),
        entity_value: Some(row.entity_value.clone()),
        data_type: row.data_type,
        count: row.mishap_count,
    }
}

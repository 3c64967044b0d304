//! Request payloads for the prediction backend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::series::TrendMode;

/// Random-forest / gradient-boosting ensemble weights. The backend
/// expects w_rf and w_gb on both prediction and aggregate endpoints;
/// values should sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub w_rf: f64,
    pub w_gb: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        // Backend route defaults.
        Self { w_rf: 0.3, w_gb: 0.7 }
    }
}

/// Top-level prediction request: keyed filters object, so the payload
/// looks like `{"filters": {"MishapType": ["Aviation","Ground"]}, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub filters: BTreeMap<String, Vec<String>>,
    pub n_quarters: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_rf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_gb: Option<f64>,
}

/// One entry of an aggregate request's filter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityFilter {
    pub entity_type: String,
    pub entity_value: Vec<String>,
}

/// Aggregate/drill request: list-shaped filters plus grouping and
/// metrics, matching the dynamic aggregation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRequest {
    pub filters: Vec<EntityFilter>,
    pub group_by: Vec<String>,
    pub metrics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_quarters: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_rf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_gb: Option<f64>,
}

/// Fixed source filter applied to every dashboard request. Keeps the
/// container-label rows out of the entity dimension.
pub const SOURCE_FILTER: (&str, &str) = ("Source", "Mishap Report");

/// Per-mode request presets for the top-level views.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPreset {
    pub filters: Vec<(String, Vec<String>)>,
    pub n_quarters: u32,
    pub start_year: i32,
    pub end_year: i32,
}

impl TrendPreset {
    /// Default presets per mode: trend views group Aviation and Ground,
    /// the classification view groups the A-E severity codes. Quarter
    /// mode requests a short forward window only.
    pub fn for_mode(mode: TrendMode, n_quarters: u32) -> Self {
        let source = (
            SOURCE_FILTER.0.to_string(),
            vec![SOURCE_FILTER.1.to_string()],
        );
        match mode {
            TrendMode::Year => Self {
                filters: vec![
                    (
                        "MishapType".to_string(),
                        vec!["Aviation".to_string(), "Ground".to_string()],
                    ),
                    source,
                ],
                n_quarters,
                start_year: 2018,
                end_year: 2025,
            },
            TrendMode::Quarter => Self {
                filters: vec![
                    (
                        "MishapType".to_string(),
                        vec!["Aviation".to_string(), "Ground".to_string()],
                    ),
                    source,
                ],
                n_quarters: 4,
                start_year: 2026,
                end_year: 2027,
            },
            TrendMode::Classification => Self {
                filters: vec![
                    (
                        "MishapClassification".to_string(),
                        vec!["A", "B", "C", "D", "E"]
                            .into_iter()
                            .map(str::to_string)
                            .collect(),
                    ),
                    source,
                ],
                n_quarters,
                start_year: 2018,
                end_year: 2025,
            },
        }
    }

    pub fn into_request(self, weights: EnsembleWeights) -> PredictionRequest {
        PredictionRequest {
            filters: self.filters.into_iter().collect(),
            n_quarters: self.n_quarters,
            start_year: Some(self.start_year),
            end_year: Some(self.end_year),
            w_rf: Some(weights.w_rf),
            w_gb: Some(weights.w_gb),
        }
    }
}

impl AggregateRequest {
    /// Build the drill request for a clicked entity: filter to that
    /// entity plus the fixed source filter, group by time and
    /// classification, count metric. A clicked year pins the window to
    /// that single year.
    pub fn for_drill(
        entity: &str,
        year: Option<i32>,
        n_quarters: u32,
        weights: EnsembleWeights,
    ) -> Self {
        Self {
            filters: vec![
                EntityFilter {
                    entity_type: "MishapType".to_string(),
                    entity_value: vec![entity.to_string()],
                },
                EntityFilter {
                    entity_type: SOURCE_FILTER.0.to_string(),
                    entity_value: vec![SOURCE_FILTER.1.to_string()],
                },
            ],
            group_by: vec!["year".to_string(), "MishapClassification".to_string()],
            metrics: vec!["mishap_count".to_string()],
            n_quarters: Some(n_quarters),
            start_year: year,
            end_year: year,
            w_rf: Some(weights.w_rf),
            w_gb: Some(weights.w_gb),
        }
    }
}

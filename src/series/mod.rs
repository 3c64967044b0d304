//! Time-series normalization, reshaping and aggregation.

pub mod aggregate;
pub mod bucket;
pub mod filter;
pub mod materialize;

pub use aggregate::{aggregate, dedup_sum, BucketValue, SeriesGroup, SeriesGrouping};
pub use bucket::{canonical_buckets, BucketKey};
pub use filter::{current_quarter, QuarterBoundary, RowFilter};
pub use materialize::{build_chart, materialize, ChartData, NamedSeries, SeriesKind};

use serde::{Deserialize, Serialize};

/// Top-level chart mode selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendMode {
    Year,
    Quarter,
    Classification,
}

impl std::fmt::Display for TrendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Year => write!(f, "year"),
            Self::Quarter => write!(f, "quarter"),
            Self::Classification => write!(f, "classification"),
        }
    }
}

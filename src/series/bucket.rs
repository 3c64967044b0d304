//! Canonical time buckets for the chart X-axis.

use serde::{Deserialize, Serialize};

use crate::models::RawRow;
use crate::series::TrendMode;

/// A single X-axis bucket: a year (optionally with a quarter), a bare
/// quarter, or a free-text label. Exactly one form is active per row.
///
/// Ordering is the axis ordering: years ascending with the year-only
/// bucket ahead of its quarters, quarter-only buckets after all dated
/// ones, free labels last and lexical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BucketKey {
    Dated { year: i32, quarter: Option<u8> },
    QuarterOnly { quarter: u8 },
    Free { label: String },
}

impl BucketKey {
    /// Build the bucket for a row under the given mode.
    ///
    /// The quarter is kept in the key only in quarter mode; elsewhere
    /// it collapses into the year bucket so the printable key equals
    /// the rendered label and equal-looking buckets always merge.
    pub fn from_row(row: &RawRow, mode: TrendMode) -> Self {
        match (row.year, row.quarter) {
            (Some(year), Some(quarter)) if mode == TrendMode::Quarter => {
                Self::Dated { year, quarter: Some(quarter) }
            }
            (Some(year), _) => Self::Dated { year, quarter: None },
            (None, Some(quarter)) => Self::QuarterOnly { quarter },
            (None, None) => Self::Free {
                label: row.label.clone().unwrap_or_default(),
            },
        }
    }

    /// The printable form, which doubles as the chart label.
    pub fn label(&self) -> String {
        match self {
            Self::Dated { year, quarter: Some(q) } => format!("{}-Q{}", year, q),
            Self::Dated { year, quarter: None } => year.to_string(),
            Self::QuarterOnly { quarter } => format!("Q{}", quarter),
            Self::Free { label } => label.clone(),
        }
    }

    /// Re-parse a printable label back into its key. Tolerates both
    /// "YYYY-Qn" and "YYYY Qn" spacing; four-digit strings resolve to
    /// dated keys so label-shaped free text merges with real years.
    pub fn parse_label(label: &str) -> Self {
        let trimmed = label.trim();

        if let Some((year, quarter)) = parse_dated_quarter(trimmed) {
            return Self::Dated { year, quarter: Some(quarter) };
        }
        if trimmed.len() == 4 {
            if let Ok(year) = trimmed.parse::<i32>() {
                return Self::Dated { year, quarter: None };
            }
        }
        if let Some(rest) = trimmed.strip_prefix('Q') {
            if let Ok(quarter) = rest.parse::<u8>() {
                if (1..=4).contains(&quarter) {
                    return Self::QuarterOnly { quarter };
                }
            }
        }

        Self::Free { label: trimmed.to_string() }
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

fn parse_dated_quarter(label: &str) -> Option<(i32, u8)> {
    let (year_part, quarter_part) = label
        .split_once("-Q")
        .or_else(|| label.split_once(" Q"))?;
    let year = year_part.parse::<i32>().ok()?;
    let quarter = quarter_part.parse::<u8>().ok().filter(|q| (1..=4).contains(q))?;
    Some((year, quarter))
}

/// Distinct bucket keys for a row set, in axis order. Input order does
/// not matter; the output is what every series aligns against.
pub fn canonical_buckets(rows: &[RawRow], mode: TrendMode) -> Vec<BucketKey> {
    let mut buckets: Vec<BucketKey> = Vec::new();
    for row in rows {
        let key = BucketKey::from_row(row, mode);
        if !buckets.contains(&key) {
            buckets.push(key);
        }
    }
    buckets.sort();
    buckets
}

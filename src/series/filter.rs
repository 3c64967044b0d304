//! Row eligibility rules.

use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

use crate::models::RawRow;
use crate::series::TrendMode;

/// Cutoff policy for the quarterly forward view. The current calendar
/// quarter sits on the boundary between history and forecast; which
/// side it lands on is configuration, not scattered call-site logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuarterBoundary {
    /// Rows at the current quarter are excluded (q <= current drops).
    #[default]
    ExcludeCurrent,
    /// Rows at the current quarter are kept (only q < current drops).
    IncludeCurrent,
}

/// Decides whether a raw row belongs on the chart at all.
#[derive(Debug, Clone)]
pub struct RowFilter {
    excluded_entities: HashSet<String>,
    boundary: QuarterBoundary,
}

impl Default for RowFilter {
    fn default() -> Self {
        // 'Mishap Report' and 'Near Miss' are container/source labels,
        // not entity values to be plotted.
        Self {
            excluded_entities: ["Mishap Report", "Near Miss"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            boundary: QuarterBoundary::default(),
        }
    }
}

impl RowFilter {
    pub fn new(excluded_entities: impl IntoIterator<Item = String>, boundary: QuarterBoundary) -> Self {
        Self {
            excluded_entities: excluded_entities.into_iter().collect(),
            boundary,
        }
    }

    pub fn with_boundary(mut self, boundary: QuarterBoundary) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn boundary(&self) -> QuarterBoundary {
        self.boundary
    }

    /// Eligibility under the given mode and date.
    ///
    /// Quarter mode shows forward-looking projections only: predicted
    /// rows in a future quarter relative to `today`. Other modes admit
    /// every row whose entity is not an excluded container label.
    pub fn is_eligible(&self, row: &RawRow, mode: TrendMode, today: NaiveDate) -> bool {
        if let Some(entity) = row.entity_value.as_deref() {
            if self.excluded_entities.contains(entity) {
                return false;
            }
        }

        if mode == TrendMode::Quarter {
            if !row.is_predicted() {
                return false;
            }
            return self.is_future_quarter(row.year, row.quarter, today);
        }

        true
    }

    fn is_future_quarter(&self, year: Option<i32>, quarter: Option<u8>, today: NaiveDate) -> bool {
        let (Some(year), Some(quarter)) = (year, quarter) else {
            // Rows without a full (year, quarter) cannot be placed on
            // the forward axis.
            return false;
        };

        let current_year = today.year();
        let current_quarter = current_quarter(today);

        if year != current_year {
            return year > current_year;
        }
        match self.boundary {
            QuarterBoundary::ExcludeCurrent => quarter > current_quarter,
            QuarterBoundary::IncludeCurrent => quarter >= current_quarter,
        }
    }
}

/// Calendar quarter of a date, 1..=4.
pub fn current_quarter(date: NaiveDate) -> u8 {
    ((date.month0() / 3) + 1) as u8
}

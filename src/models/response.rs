//! Backend response normalization.
//!
//! The backend answers with one of three shapes: a bare array of rows,
//! `{ "predictions": [...] }`, or `{ "data": [...], "summary_insight": .. }`.
//! All three normalize to the same row list here; anything else is
//! carried through unchanged so it stays visible for debugging.

use serde_json::Value;

use crate::models::rows::RawRow;

/// A backend response after shape resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResponse {
    /// Recognized row list, plus the optional summary insight some
    /// aggregate responses attach.
    Rows {
        rows: Vec<RawRow>,
        summary_insight: Option<String>,
    },
    /// Unknown shape, forwarded as-is. Downstream treats this as
    /// "no data".
    Unrecognized(Value),
}

impl NormalizedResponse {
    pub fn rows(&self) -> &[RawRow] {
        match self {
            Self::Rows { rows, .. } => rows,
            Self::Unrecognized(_) => &[],
        }
    }

    pub fn summary_insight(&self) -> Option<&str> {
        match self {
            Self::Rows { summary_insight, .. } => summary_insight.as_deref(),
            Self::Unrecognized(_) => None,
        }
    }
}

/// Resolve any of the documented response shapes into a row list.
pub fn normalize_response(response: &Value) -> NormalizedResponse {
    if let Some(items) = response.as_array() {
        return NormalizedResponse::Rows {
            rows: rows_from(items),
            summary_insight: None,
        };
    }

    if let Some(obj) = response.as_object() {
        if let Some(items) = obj.get("predictions").and_then(Value::as_array) {
            return NormalizedResponse::Rows {
                rows: rows_from(items),
                summary_insight: None,
            };
        }
        if let Some(items) = obj.get("data").and_then(Value::as_array) {
            return NormalizedResponse::Rows {
                rows: rows_from(items),
                summary_insight: obj
                    .get("summary_insight")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            };
        }
    }

    NormalizedResponse::Unrecognized(response.clone())
}

fn rows_from(items: &[Value]) -> Vec<RawRow> {
    items.iter().map(RawRow::from_value).collect()
}

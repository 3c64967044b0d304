//! Raw backend rows and their canonical, alias-resolved view.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered alias tables for the loosely-typed fields the backend emits.
/// Resolution picks the first alias present on the row, so downstream
/// code only ever sees canonical field names.
const YEAR_ALIASES: &[&str] = &["year", "y"];
const QUARTER_ALIASES: &[&str] = &["quarter", "q"];
const ENTITY_TYPE_ALIASES: &[&str] = &["entity_type", "entityType"];
const ENTITY_VALUE_ALIASES: &[&str] = &[
    "entity_value",
    "entityValue",
    "MishapClassification",
    "mishapclassification",
    "classification",
];
const DATA_TYPE_ALIASES: &[&str] = &["data_type", "dataType"];
const COUNT_ALIASES: &[&str] = &[
    "mishap_count",
    "mishapCount",
    "predicted_value",
    "value",
    "count",
];

/// Provenance tag for a count at a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Actual,
    Predicted,
}

impl DataType {
    /// Anything that is not literally "predicted" counts as actual,
    /// including a missing tag.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("predicted") => Self::Predicted,
            _ => Self::Actual,
        }
    }

    pub fn is_actual(self) -> bool {
        matches!(self, Self::Actual)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Actual => write!(f, "actual"),
            Self::Predicted => write!(f, "predicted"),
        }
    }
}

/// One backend row after alias resolution. All fields are optional at
/// this stage; eligibility and defaulting happen further down the
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub label: Option<String>,
    pub entity_type: Option<String>,
    pub entity_value: Option<String>,
    pub data_type: DataType,
    pub count: f64,
}

impl RawRow {
    /// Resolve a raw JSON object into a canonical row. Non-object
    /// values produce an empty row rather than an error; the filter
    /// stage drops them.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::empty();
        };

        Self {
            year: field(obj, YEAR_ALIASES).and_then(coerce_int).map(|y| y as i32),
            quarter: field(obj, QUARTER_ALIASES)
                .and_then(coerce_int)
                .filter(|q| (1..=4).contains(q))
                .map(|q| q as u8),
            label: field(obj, &["label"]).and_then(Value::as_str).map(str::to_string),
            entity_type: field(obj, ENTITY_TYPE_ALIASES)
                .and_then(Value::as_str)
                .map(str::to_string),
            entity_value: field(obj, ENTITY_VALUE_ALIASES)
                .and_then(Value::as_str)
                .map(str::to_string),
            data_type: DataType::parse(field(obj, DATA_TYPE_ALIASES).and_then(Value::as_str)),
            count: field(obj, COUNT_ALIASES).map(coerce_count).unwrap_or(0.0),
        }
    }

    fn empty() -> Self {
        Self {
            year: None,
            quarter: None,
            label: None,
            entity_type: None,
            entity_value: None,
            data_type: DataType::Actual,
            count: 0.0,
        }
    }

    pub fn is_predicted(&self) -> bool {
        self.data_type == DataType::Predicted
    }
}

/// The pipeline's normalized output unit: exactly one row per
/// (year, quarter, entity_type, entity_value, data_type) key, with
/// counts summed across contributing rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<u8>,
    pub entity_type: String,
    pub entity_value: String,
    pub data_type: DataType,
    pub mishap_count: f64,
}

fn field<'a>(obj: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|name| obj.get(*name))
        .filter(|v| !v.is_null())
}

/// Numeric coercion for count fields. Strips thousands separators from
/// string values; anything unparseable becomes zero, never an error.
pub fn coerce_count(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.replace(',', "").trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

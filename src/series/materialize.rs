//! Chart-ready series materialization.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{DataType, RawRow};
use crate::series::aggregate::{aggregate, SeriesGroup, SeriesGrouping};
use crate::series::bucket::{canonical_buckets, BucketKey};
use crate::series::filter::RowFilter;
use crate::series::TrendMode;

/// How the renderer should draw a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Line,
    Bar,
}

/// One rendered series: a dense value array aligned 1:1 with the shared
/// label axis. Gaps are `None` (JSON null), never zero, since zero is a real
/// observed count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub color: String,
    pub kind: SeriesKind,
    pub dashed: bool,
    pub data: Vec<Option<f64>>,
}

/// The normalized structure the charting layer consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub series: Vec<NamedSeries>,
}

impl ChartData {
    pub fn empty() -> Self {
        Self { labels: Vec::new(), series: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Align each group against the canonical bucket list. Labels are
/// resolved back to keys through the tolerant parser, so "2020 Q1"
/// spacing variants still land on the "2020-Q1" bucket.
pub fn materialize(groups: &[SeriesGroup], buckets: &[BucketKey], mode: TrendMode) -> ChartData {
    let labels: Vec<String> = buckets.iter().map(BucketKey::label).collect();

    let series = groups
        .iter()
        .map(|group| {
            let data: Vec<Option<f64>> = labels
                .iter()
                .map(|label| {
                    let key = BucketKey::parse_label(label);
                    group.buckets.get(&key).map(|entry| entry.value)
                })
                .collect();

            NamedSeries {
                color: series_color(&group.name, mode),
                kind: series_kind(mode),
                dashed: group.data_type == Some(DataType::Predicted),
                name: group.name.clone(),
                data,
            }
        })
        .collect();

    ChartData { labels, series }
}

/// Full pipeline for one response: classify, aggregate, bucket, align.
pub fn build_chart(
    rows: &[RawRow],
    mode: TrendMode,
    filter: &RowFilter,
    grouping: SeriesGrouping,
    today: NaiveDate,
) -> ChartData {
    let eligible: Vec<RawRow> = rows
        .iter()
        .filter(|row| filter.is_eligible(row, mode, today))
        .cloned()
        .collect();

    let groups = aggregate(&eligible, mode, grouping);
    let buckets = canonical_buckets(&eligible, mode);
    materialize(&groups, &buckets, mode)
}

fn series_kind(mode: TrendMode) -> SeriesKind {
    match mode {
        TrendMode::Classification => SeriesKind::Bar,
        _ => SeriesKind::Line,
    }
}

/// Fixed per-mode entity palettes, with a stable hash fallback so an
/// unknown entity keeps the same color across re-renders without any
/// color registry.
fn series_color(name: &str, mode: TrendMode) -> String {
    let table: &[(&str, &str)] = match mode {
        TrendMode::Year | TrendMode::Quarter => {
            &[("Aviation", "#1f77b4"), ("Ground", "#ff7f0e")]
        }
        TrendMode::Classification => &[
            ("A", "#2ca02c"),
            ("B", "#d62728"),
            ("C", "#9467bd"),
            ("D", "#8c564b"),
            ("E", "#17becf"),
        ],
    };

    // Dual-mode series names carry a data-type suffix; match on the
    // entity prefix so both variants share the entity hue.
    if let Some((_, color)) = table
        .iter()
        .find(|(entity, _)| name == *entity || name.starts_with(&format!("{} (", entity)))
    {
        return (*color).to_string();
    }

    format!("hsl({} 70% 45%)", stable_hue(name))
}

fn stable_hue(name: &str) -> u32 {
    let mut hash: u32 = 2166136261;
    for byte in name.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16777619);
    }
    hash % 360
}

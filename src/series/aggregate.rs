//! Grouping and per-bucket value resolution.

use std::collections::HashMap;

use crate::models::{AggregatedRow, DataType, RawRow};
use crate::series::bucket::BucketKey;
use crate::series::TrendMode;

/// How rows fan out into chart series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesGrouping {
    /// One series per entity; actual and predicted points merge into a
    /// single continuous line. Also used for classification bar drills.
    #[default]
    Entity,
    /// One series per (entity, data type) pair, so actuals render solid
    /// and predictions dashed.
    EntityAndDataType,
}

/// Resolved value for one bucket within a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketValue {
    pub value: f64,
    pub has_actual: bool,
}

/// One chart series in the making: a display name, the provenance of
/// its rows (uniform only under dual grouping), and bucket values.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesGroup {
    pub name: String,
    pub data_type: Option<DataType>,
    pub buckets: HashMap<BucketKey, BucketValue>,
}

/// Group rows into series, resolving actual-vs-predicted conflicts per
/// bucket. Group order is insertion order, which the legend preserves.
///
/// Conflict rule: an actual value always wins over predicted for the
/// same bucket (the first actual is kept); among predicted-only values
/// the last write wins.
pub fn aggregate(rows: &[RawRow], mode: TrendMode, grouping: SeriesGrouping) -> Vec<SeriesGroup> {
    let mut groups: Vec<SeriesGroup> = Vec::new();

    for row in rows {
        let entity = row.entity_value.as_deref().unwrap_or("unknown");
        let (name, group_data_type) = match grouping {
            SeriesGrouping::Entity => (entity.to_string(), None),
            SeriesGrouping::EntityAndDataType => (
                format!("{} ({})", entity, row.data_type),
                Some(row.data_type),
            ),
        };

        let idx = match groups.iter().position(|g| g.name == name) {
            Some(idx) => idx,
            None => {
                groups.push(SeriesGroup {
                    name,
                    data_type: group_data_type,
                    buckets: HashMap::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[idx];

        let key = BucketKey::from_row(row, mode);
        let incoming_actual = row.data_type.is_actual();
        match group.buckets.get_mut(&key) {
            None => {
                group.buckets.insert(
                    key,
                    BucketValue { value: row.count, has_actual: incoming_actual },
                );
            }
            Some(existing) if existing.has_actual => {
                // Actual supersedes predicted, never the reverse.
            }
            Some(existing) => {
                existing.value = row.count;
                existing.has_actual = incoming_actual;
            }
        }
    }

    groups
}

#[derive(PartialEq, Eq, Hash)]
struct DedupKey {
    year: Option<i32>,
    quarter: Option<u8>,
    entity_type: String,
    entity_value: String,
    data_type: DataType,
}

/// Sum-dedup for aggregate endpoint responses: backends that shard by
/// data source emit several partial rows for one logical bucket, and
/// those must add up. Rows with no entity/classification value are
/// dropped rather than defaulted.
pub fn dedup_sum(rows: &[RawRow]) -> Vec<AggregatedRow> {
    let mut order: Vec<DedupKey> = Vec::new();
    let mut sums: HashMap<DedupKey, f64> = HashMap::new();

    for row in rows {
        let Some(entity_value) = row.entity_value.clone() else {
            continue;
        };
        let key = DedupKey {
            year: row.year,
            quarter: row.quarter,
            entity_type: row.entity_type.clone().unwrap_or_default(),
            entity_value,
            data_type: row.data_type,
        };
        if !sums.contains_key(&key) {
            order.push(DedupKey {
                year: key.year,
                quarter: key.quarter,
                entity_type: key.entity_type.clone(),
                entity_value: key.entity_value.clone(),
                data_type: key.data_type,
            });
        }
        *sums.entry(key).or_insert(0.0) += row.count;
    }

    order
        .into_iter()
        .map(|key| {
            let mishap_count = sums[&key];
            AggregatedRow {
                year: key.year,
                quarter: key.quarter,
                entity_type: key.entity_type,
                entity_value: key.entity_value,
                data_type: key.data_type,
                mishap_count,
            }
        })
        .collect()
}

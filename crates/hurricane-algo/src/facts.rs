//! Event counts per time bucket and street segment.

use crate::time_buckets::bucket_index;
use hurricane_core::{EventRecord, HurricaneError, HurricaneResult, SegmentId, TimeBucket, TimeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRow {
    pub time_id: TimeId,
    pub segment_id: SegmentId,
    /// Values of the table's feature columns, in column order.
    pub features: Vec<String>,
    /// One count per category, in the table's category order.
    pub counts: Vec<u64>,
}

impl FactRow {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Pivoted fact table: one integer column per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactTable {
    pub feature_columns: Vec<String>,
    pub categories: Vec<String>,
    pub rows: Vec<FactRow>,
}

impl FactTable {
    /// Sum of all category counts per segment.
    pub fn segment_totals(&self) -> HashMap<SegmentId, u64> {
        let mut totals = HashMap::new();
        for row in &self.rows {
            *totals.entry(row.segment_id).or_insert(0) += row.total();
        }
        totals
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Count `events` per `(time bucket, segment, feature values)` and pivot the
/// categories into columns.
///
/// The category columns are the sorted union of `categories` and the labels
/// seen in `events`; a category without events in a group counts 0. Rows come
/// out sorted by `(time_id, segment_id, features)`.
///
/// An event without a segment or whose time key has no bucket in `ledger` is
/// a [`HurricaneError::Integrity`] error.
pub fn build_fact_table(
    events: &[EventRecord],
    ledger: &[TimeBucket],
    feature_columns: &[String],
    categories: &[String],
) -> HurricaneResult<FactTable> {
    let buckets = bucket_index(ledger);
    let categories: Vec<String> = categories
        .iter()
        .cloned()
        .chain(events.iter().map(|e| e.category.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let column_of: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();

    let mut groups: BTreeMap<(TimeId, SegmentId, Vec<String>), Vec<u64>> = BTreeMap::new();
    for event in events {
        let segment_id = event.segment_id.ok_or_else(|| {
            HurricaneError::Integrity(format!("event '{}' has no segment", event.key))
        })?;
        let time_key = event.time_key();
        let time_id = *buckets.get(&time_key).ok_or_else(|| {
            HurricaneError::Integrity(format!(
                "event '{}' has no time bucket for {time_key:?}",
                event.key
            ))
        })?;
        let features = feature_columns
            .iter()
            .map(|column| event.features.get(column).cloned().unwrap_or_default())
            .collect();
        let counts = groups
            .entry((time_id, segment_id, features))
            .or_insert_with(|| vec![0; categories.len()]);
        counts[column_of[event.category.as_str()]] += 1;
    }

    let rows: Vec<FactRow> = groups
        .into_iter()
        .map(|((time_id, segment_id, features), counts)| FactRow {
            time_id,
            segment_id,
            features,
            counts,
        })
        .collect();
    debug!(
        events = events.len(),
        rows = rows.len(),
        categories = categories.len(),
        "built fact table"
    );
    Ok(FactTable {
        feature_columns: feature_columns.to_vec(),
        categories,
        rows,
    })
}

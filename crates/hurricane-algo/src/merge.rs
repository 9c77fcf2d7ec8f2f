//! Incremental merge of freshly extracted events into a partition ledger.

use crate::locator::EventLocator;
use hurricane_core::geodesy::float_text;
use hurricane_core::{EventCandidate, EventRecord, HurricaneError, HurricaneResult, SegmentId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Digit suffixes processed when none are configured.
pub const DEFAULT_PARTITIONS: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Partition an event belongs to: the last character of its longitude text,
/// when that digit is one of `partitions`.
///
/// The text is the shortest round-trip form with a mandatory fractional part,
/// so a given longitude lands in the same partition on every run.
pub fn partition_of(longitude: f64, partitions: &[u8]) -> Option<u8> {
    let digit = float_text(longitude).chars().last()?.to_digit(10)? as u8;
    partitions.contains(&digit).then_some(digit)
}

/// Bookkeeping of one partition merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub candidates: usize,
    /// Candidates missing date, period, latitude or longitude.
    pub incomplete: usize,
    /// Candidates shadowed by a later row with the same key.
    pub duplicates: usize,
    /// Candidates already present in the ledger with identical fields.
    pub unchanged: usize,
    pub inserted: usize,
    /// Ledger rows superseded by a new row with the same key.
    pub replaced: usize,
    /// Distinct coordinates sent to the locator.
    pub located: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub rows: Vec<EventRecord>,
    pub stats: MergeStats,
}

impl MergeOutcome {
    /// True when the merge added nothing and the ledger can stay as it is.
    pub fn is_noop(&self) -> bool {
        self.stats.inserted == 0
    }
}

/// Merge `candidates` into the `persisted` rows of one partition.
///
/// **Algorithm:**
/// 1. Drop incomplete candidates and sort the rest by `(latitude, longitude)`
///    (stable, so equal coordinates keep their extraction order).
/// 2. Keep only the last candidate of every `(category, key)` identity.
///    Interfaces build their keys independently, so the same key text under
///    two categories names two different events.
/// 3. Diff against the ledger on `(key, date, period, latitude, longitude,
///    category)`; rows already present are skipped.
/// 4. Locate every distinct coordinate of the remaining rows once and copy
///    the segment id onto each row sharing it.
/// 5. Ledger rows whose identity reappears are superseded (last write wins);
///    the new rows are appended after the surviving ledger rows.
///
/// Repeating a merge with the same inputs returns the same rows. An identity
/// that still occurs twice afterwards is a [`HurricaneError::Integrity`]
/// error.
pub fn merge_partition(
    persisted: Vec<EventRecord>,
    candidates: Vec<EventCandidate>,
    locator: &EventLocator<'_>,
) -> HurricaneResult<MergeOutcome> {
    let mut stats = MergeStats {
        candidates: candidates.len(),
        ..MergeStats::default()
    };

    let mut complete: Vec<EventRecord> = candidates
        .into_iter()
        .filter_map(EventCandidate::complete)
        .collect();
    stats.incomplete = stats.candidates - complete.len();
    complete.sort_by(|a, b| {
        a.latitude
            .total_cmp(&b.latitude)
            .then(a.longitude.total_cmp(&b.longitude))
    });

    let deduped = dedup_keep_last(complete);
    stats.duplicates = stats.candidates - stats.incomplete - deduped.len();

    let known: HashSet<_> = persisted.iter().map(EventRecord::comparable).collect();
    let mut fresh: Vec<EventRecord> = deduped
        .into_iter()
        .filter(|row| !known.contains(&row.comparable()))
        .collect();
    stats.unchanged = stats.candidates - stats.incomplete - stats.duplicates - fresh.len();

    let mut located: HashMap<(u64, u64), SegmentId> = HashMap::new();
    for row in &mut fresh {
        let group = (row.latitude.to_bits(), row.longitude.to_bits());
        let segment = match located.get(&group) {
            Some(segment) => *segment,
            None => {
                let segment = locator.locate(row.coord())?;
                located.insert(group, segment);
                segment
            }
        };
        row.segment_id = Some(segment);
    }
    stats.located = located.len();
    stats.inserted = fresh.len();

    let superseded: HashSet<(String, String)> = fresh
        .iter()
        .map(|row| (row.category.clone(), row.key.clone()))
        .collect();
    let before = persisted.len();
    let mut rows: Vec<EventRecord> = persisted
        .into_iter()
        .filter(|row| !superseded.contains(&(row.category.clone(), row.key.clone())))
        .collect();
    stats.replaced = before - rows.len();
    rows.extend(fresh);

    ensure_unique_keys(&rows)?;
    debug!(
        candidates = stats.candidates,
        inserted = stats.inserted,
        replaced = stats.replaced,
        located = stats.located,
        rows = rows.len(),
        "merged partition"
    );
    Ok(MergeOutcome { rows, stats })
}

/// Merge identity of a row: its category and natural key.
fn identity(row: &EventRecord) -> (&str, &str) {
    (row.category.as_str(), row.key.as_str())
}

/// Keep the last row of every identity, preserving the relative order of
/// survivors.
fn dedup_keep_last(rows: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut last: HashMap<(&str, &str), usize> = HashMap::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        last.insert(identity(row), index);
    }
    let keep: HashSet<usize> = last.into_values().collect();
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| keep.contains(&index).then_some(row))
        .collect()
}

fn ensure_unique_keys(rows: &[EventRecord]) -> HurricaneResult<()> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(identity(row)) {
            return Err(HurricaneError::Integrity(format!(
                "natural key '{}' of '{}' occurs more than once after merge",
                row.key, row.category
            )));
        }
    }
    Ok(())
}

//! Event pipeline stages that run before the partition merge: raw batch
//! ingestion and the network version check.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hurricane_algo::{normalize_interface, InterfaceSpec, VersionGate};
use hurricane_core::{EventCandidate, HistoricMarker, HurricaneError};
use hurricane_io::{generation_exists, read_raw_csv, tables, LakeLayout, TableStore};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::ledgers::{read_candidates, read_markers, write_markers};

/// Every digit a partition ledger can carry.
const PARTITION_DIGITS: std::ops::RangeInclusive<u8> = 0..=9;

/// A raw event file and the interface describing its columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceSource {
    #[serde(flatten)]
    pub spec: InterfaceSpec,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub interface: String,
    /// Rows normalized from the raw file.
    pub rows: usize,
    pub dropped: usize,
    pub duplicates: usize,
    /// Rows of earlier batches replaced by a row of this one.
    pub replaced: usize,
    /// Rows in the bronze batch after the ingest.
    pub total: usize,
    pub output: PathBuf,
    /// Where the consumed raw file was moved.
    pub archived: Option<PathBuf>,
}

/// Append `fresh` to the `stored` rows, keeping the last row of every
/// `(category, key)` identity. Returns the surviving rows and how many stored
/// rows were replaced.
fn accumulate(
    stored: Vec<EventCandidate>,
    fresh: Vec<EventCandidate>,
) -> (Vec<EventCandidate>, usize) {
    let stored_len = stored.len();
    let rows: Vec<EventCandidate> = stored.into_iter().chain(fresh).collect();
    let mut last: HashMap<(&str, &str), usize> = HashMap::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        last.insert((row.category.as_str(), row.key.as_str()), index);
    }
    let keep: HashSet<usize> = last.into_values().collect();
    let replaced = (0..stored_len).filter(|index| !keep.contains(index)).count();
    let rows = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| keep.contains(&index).then_some(row))
        .collect();
    (rows, replaced)
}

/// Normalize one raw file and fold it into the interface's bronze batch.
///
/// Rows already in the batch stay unless the new file carries the same key,
/// in which case the new row wins. Once the batch is written the raw file is
/// moved to `<workdir>/raw/historic/` under `today`'s date.
pub fn ingest_interface(
    layout: &LakeLayout,
    store: &dyn TableStore,
    source: &InterfaceSource,
    today: NaiveDate,
) -> Result<IngestReport> {
    let raw = read_raw_csv(&source.path)?;
    let batch = normalize_interface(&source.spec, raw)
        .with_context(|| format!("normalizing interface '{}'", source.spec.name))?;
    let rows = batch.rows.len();

    let output = layout.interface(&source.spec.name);
    let stored = read_candidates(store, &output)?;
    let (merged, replaced) = accumulate(stored, batch.rows);
    let mut df = tables::candidate_frame(&merged, &source.spec.feature_columns)?;
    store.write(&output, &mut df)?;

    let label = HistoricMarker::new(today).label();
    let archived = store
        .archive(&source.path, &layout.raw_historic_dir(), &label)
        .with_context(|| format!("archiving raw file {}", source.path.display()))?;
    info!(
        interface = %source.spec.name,
        rows,
        dropped = batch.dropped,
        duplicates = batch.duplicates,
        replaced,
        total = merged.len(),
        "interface ingested"
    );
    Ok(IngestReport {
        interface: source.spec.name.clone(),
        rows,
        dropped: batch.dropped,
        duplicates: batch.duplicates,
        replaced,
        total: merged.len(),
        output,
        archived,
    })
}

/// Ingest every source. A missing raw file is skipped with a warning; any
/// other failure aborts.
pub fn ingest_interfaces(
    layout: &LakeLayout,
    store: &dyn TableStore,
    sources: &[InterfaceSource],
    today: NaiveDate,
) -> Result<Vec<IngestReport>> {
    let mut reports = Vec::with_capacity(sources.len());
    for source in sources {
        match ingest_interface(layout, store, source, today) {
            Ok(report) => reports.push(report),
            Err(err)
                if err
                    .downcast_ref::<HurricaneError>()
                    .is_some_and(HurricaneError::is_not_found) =>
            {
                warn!(interface = %source.spec.name, "{err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(reports)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSync {
    /// The network was rebuilt since the event pipeline last ran.
    pub changed: bool,
    /// Outputs moved to the historic areas because they refer to the old
    /// network.
    pub archived: Vec<PathBuf>,
}

/// Compare the network ledger with the one the event pipeline saw last.
///
/// When the network changed, every partition ledger in the lake and the fact
/// table are archived under the date of the network they were computed
/// against, and the current ledger is recorded as seen. Ledgers of partitions
/// outside the current run are archived too. Fails with
/// [`HurricaneError::NotFound`] when there is no committed network or its
/// historic ledger is missing.
pub fn sync_network_version(layout: &LakeLayout, store: &dyn TableStore) -> Result<VersionSync> {
    if !generation_exists(&layout.network_dir()) {
        return Err(HurricaneError::NotFound(format!(
            "network generation {}",
            layout.network_dir().display()
        ))
        .into());
    }
    let model = read_markers(store, &layout.model_historic_dates())?;
    if model.is_empty() {
        return Err(HurricaneError::NotFound(format!(
            "historic ledger {}",
            layout.model_historic_dates().display()
        ))
        .into());
    }
    let gate = VersionGate::new(model)?;
    let seen_path = layout.seen_historic_dates();
    let seen = read_markers(store, &seen_path)?;

    if !gate.changed_since(&seen) {
        info!("network unchanged since last event run");
        return Ok(VersionSync::default());
    }

    let label = seen
        .iter()
        .max()
        .copied()
        .or_else(|| gate.latest())
        .map(|marker| marker.label())
        .unwrap_or_default();
    let mut archived = Vec::new();
    for partition in PARTITION_DIGITS {
        if let Some(path) = store.archive(
            &layout.partition(partition),
            &layout.silver_historic_dir(),
            &label,
        )? {
            archived.push(path);
        }
    }
    if let Some(path) = store.archive(&layout.fact(), &layout.gold_historic_dir(), &label)? {
        archived.push(path);
    }
    write_markers(store, &seen_path, gate.markers())?;
    info!(archived = archived.len(), "network changed; event outputs archived");

    Ok(VersionSync {
        changed: true,
        archived,
    })
}

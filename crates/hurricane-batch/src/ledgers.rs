//! Typed reads and writes of the lake's ledgers through a [`TableStore`].
//!
//! A missing ledger reads as empty.

use anyhow::{Context, Result};
use hurricane_algo::FactTable;
use hurricane_core::{EventCandidate, EventRecord, HistoricMarker, TimeBucket};
use hurricane_io::tables;
use hurricane_io::TableStore;
use std::path::Path;

pub fn read_markers(store: &dyn TableStore, path: &Path) -> Result<Vec<HistoricMarker>> {
    match store.read(path)? {
        Some(df) => tables::markers_from_frame(&df)
            .with_context(|| format!("decoding markers {}", path.display())),
        None => Ok(Vec::new()),
    }
}

pub fn write_markers(store: &dyn TableStore, path: &Path, markers: &[HistoricMarker]) -> Result<()> {
    store.write(path, &mut tables::marker_frame(markers)?)
}

pub fn read_events(store: &dyn TableStore, path: &Path) -> Result<Vec<EventRecord>> {
    match store.read(path)? {
        Some(df) => tables::events_from_frame(&df)
            .with_context(|| format!("decoding events {}", path.display())),
        None => Ok(Vec::new()),
    }
}

pub fn write_events(
    store: &dyn TableStore,
    path: &Path,
    events: &[EventRecord],
    feature_columns: &[String],
) -> Result<()> {
    store.write(path, &mut tables::event_frame(events, feature_columns)?)
}

pub fn read_candidates(store: &dyn TableStore, path: &Path) -> Result<Vec<EventCandidate>> {
    match store.read(path)? {
        Some(df) => tables::candidates_from_frame(&df)
            .with_context(|| format!("decoding candidates {}", path.display())),
        None => Ok(Vec::new()),
    }
}

pub fn read_time(store: &dyn TableStore, path: &Path) -> Result<Vec<TimeBucket>> {
    match store.read(path)? {
        Some(df) => {
            tables::time_from_frame(&df).with_context(|| format!("decoding time {}", path.display()))
        }
        None => Ok(Vec::new()),
    }
}

pub fn read_facts(store: &dyn TableStore, path: &Path) -> Result<FactTable> {
    match store.read(path)? {
        Some(df) => tables::fact_from_frame(&df)
            .with_context(|| format!("decoding facts {}", path.display())),
        None => Ok(FactTable::default()),
    }
}

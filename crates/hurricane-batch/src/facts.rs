//! Fact stage: event counts per time bucket and segment in the gold tier.

use anyhow::Result;
use hurricane_algo::build_fact_table;
use hurricane_io::{tables, LakeLayout, TableStore};
use tracing::info;

use crate::ledgers::{read_events, read_time};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactReport {
    pub rows: usize,
    pub events: usize,
    pub categories: Vec<String>,
}

/// Recount every partition ledger against the time ledger and replace the
/// fact table.
pub fn build_facts(
    layout: &LakeLayout,
    store: &dyn TableStore,
    partitions: &[u8],
    feature_columns: &[String],
    categories: &[String],
) -> Result<FactReport> {
    let mut events = Vec::new();
    for &partition in partitions {
        events.extend(read_events(store, &layout.partition(partition))?);
    }
    let ledger = read_time(store, &layout.time())?;
    let table = build_fact_table(&events, &ledger, feature_columns, categories)?;

    store.write(&layout.fact(), &mut tables::fact_frame(&table)?)?;
    info!(
        rows = table.rows.len(),
        events = events.len(),
        "fact table written"
    );
    Ok(FactReport {
        rows: table.rows.len(),
        events: events.len(),
        categories: table.categories,
    })
}

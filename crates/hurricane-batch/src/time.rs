//! Time-domain stage: extend the time ledger with the buckets of every
//! merged event.

use anyhow::Result;
use hurricane_algo::{allocate_time_buckets, derive_time_keys};
use hurricane_io::{tables, LakeLayout, TableStore};
use tracing::info;

use crate::ledgers::{read_events, read_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReport {
    pub buckets: usize,
    pub added: usize,
}

pub fn allocate_time(
    layout: &LakeLayout,
    store: &dyn TableStore,
    partitions: &[u8],
) -> Result<TimeReport> {
    let mut events = Vec::new();
    for &partition in partitions {
        events.extend(read_events(store, &layout.partition(partition))?);
    }
    let keys = derive_time_keys(&events);

    let path = layout.time();
    let allocation = allocate_time_buckets(read_time(store, &path)?, keys)?;
    if allocation.added > 0 {
        store.write(&path, &mut tables::time_frame(&allocation.ledger)?)?;
    }
    info!(
        buckets = allocation.ledger.len(),
        added = allocation.added,
        "time ledger updated"
    );
    Ok(TimeReport {
        buckets: allocation.ledger.len(),
        added: allocation.added,
    })
}

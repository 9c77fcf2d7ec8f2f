//! Partition fan-out of the incremental event merge.

use crate::events::sync_network_version;
use crate::job::{jobs_for_partitions, PartitionJob, PartitionRecord};
use crate::ledgers::{read_candidates, read_events, write_events};
use crate::manifest::{write_run_manifest, RunManifest};
use crate::network::load_network;
use anyhow::{Context, Result};
use chrono::Utc;
use hurricane_algo::{merge_partition, partition_of, EventLocator};
use hurricane_core::EventCandidate;
use hurricane_io::{LakeLayout, TableStore};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

pub struct MergeRunConfig {
    /// Longitude digit suffixes to process.
    pub partitions: Vec<u8>,
    /// Interfaces whose bronze batches feed the merge.
    pub interfaces: Vec<String>,
    /// Feature columns persisted with every event.
    pub feature_columns: Vec<String>,
    /// Worker threads; 0 uses every core.
    pub threads: usize,
}

pub struct MergeSummary {
    pub success: usize,
    pub failure: usize,
    pub network_changed: bool,
    /// Candidates outside every configured partition.
    pub unpartitioned: usize,
    pub manifest_path: PathBuf,
    pub jobs: Vec<PartitionRecord>,
}

/// Split candidates by partition. Rows without a longitude or whose digit is
/// not configured are counted and left out.
fn split_by_partition(
    candidates: Vec<EventCandidate>,
    partitions: &[u8],
) -> (HashMap<u8, Vec<EventCandidate>>, usize) {
    let mut split: HashMap<u8, Vec<EventCandidate>> = HashMap::new();
    let mut unpartitioned = 0;
    for candidate in candidates {
        match candidate
            .longitude
            .and_then(|lon| partition_of(lon, partitions))
        {
            Some(partition) => split.entry(partition).or_default().push(candidate),
            None => unpartitioned += 1,
        }
    }
    (split, unpartitioned)
}

/// Merge the bronze batches of every interface into the partition ledgers.
///
/// Partitions run concurrently on a dedicated pool and each one writes only
/// its own ledger, on full success. A failing partition is recorded as
/// `"error"` in the run manifest and does not stop its siblings.
pub fn run_merge(
    layout: &LakeLayout,
    store: &dyn TableStore,
    config: &MergeRunConfig,
) -> Result<MergeSummary> {
    let sync = sync_network_version(layout, store)?;
    let network = load_network(layout).context("loading network generation")?;
    let locator = EventLocator::new(&network)?;

    let mut candidates = Vec::new();
    for interface in &config.interfaces {
        let batch = read_candidates(store, &layout.interface(interface))?;
        if batch.is_empty() {
            warn!(interface = %interface, "no bronze batch");
        }
        candidates.extend(batch);
    }
    let (mut split, unpartitioned) = split_by_partition(candidates, &config.partitions);
    if unpartitioned > 0 {
        warn!(rows = unpartitioned, "candidates outside configured partitions");
    }

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for partition merge")?;

    let work: Vec<(PartitionJob, Vec<EventCandidate>)> =
        jobs_for_partitions(layout, &config.partitions)
            .into_iter()
            .map(|job| {
                let rows = split.remove(&job.partition).unwrap_or_default();
                (job, rows)
            })
            .collect();

    let records: Vec<PartitionRecord> = pool.install(|| {
        work.into_par_iter()
            .map(|(job, rows)| run_job(&job, rows, &locator, store, &config.feature_columns))
            .collect()
    });

    let success = records.iter().filter(|record| record.is_ok()).count();
    let failure = records.len() - success;

    let manifest = RunManifest {
        created_at: Utc::now(),
        stage: "merge".to_string(),
        network_changed: sync.changed,
        num_jobs: records.len(),
        success,
        failure,
        jobs: records.clone(),
    };
    let manifest_path = layout.run_manifest("merge");
    write_run_manifest(&manifest_path, &manifest)?;
    info!(success, failure, changed = sync.changed, "partition merge finished");

    Ok(MergeSummary {
        success,
        failure,
        network_changed: sync.changed,
        unpartitioned,
        manifest_path,
        jobs: records,
    })
}

fn run_job(
    job: &PartitionJob,
    candidates: Vec<EventCandidate>,
    locator: &EventLocator<'_>,
    store: &dyn TableStore,
    feature_columns: &[String],
) -> PartitionRecord {
    let runner = || -> Result<_> {
        let persisted = read_events(store, &job.ledger)?;
        let outcome = merge_partition(persisted, candidates, locator)?;
        if !outcome.is_noop() {
            write_events(store, &job.ledger, &outcome.rows, feature_columns)?;
        }
        Ok(outcome.stats)
    };
    let (status, error, stats) = match runner() {
        Ok(stats) => {
            info!(
                partition = job.partition,
                inserted = stats.inserted,
                unchanged = stats.unchanged,
                "partition merged"
            );
            ("ok".to_string(), None, Some(stats))
        }
        Err(err) => {
            error!(partition = job.partition, "partition merge failed: {err:#}");
            ("error".to_string(), Some(format!("{err:#}")), None)
        }
    };
    PartitionRecord {
        job_id: job.job_id.clone(),
        partition: job.partition,
        status,
        error,
        output: job.ledger.display().to_string(),
        stats,
    }
}

//! Stage runners of the hurricane pipeline.
//!
//! Each stage reads its inputs through a [`hurricane_io::TableStore`], runs
//! the pure algorithms of `hurricane-algo` and writes its outputs back. The
//! order of stages is the caller's business:
//!
//! 1. [`rebuild_network`] (at most once per day)
//! 2. [`ingest_interfaces`]
//! 3. [`run_merge`], which checks the network version first
//! 4. [`allocate_time`]
//! 5. [`build_facts`]
//! 6. [`export_heuristic`] on demand

pub mod events;
pub mod facts;
pub mod heuristic;
pub mod job;
pub mod ledgers;
pub mod manifest;
pub mod network;
pub mod runner;
pub mod time;

pub use events::{
    ingest_interface, ingest_interfaces, sync_network_version, IngestReport, InterfaceSource,
    VersionSync,
};
pub use facts::{build_facts, FactReport};
pub use heuristic::export_heuristic;
pub use job::{jobs_for_partitions, PartitionJob, PartitionRecord};
pub use manifest::{load_run_manifest, write_run_manifest, RunManifest};
pub use network::{assemble_network, load_network, rebuild_network, RebuildReport, RebuildRequest};
pub use runner::{run_merge, MergeRunConfig, MergeSummary};
pub use time::{allocate_time, TimeReport};

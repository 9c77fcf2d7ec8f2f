//! # hurricane-algo: Street Network and Event Algorithms
//!
//! Pure, storage-free algorithms of the hurricane pipeline. Every function
//! takes in-memory collections from [`hurricane_core`] and returns new ones;
//! reading and writing tables is the job of `hurricane-io`.
//!
//! ## Network Construction
//!
//! | Stage | Function | Output |
//! |-------|----------|--------|
//! | Build | [`build_network`] | Vertices and segments from raw map edges |
//! | Tag | [`associate_regions`] | Zone/district/neighborhood ids on vertices |
//! | Canonicalize | [`canonicalize_segments`] | One row per undirected street |
//!
//! The stages run strictly in this order; [`EventLocator`] is only valid on
//! a canonical network.
//!
//! ## Events
//!
//! - [`normalize_interface`]: raw rows to keyed merge candidates
//! - [`merge_partition`]: incremental, idempotent merge into a partition ledger
//! - [`allocate_time_buckets`]: append-only time dimension ids
//! - [`build_fact_table`]: counts per time bucket and segment
//!
//! ## Generations
//!
//! [`VersionGate`] allows one rebuild per calendar date and tells the event
//! pipeline whether the network changed under it.
//!
//! ## Example
//!
//! ```rust
//! use geo_types::{Coord, LineString};
//! use hurricane_algo::*;
//!
//! let edges = vec![RawEdge {
//!     geometry: LineString::from(vec![(-43.2, -22.9), (-43.1991, -22.9)]),
//!     oneway: false,
//!     names: vec!["Rua A".into()],
//!     road_types: vec!["residential".into()],
//! }];
//! let network = build_network(&edges, &GraphBuildOptions::default()).unwrap();
//! let network = canonicalize_network(network).unwrap();
//!
//! let locator = EventLocator::new(&network).unwrap();
//! let segment = locator.locate(Coord { x: -43.1995, y: -22.9001 }).unwrap();
//! assert_eq!(segment.value(), 1);
//! ```

pub mod canonical;
pub mod facts;
pub mod graph_builder;
pub mod heuristic;
pub mod ingest;
pub mod locator;
pub mod merge;
pub mod spatial;
pub mod time_buckets;
pub mod version;

pub use canonical::{canonicalize_network, canonicalize_segments};
pub use facts::{build_fact_table, FactRow, FactTable};
pub use graph_builder::{build_network, GraphBuildOptions, RawEdge, DEFAULT_RESOLUTION_DEG};
pub use heuristic::{build_instance, HeuristicInstance, HeuristicRequest, InstanceSegment};
pub use ingest::{normalize_interface, parse_date, InterfaceSpec, NormalizedBatch, RawRecord};
pub use locator::EventLocator;
pub use merge::{merge_partition, partition_of, MergeOutcome, MergeStats, DEFAULT_PARTITIONS};
pub use spatial::{associate_regions, AssociationSummary, RegionSet};
pub use time_buckets::{allocate_time_buckets, bucket_index, derive_time_keys, Allocation};
pub use version::VersionGate;

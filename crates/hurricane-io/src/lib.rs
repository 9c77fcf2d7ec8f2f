//! # hurricane-io: storage and source boundaries
//!
//! Everything that touches the filesystem lives here, so the algorithms in
//! `hurricane-algo` stay pure.
//!
//! ## Module Overview
//!
//! | Module | Role |
//! |--------|------|
//! | [`layout`] | Paths of the bronze/silver/gold lake under a working directory |
//! | [`store`] | [`TableStore`] trait and the Arrow IPC [`IpcStore`] with atomic writes and archiving |
//! | [`tables`] | DataFrame codecs for vertex, segment, event, time, marker and fact tables |
//! | [`generation`] | Atomic network generation directories with manifest and SHA-256 checksums |
//! | [`regions`] | Region polygon boundary backed by CSV + WKT |
//! | [`map_source`] | Map source boundary backed by a JSON edge file |
//! | [`raw`] | Raw CSV event files |
//!
//! ## Example
//!
//! ```rust,no_run
//! use hurricane_io::{GenerationReader, LakeLayout};
//!
//! fn main() -> anyhow::Result<()> {
//!     let layout = LakeLayout::new("/data/lake", "crimes");
//!     let network = GenerationReader::open(layout.network_dir())?.read_network()?;
//!     println!("{}", network.stats());
//!     Ok(())
//! }
//! ```

pub mod generation;
pub mod layout;
pub mod map_source;
pub mod raw;
pub mod regions;
pub mod store;
pub mod tables;

pub use generation::{
    archive_generation, generation_exists, GenerationManifest, GenerationReader, GenerationWriter,
    SourceInfo,
};
pub use layout::LakeLayout;
pub use map_source::{validate_places, JsonEdgeFile, MapSource, Place};
pub use raw::read_raw_csv;
pub use regions::{CsvRegionSource, RegionSource};
pub use store::{IpcStore, TableStore};

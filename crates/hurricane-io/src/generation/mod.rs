//! Network generations: one committed `vertex` + `segment` snapshot.
//!
//! A generation directory is written into `<dir>.tmp` and renamed into place
//! only after both tables and the manifest are on disk, so a failed rebuild
//! never replaces the previous generation. Before a rebuild the committed
//! directory is moved to the historic area under the date of the rebuild.

mod manifest;
mod reader;
mod writer;

pub use manifest::{
    compute_sha256, GenerationManifest, SourceInfo, TableInfo, CURRENT_SCHEMA_VERSION,
    REQUIRED_TABLES,
};
pub use reader::GenerationReader;
pub use writer::GenerationWriter;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Move a committed generation to `<historic_dir>/<name>_<label>`.
///
/// Returns `None` when no generation is committed. An archive with the same
/// label is replaced.
pub fn archive_generation(
    network_dir: &Path,
    historic_dir: &Path,
    label: &str,
) -> Result<Option<PathBuf>> {
    if !network_dir.is_dir() {
        return Ok(None);
    }
    let name = network_dir
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("generation path without a name: {}", network_dir.display()))?;
    fs::create_dir_all(historic_dir)
        .with_context(|| format!("creating archive directory {}", historic_dir.display()))?;

    let target = historic_dir.join(format!("{name}_{label}"));
    if target.exists() {
        fs::remove_dir_all(&target)
            .with_context(|| format!("replacing archive {}", target.display()))?;
    }
    fs::rename(network_dir, &target).with_context(|| {
        format!(
            "archiving generation {} -> {}",
            network_dir.display(),
            target.display()
        )
    })?;
    Ok(Some(target))
}

/// Whether `dir` holds a committed generation.
pub fn generation_exists(dir: &Path) -> bool {
    dir.join("manifest.json").is_file()
}

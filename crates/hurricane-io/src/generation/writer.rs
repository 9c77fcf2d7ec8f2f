//! Generation writer with atomic commit.

use anyhow::{Context, Result};
use hurricane_core::Network;
use polars::io::ipc::IpcWriter;
use polars::prelude::{DataFrame, SerWriter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::manifest::{compute_sha256, GenerationManifest, SourceInfo, TableInfo};
use crate::tables::{segment_frame, vertex_frame};

/// Writes one network generation into a temp directory and commits it by
/// renaming over the final directory.
pub struct GenerationWriter {
    temp_dir: PathBuf,
    final_dir: PathBuf,
}

impl GenerationWriter {
    pub fn new(output_path: impl AsRef<Path>) -> Result<Self> {
        let final_dir = output_path.as_ref().to_path_buf();
        let temp_dir = final_dir.with_extension("tmp");

        // Leftover from a crashed rebuild
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir).with_context(|| {
                format!("cleaning up stale temp directory: {}", temp_dir.display())
            })?;
        }
        fs::create_dir_all(&temp_dir)
            .with_context(|| format!("creating temp directory: {}", temp_dir.display()))?;

        Ok(Self {
            temp_dir,
            final_dir,
        })
    }

    /// Write both tables and the manifest, then commit.
    ///
    /// On any failure the temp directory is removed and the previously
    /// committed generation, if any, is left untouched.
    pub fn write_network(&self, network: &Network, source: Option<SourceInfo>) -> Result<()> {
        self.stage_network(network, source)?;
        let committed = self.commit();
        if committed.is_err() {
            let _ = self.cleanup();
        }
        committed
    }

    /// Write both tables and the manifest into the temp directory without
    /// touching the final directory. The temp directory is removed on error.
    pub fn stage_network(&self, network: &Network, source: Option<SourceInfo>) -> Result<()> {
        let staged = self.write_tables(network, source);
        if staged.is_err() {
            let _ = self.cleanup();
        }
        staged
    }

    fn write_tables(&self, network: &Network, source: Option<SourceInfo>) -> Result<()> {
        let mut manifest = GenerationManifest::new(env!("CARGO_PKG_VERSION").to_string(), source);

        let mut vertices = vertex_frame(network.vertices())?;
        self.write_table("vertex", &mut vertices, &mut manifest)?;
        let mut segments = segment_frame(network.segments())?;
        self.write_table("segment", &mut segments, &mut manifest)?;

        // Manifest last: its presence marks a complete generation
        self.write_manifest(&manifest).context("writing manifest")
    }

    fn write_manifest(&self, manifest: &GenerationManifest) -> Result<()> {
        let manifest_path = self.temp_dir.join("manifest.json");
        let json =
            serde_json::to_string_pretty(manifest).context("serializing manifest to JSON")?;
        fs::write(&manifest_path, json)
            .with_context(|| format!("writing manifest: {}", manifest_path.display()))?;
        Ok(())
    }

    /// Replace the final directory with the staged one.
    pub fn commit(&self) -> Result<()> {
        if self.final_dir.exists() {
            fs::remove_dir_all(&self.final_dir).with_context(|| {
                format!(
                    "removing existing generation directory: {}",
                    self.final_dir.display()
                )
            })?;
        }
        fs::rename(&self.temp_dir, &self.final_dir).with_context(|| {
            format!(
                "atomic rename: {} -> {}",
                self.temp_dir.display(),
                self.final_dir.display()
            )
        })?;
        info!(dir = %self.final_dir.display(), "network generation committed");
        Ok(())
    }

    pub fn cleanup(&self) -> Result<()> {
        if self.temp_dir.exists() {
            fs::remove_dir_all(&self.temp_dir).with_context(|| {
                format!("cleaning up temp directory: {}", self.temp_dir.display())
            })?;
        }
        Ok(())
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn final_dir(&self) -> &Path {
        &self.final_dir
    }

    fn write_table(
        &self,
        name: &str,
        df: &mut DataFrame,
        manifest: &mut GenerationManifest,
    ) -> Result<()> {
        let path = self.temp_dir.join(format!("{name}.arrow"));
        {
            let mut file = fs::File::create(&path)
                .with_context(|| format!("creating table file {}", path.display()))?;
            IpcWriter::new(&mut file)
                .finish(df)
                .with_context(|| format!("writing table {name}"))?;
        }

        let sha256 = compute_sha256(&path)?;
        let file_size_bytes = fs::metadata(&path)?.len();
        manifest.add_table(
            name,
            TableInfo {
                sha256,
                row_count: df.height() as u64,
                file_size_bytes,
            },
        );
        Ok(())
    }
}

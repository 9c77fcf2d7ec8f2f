//! Generation reader with manifest and checksum validation.

use anyhow::{bail, Context, Result};
use hurricane_core::{HurricaneError, Network};
use polars::io::ipc::IpcReader;
use polars::prelude::{DataFrame, SerReader};
use std::fs::File;
use std::path::{Path, PathBuf};

use super::manifest::{GenerationManifest, TableInfo};
use crate::tables::{segments_from_frame, vertices_from_frame};

#[derive(Debug)]
pub struct GenerationReader {
    base_path: PathBuf,
    manifest: GenerationManifest,
}

impl GenerationReader {
    /// Open a committed generation.
    ///
    /// A missing directory is a [`HurricaneError::NotFound`]; an incompatible
    /// or corrupted one is a plain error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            return Err(HurricaneError::NotFound(format!(
                "network generation {}",
                base_path.display()
            ))
            .into());
        }

        let manifest =
            Self::load_manifest(&base_path).context("loading and parsing manifest.json")?;
        manifest
            .is_compatible()
            .context("checking schema compatibility")?;
        manifest
            .verify_all_tables()
            .context("verifying required tables")?;
        manifest
            .validate_checksums(&base_path)
            .context("validating file checksums")?;

        Ok(Self {
            base_path,
            manifest,
        })
    }

    fn load_manifest(base_path: &Path) -> Result<GenerationManifest> {
        let manifest_path = base_path.join("manifest.json");
        if !manifest_path.exists() {
            bail!(
                "manifest.json not found in {}\n\
                 This generation may be incomplete (interrupted rebuild)",
                base_path.display()
            );
        }
        let file = File::open(&manifest_path)
            .with_context(|| format!("opening manifest: {}", manifest_path.display()))?;
        serde_json::from_reader(file).context("parsing manifest.json")
    }

    pub fn manifest(&self) -> &GenerationManifest {
        &self.manifest
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.base_path.join(format!("{table_name}.arrow"))
    }

    pub fn table_info(&self, table_name: &str) -> Option<&TableInfo> {
        self.manifest.tables.get(table_name)
    }

    pub fn load_table(&self, table_name: &str) -> Result<DataFrame> {
        let path = self.table_path(table_name);
        let file =
            File::open(&path).with_context(|| format!("opening table file {}", path.display()))?;
        IpcReader::new(file)
            .finish()
            .with_context(|| format!("reading table {table_name}"))
    }

    /// Rebuild the [`Network`] arena from the `vertex` and `segment` tables.
    pub fn read_network(&self) -> Result<Network> {
        let vertices = vertices_from_frame(&self.load_table("vertex")?)
            .context("decoding vertex table")?;
        let segments = segments_from_frame(&self.load_table("segment")?)
            .context("decoding segment table")?;
        Ok(Network::from_parts(vertices, segments)?)
    }
}

//! Manifest of a committed network generation.
//!
//! Each generation directory carries a `manifest.json` that:
//! - Tracks the table schema version for compatibility checks
//! - Stores SHA256 checksums and row counts of every table file
//! - Records which places and map file the generation was built from

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Current table schema version (semver)
pub const CURRENT_SCHEMA_VERSION: &str = "1.0.0";

/// Tables every generation must contain.
pub const REQUIRED_TABLES: [&str; 2] = ["vertex", "segment"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationManifest {
    pub schema_version: String,

    pub created_at: DateTime<Utc>,

    /// hurricane version that wrote the generation
    pub hurricane_version: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,

    pub tables: BTreeMap<String, TableInfo>,
}

/// Provenance of a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Place labels the map source was queried with
    pub places: Vec<String>,

    /// Map source file, when the edges came from disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_file: Option<String>,

    /// SHA256 of the map source file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub sha256: String,
    pub row_count: u64,
    pub file_size_bytes: u64,
}

impl GenerationManifest {
    pub fn new(hurricane_version: String, source: Option<SourceInfo>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            created_at: Utc::now(),
            hurricane_version,
            source,
            tables: BTreeMap::new(),
        }
    }

    pub fn add_table(&mut self, name: impl Into<String>, info: TableInfo) {
        self.tables.insert(name.into(), info);
    }

    /// Accept manifests of the same or an older major schema version.
    pub fn is_compatible(&self) -> Result<()> {
        use semver::Version;

        let manifest_version = Version::parse(&self.schema_version)
            .with_context(|| format!("invalid schema version '{}'", self.schema_version))?;
        let current_version = Version::parse(CURRENT_SCHEMA_VERSION)?;

        if manifest_version.major > current_version.major {
            bail!(
                "Schema v{} is too new (this version supports up to v{})",
                self.schema_version,
                CURRENT_SCHEMA_VERSION
            );
        }
        Ok(())
    }

    /// Recompute every table checksum under `base_path` and compare.
    pub fn validate_checksums(&self, base_path: &Path) -> Result<()> {
        for (table_name, info) in &self.tables {
            let file_path = base_path.join(format!("{table_name}.arrow"));
            if !file_path.exists() {
                bail!("Table file not found: {}", file_path.display());
            }
            let actual_hash = compute_sha256(&file_path)?;
            if actual_hash != info.sha256 {
                bail!(
                    "Checksum mismatch for table '{}': expected {}, got {}",
                    table_name,
                    info.sha256,
                    actual_hash
                );
            }
        }
        Ok(())
    }

    pub fn verify_all_tables(&self) -> Result<()> {
        for required in REQUIRED_TABLES {
            if !self.tables.contains_key(required) {
                bail!("Missing required table: {}", required);
            }
        }
        Ok(())
    }
}

/// Compute SHA256 hash of a file
pub fn compute_sha256(path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];
    loop {
        let n = file
            .read(&mut buffer)
            .with_context(|| format!("reading file for hashing {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

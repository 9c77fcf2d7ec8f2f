use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::job::PartitionRecord;

/// Outcome of one fan-out run, written next to the lake for the orchestrator.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub stage: String,
    /// Whether the network changed since the previous run of the stage.
    pub network_changed: bool,
    pub num_jobs: usize,
    pub success: usize,
    pub failure: usize,
    pub jobs: Vec<PartitionRecord>,
}

pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest to JSON")?;
    fs::write(path, json).with_context(|| format!("writing run manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_run_manifest(path: &Path) -> Result<RunManifest> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening run manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing run manifest '{}'", path.display()))
}

//! Heuristic instance export over a zone selection.

use anyhow::{Context, Result};
use hurricane_algo::{build_instance, HeuristicRequest};
use hurricane_core::RegionKind;
use hurricane_io::{LakeLayout, RegionSource, TableStore};
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::ledgers::read_facts;
use crate::network::load_network;

/// Write the instance for `request` to `gold/<name>.txt`.
pub fn export_heuristic(
    layout: &LakeLayout,
    store: &dyn TableStore,
    regions: &dyn RegionSource,
    request: &HeuristicRequest,
    name: &str,
) -> Result<PathBuf> {
    let network = load_network(layout).context("loading network generation")?;
    let zones = regions.polygons(RegionKind::Zone, true)?;
    let facts = read_facts(store, &layout.fact())?;
    let instance = build_instance(&network, &zones, &facts, request)?;

    let path = layout.heuristic_instance(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let tmp = path.with_extension("txt.tmp");
    fs::write(&tmp, instance.render())
        .with_context(|| format!("writing instance {}", tmp.display()))?;
    fs::rename(&tmp, &path)
        .with_context(|| format!("atomic rename: {} -> {}", tmp.display(), path.display()))?;

    info!(
        path = %path.display(),
        vertices = instance.vertices.len(),
        segments = instance.segments.len(),
        "heuristic instance written"
    );
    Ok(path)
}

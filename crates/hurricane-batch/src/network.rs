//! Network rebuild stage.
//!
//! Map edges → graph → region tags → canonical segments, committed as one
//! generation. The stage is guarded by the model's historic ledger: at most
//! one rebuild per calendar date, and the previous generation is moved to
//! the historic area before the new one replaces it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use hurricane_algo::{
    associate_regions, build_network, canonicalize_segments, AssociationSummary,
    GraphBuildOptions, RegionSet, VersionGate,
};
use hurricane_core::{
    Diagnostics, HistoricMarker, HurricaneError, Network, NetworkStats, RegionKind,
};
use hurricane_io::generation::compute_sha256;
use hurricane_io::{
    archive_generation, generation_exists, validate_places, GenerationReader, GenerationWriter,
    LakeLayout, MapSource, Place, RegionSource, SourceInfo, TableStore,
};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::ledgers::{read_markers, write_markers};

#[derive(Debug, Clone)]
pub struct RebuildRequest {
    pub places: Vec<Place>,
    pub options: GraphBuildOptions,
    /// Calendar date the rebuild is recorded under.
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct RebuildReport {
    pub stats: NetworkStats,
    pub associations: Vec<AssociationSummary>,
    pub marker: HistoricMarker,
    /// Where the previous generation went, if there was one.
    pub archived: Option<PathBuf>,
    pub warnings: usize,
}

/// Build the network in memory: graph, region tags, canonical segments.
///
/// Tags are assigned before canonicalization so every vertex of the built
/// graph carries them, including ones left without segments afterwards.
pub fn assemble_network(
    map: &dyn MapSource,
    regions: &dyn RegionSource,
    places: &[Place],
    options: &GraphBuildOptions,
) -> Result<(Network, Vec<AssociationSummary>)> {
    let edges = map.edges(places).context("extracting map edges")?;
    let built = build_network(&edges, options)?;
    info!(
        edges = edges.len(),
        vertices = built.vertices().len(),
        segments = built.segments().len(),
        "network built"
    );

    let (mut vertices, segments) = built.into_parts();
    let mut associations = Vec::with_capacity(RegionKind::ALL.len());
    for kind in RegionKind::ALL {
        let polygons = regions
            .polygons(kind, true)
            .with_context(|| format!("loading {} polygons", kind.as_str()))?;
        let set = RegionSet::new(kind, polygons);
        let summary = associate_regions(&mut vertices, &set);
        info!(
            kind = kind.as_str(),
            matched = summary.matched,
            unmatched = summary.unmatched,
            "vertices tagged"
        );
        associations.push(summary);
    }

    let before = segments.len();
    let segments = canonicalize_segments(segments);
    info!(
        removed = before - segments.len(),
        kept = segments.len(),
        "segments canonicalized"
    );
    Ok((Network::from_parts(vertices, segments)?, associations))
}

fn source_info(map: &dyn MapSource, places: &[Place]) -> Result<SourceInfo> {
    let (map_file, file_hash) = match map.source_file() {
        Some(path) => (
            Some(path.display().to_string()),
            Some(compute_sha256(path)?),
        ),
        None => (None, None),
    };
    Ok(SourceInfo {
        places: places.iter().map(Place::label).collect(),
        map_file,
        file_hash,
    })
}

/// Rebuild and commit a new network generation.
///
/// Fails with [`HurricaneError::Conflict`] when a rebuild was already
/// recorded for `request.today` and with [`HurricaneError::Integrity`] when
/// the assembled network breaks an invariant. Nothing is written unless the
/// whole generation is ready; if the commit fails after the marker ledger
/// was written, the ledger is restored.
pub fn rebuild_network(
    layout: &LakeLayout,
    store: &dyn TableStore,
    map: &dyn MapSource,
    regions: &dyn RegionSource,
    request: &RebuildRequest,
) -> Result<RebuildReport> {
    validate_places(&request.places)?;

    let ledger_path = layout.model_historic_dates();
    let mut gate = VersionGate::new(read_markers(store, &ledger_path)?)?;
    gate.check_rebuild(request.today)?;

    let (network, associations) =
        assemble_network(map, regions, &request.places, &request.options)?;

    let mut diag = Diagnostics::new();
    network.validate_into(&mut diag);
    for issue in diag.warnings() {
        warn!(category = %issue.category, "{}", issue.message);
    }
    if diag.has_errors() {
        let details: Vec<String> = diag.errors().map(|i| i.message.clone()).collect();
        return Err(HurricaneError::Integrity(format!(
            "rebuilt network is invalid ({}): {}",
            diag.summary(),
            details.join("; ")
        ))
        .into());
    }

    let network_dir = layout.network_dir();
    let writer = GenerationWriter::new(&network_dir)?;
    writer.stage_network(&network, Some(source_info(map, &request.places)?))?;

    // A committed generation always has its marker in the ledger.
    let previous = gate.markers().to_vec();
    let marker = gate.record(request.today)?;
    if let Err(err) = write_markers(store, &ledger_path, gate.markers()) {
        let _ = writer.cleanup();
        return Err(err);
    }

    let published = (|| -> Result<Option<PathBuf>> {
        let archived = if generation_exists(&network_dir) {
            archive_generation(&network_dir, &layout.silver_historic_dir(), &marker.label())?
        } else {
            None
        };
        writer.commit()?;
        Ok(archived)
    })();
    let archived = match published {
        Ok(archived) => archived,
        Err(err) => {
            let _ = writer.cleanup();
            if let Err(restore) = write_markers(store, &ledger_path, &previous) {
                warn!("restoring historic ledger failed: {restore:#}");
            }
            return Err(err);
        }
    };
    if let Some(path) = &archived {
        info!(archive = %path.display(), "previous generation archived");
    }

    let stats = network.stats();
    info!(marker = %marker.label(), "{}", stats);
    Ok(RebuildReport {
        stats,
        associations,
        marker,
        archived,
        warnings: diag.warning_count(),
    })
}

/// Open the committed generation.
pub fn load_network(layout: &LakeLayout) -> Result<Network> {
    GenerationReader::open(layout.network_dir())?.read_network()
}

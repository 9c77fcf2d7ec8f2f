//! # hurricane-core: Street Network Model
//!
//! Data structures shared by every stage of the hurricane pipeline: the
//! canonical street network (vertices and segments), region polygons, time
//! buckets, geocoded event records and the historic markers that version
//! network generations.
//!
//! ## Network Model
//!
//! A [`Network`] is an arena of [`Vertex`] and [`Segment`] records keyed by
//! dense integer ids, plus an undirected petgraph adjacency over them:
//! - **Nodes**: vertices, weighted by their [`VertexId`]
//! - **Edges**: segments, weighted by their [`SegmentId`]
//!
//! The arena gives O(1) lookup by id; the graph answers adjacency queries
//! ("which segments touch this vertex") and topological statistics. There is
//! no path search.
//!
//! ```rust
//! use hurricane_core::*;
//! use geo_types::Coord;
//!
//! let vertices = vec![
//!     Vertex::new(VertexId::new(1), Coord { x: -43.20, y: -22.90 }),
//!     Vertex::new(VertexId::new(2), Coord { x: -43.19, y: -22.90 }),
//! ];
//! let segments = vec![Segment {
//!     id: SegmentId::new(1),
//!     oneway: false,
//!     name: vec!["Rua A".to_string()],
//!     road_type: vec!["residential".to_string()],
//!     start: VertexId::new(1),
//!     end: VertexId::new(2),
//!     length_m: 1025.37,
//! }];
//!
//! let network = Network::from_parts(vertices, segments).unwrap();
//! assert_eq!(network.incident_segments(VertexId::new(2)).len(), 1);
//! ```
//!
//! ## ID System
//!
//! Every element has a newtype id so vertex ids, segment ids, region ids and
//! time bucket ids cannot be confused:
//! - **Vertex / Segment ids** are 1-based and dense within one generation
//! - **Region ids** come from the polygon store; `0` means unassigned
//! - **Time ids** are append-only and never reused
//!
//! ## Modules
//!
//! - [`geodesy`] - haversine, planar line distance, coordinate keys
//! - [`records`] - region polygons, time buckets, events, historic markers
//! - [`diagnostics`] - network invariant checks
//! - [`graph_utils`] - degree/component statistics and island labelling

use geo_types::Coord;
use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub mod diagnostics;
pub mod error;
pub mod geodesy;
pub mod graph_utils;
pub mod records;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{HurricaneError, HurricaneResult};
pub use graph_utils::*;
pub use petgraph::graph::NodeIndex;
pub use records::*;

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(usize);
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RegionId(i64);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeId(u64);

impl VertexId {
    #[inline]
    pub fn new(value: usize) -> Self {
        VertexId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl SegmentId {
    #[inline]
    pub fn new(value: usize) -> Self {
        SegmentId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl RegionId {
    /// Id carried by vertices that fall inside no polygon of a kind.
    pub const UNASSIGNED: RegionId = RegionId(0);

    #[inline]
    pub fn new(value: i64) -> Self {
        RegionId(value)
    }
    #[inline]
    pub fn value(&self) -> i64 {
        self.0
    }
    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl TimeId {
    #[inline]
    pub fn new(value: u64) -> Self {
        TimeId(value)
    }
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Administrative region kinds a vertex is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Zone,
    District,
    Neighborhood,
}

impl RegionKind {
    pub const ALL: [RegionKind; 3] = [
        RegionKind::Zone,
        RegionKind::District,
        RegionKind::Neighborhood,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegionKind::Zone => "zone",
            RegionKind::District => "district",
            RegionKind::Neighborhood => "neighborhood",
        }
    }
}

/// A street endpoint location.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub id: VertexId,
    /// `x = longitude`, `y = latitude`
    pub coord: Coord<f64>,
    pub zone_id: RegionId,
    pub district_id: RegionId,
    pub neighborhood_id: RegionId,
}

impl Vertex {
    /// Vertex with every region id unassigned.
    pub fn new(id: VertexId, coord: Coord<f64>) -> Self {
        Self {
            id,
            coord,
            zone_id: RegionId::UNASSIGNED,
            district_id: RegionId::UNASSIGNED,
            neighborhood_id: RegionId::UNASSIGNED,
        }
    }

    /// Canonical `"lon,lat"` text of this vertex.
    pub fn key(&self) -> String {
        geodesy::coord_key(self.coord)
    }

    pub fn region(&self, kind: RegionKind) -> RegionId {
        match kind {
            RegionKind::Zone => self.zone_id,
            RegionKind::District => self.district_id,
            RegionKind::Neighborhood => self.neighborhood_id,
        }
    }

    pub fn set_region(&mut self, kind: RegionKind, id: RegionId) {
        match kind {
            RegionKind::Zone => self.zone_id = id,
            RegionKind::District => self.district_id = id,
            RegionKind::Neighborhood => self.neighborhood_id = id,
        }
    }
}

/// An edge between two vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    pub oneway: bool,
    pub name: Vec<String>,
    pub road_type: Vec<String>,
    pub start: VertexId,
    pub end: VertexId,
    pub length_m: f64,
}

impl Segment {
    /// Zero length or identical endpoints.
    pub fn is_degenerate(&self) -> bool {
        self.length_m == 0.0 || self.start == self.end
    }

    /// Endpoints ordered so the smaller id comes first.
    pub fn unordered_pair(&self) -> (VertexId, VertexId) {
        if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        }
    }

    pub fn touches(&self, vertex: VertexId) -> bool {
        self.start == vertex || self.end == vertex
    }
}

/// One generation of the street network
#[derive(Debug, Default, Clone)]
pub struct Network {
    pub graph: Graph<VertexId, SegmentId, Undirected>,
    vertices: Vec<Vertex>,
    segments: Vec<Segment>,
    vertex_nodes: HashMap<VertexId, NodeIndex>,
    segment_slots: HashMap<SegmentId, usize>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            ..Self::default()
        }
    }

    /// Assemble a network from vertex and segment collections.
    ///
    /// Fails with [`HurricaneError::Integrity`] on duplicate ids or on a
    /// segment endpoint that references no vertex.
    pub fn from_parts(vertices: Vec<Vertex>, segments: Vec<Segment>) -> HurricaneResult<Self> {
        let mut graph = Graph::with_capacity(vertices.len(), segments.len());
        let mut vertex_nodes = HashMap::with_capacity(vertices.len());
        for vertex in &vertices {
            let node = graph.add_node(vertex.id);
            if vertex_nodes.insert(vertex.id, node).is_some() {
                return Err(HurricaneError::Integrity(format!(
                    "duplicate vertex id {}",
                    vertex.id.value()
                )));
            }
        }

        let mut segment_slots = HashMap::with_capacity(segments.len());
        for (slot, segment) in segments.iter().enumerate() {
            if segment_slots.insert(segment.id, slot).is_some() {
                return Err(HurricaneError::Integrity(format!(
                    "duplicate segment id {}",
                    segment.id.value()
                )));
            }
            let endpoint = |id: VertexId| {
                vertex_nodes.get(&id).copied().ok_or_else(|| {
                    HurricaneError::Integrity(format!(
                        "segment {} references missing vertex {}",
                        segment.id.value(),
                        id.value()
                    ))
                })
            };
            let a = endpoint(segment.start)?;
            let b = endpoint(segment.end)?;
            graph.add_edge(a, b, segment.id);
        }

        Ok(Self {
            graph,
            vertices,
            segments,
            vertex_nodes,
            segment_slots,
        })
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertex_nodes
            .get(&id)
            .map(|node| &self.vertices[node.index()])
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segment_slots.get(&id).map(|slot| &self.segments[*slot])
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.segments.is_empty()
    }

    /// Segments whose start or end is `vertex`, ordered by segment id.
    pub fn incident_segments(&self, vertex: VertexId) -> Vec<&Segment> {
        let Some(node) = self.vertex_nodes.get(&vertex) else {
            return Vec::new();
        };
        let mut ids: Vec<SegmentId> = self.graph.edges(*node).map(|e| *e.weight()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().filter_map(|id| self.segment(id)).collect()
    }

    /// Start and end coordinates of a segment of this network.
    pub fn endpoints(&self, segment: &Segment) -> Option<(Coord<f64>, Coord<f64>)> {
        let start = self.vertex(segment.start)?;
        let end = self.vertex(segment.end)?;
        Some((start.coord, end.coord))
    }

    pub fn into_parts(self) -> (Vec<Vertex>, Vec<Segment>) {
        (self.vertices, self.segments)
    }

    /// Compute basic statistics about the network
    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats {
            num_vertices: self.vertices.len(),
            num_segments: self.segments.len(),
            ..NetworkStats::default()
        };
        for segment in &self.segments {
            if segment.oneway {
                stats.num_oneway += 1;
            }
            stats.total_length_km += segment.length_m / 1000.0;
        }
        for vertex in &self.vertices {
            for kind in RegionKind::ALL {
                if vertex.region(kind).is_assigned() {
                    match kind {
                        RegionKind::Zone => stats.zoned_vertices += 1,
                        RegionKind::District => stats.districted_vertices += 1,
                        RegionKind::Neighborhood => stats.neighborhood_vertices += 1,
                    }
                }
            }
        }
        stats
    }

    /// Check the generation invariants, recording findings in `diag`.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        if self.vertices.is_empty() {
            diag.add_error("structure", "Network has no vertices");
            return;
        }

        let mut ids: Vec<usize> = self.vertices.iter().map(|v| v.id.value()).collect();
        ids.sort_unstable();
        if ids.first() != Some(&1) || ids.last() != Some(&ids.len()) {
            diag.add_error(
                "identity",
                &format!(
                    "Vertex ids are not dense over 1..{} (min {:?}, max {:?})",
                    ids.len(),
                    ids.first(),
                    ids.last()
                ),
            );
        }

        let mut seen_pairs = HashSet::new();
        for segment in &self.segments {
            if segment.is_degenerate() {
                diag.add_error_with_entity(
                    "topology",
                    "Segment has zero length or identical endpoints",
                    &format!("Segment {}", segment.id.value()),
                );
            }
            if !segment.oneway && !seen_pairs.insert(segment.unordered_pair()) {
                diag.add_warning_with_entity(
                    "topology",
                    "Two-way segment duplicates an endpoint pair",
                    &format!("Segment {}", segment.id.value()),
                );
            }
        }

        let isolated = self
            .graph
            .node_indices()
            .filter(|node| self.graph.neighbors(*node).next().is_none())
            .count();
        if isolated > 0 {
            diag.add_warning(
                "topology",
                &format!("{isolated} vertices have no incident segment"),
            );
        }
    }
}

/// Network statistics summary
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub num_vertices: usize,
    pub num_segments: usize,
    pub num_oneway: usize,
    pub total_length_km: f64,
    pub zoned_vertices: usize,
    pub districted_vertices: usize,
    pub neighborhood_vertices: usize,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Vertices: {}, Segments: {} ({} one-way)",
            self.num_vertices, self.num_segments, self.num_oneway
        )?;
        writeln!(f, "Total length: {:.2} km", self.total_length_km)?;
        write!(
            f,
            "Tagged vertices: {} zone, {} district, {} neighborhood",
            self.zoned_vertices, self.districted_vertices, self.neighborhood_vertices
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(id: usize, x: f64, y: f64) -> Vertex {
        Vertex::new(VertexId::new(id), Coord { x, y })
    }

    fn segment(id: usize, start: usize, end: usize, oneway: bool) -> Segment {
        Segment {
            id: SegmentId::new(id),
            oneway,
            name: vec![format!("Street {id}")],
            road_type: vec!["residential".to_string()],
            start: VertexId::new(start),
            end: VertexId::new(end),
            length_m: 100.0,
        }
    }

    fn triangle() -> Network {
        Network::from_parts(
            vec![vertex(1, 0.0, 0.0), vertex(2, 0.001, 0.0), vertex(3, 0.0, 0.001)],
            vec![
                segment(1, 1, 2, false),
                segment(2, 2, 3, true),
                segment(3, 3, 1, false),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_network_creation() {
        let network = triangle();
        assert_eq!(network.vertices().len(), 3);
        assert_eq!(network.segments().len(), 3);
        assert_eq!(network.graph.node_count(), 3);
        assert_eq!(network.graph.edge_count(), 3);
        assert_eq!(network.vertex(VertexId::new(2)).unwrap().coord.x, 0.001);
        assert_eq!(network.segment(SegmentId::new(3)).unwrap().end, VertexId::new(1));
    }

    #[test]
    fn test_incident_segments_sorted_by_id() {
        let network = triangle();
        let ids: Vec<usize> = network
            .incident_segments(VertexId::new(1))
            .iter()
            .map(|s| s.id.value())
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(network.incident_segments(VertexId::new(99)).is_empty());
    }

    #[test]
    fn test_dangling_endpoint_is_integrity_error() {
        let result = Network::from_parts(vec![vertex(1, 0.0, 0.0)], vec![segment(1, 1, 2, false)]);
        assert!(matches!(result, Err(HurricaneError::Integrity(_))));
    }

    #[test]
    fn test_duplicate_vertex_id_rejected() {
        let result = Network::from_parts(vec![vertex(1, 0.0, 0.0), vertex(1, 1.0, 1.0)], vec![]);
        assert!(matches!(result, Err(HurricaneError::Integrity(_))));
    }

    #[test]
    fn test_validation_clean_network() {
        let mut diag = Diagnostics::new();
        triangle().validate_into(&mut diag);
        assert!(!diag.has_errors(), "{diag}");
        assert_eq!(diag.warning_count(), 0);
    }

    #[test]
    fn test_validation_flags_degenerate_and_duplicates() {
        let mut looped = segment(3, 2, 2, false);
        looped.length_m = 0.0;
        let network = Network::from_parts(
            vec![vertex(1, 0.0, 0.0), vertex(2, 0.001, 0.0), vertex(3, 0.5, 0.5)],
            vec![segment(1, 1, 2, false), segment(2, 2, 1, false), looped],
        )
        .unwrap();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert_eq!(diag.error_count(), 1);
        // duplicate pair plus the isolated vertex 3
        assert_eq!(diag.warning_count(), 2);
    }

    #[test]
    fn test_validation_flags_sparse_ids() {
        let network = Network::from_parts(vec![vertex(1, 0.0, 0.0), vertex(5, 1.0, 1.0)], vec![])
            .unwrap();
        let mut diag = Diagnostics::new();
        network.validate_into(&mut diag);
        assert_eq!(diag.issues_by_category("identity").count(), 1);
    }

    #[test]
    fn test_network_stats() {
        let mut network = triangle();
        network.vertices[0].set_region(RegionKind::Zone, RegionId::new(4));
        let stats = network.stats();
        assert_eq!(stats.num_vertices, 3);
        assert_eq!(stats.num_segments, 3);
        assert_eq!(stats.num_oneway, 1);
        assert!((stats.total_length_km - 0.3).abs() < 1e-9);
        assert_eq!(stats.zoned_vertices, 1);
        assert_eq!(stats.districted_vertices, 0);
    }

    #[test]
    fn test_vertex_region_accessors() {
        let mut v = vertex(1, -43.2, -22.9);
        assert_eq!(v.region(RegionKind::District), RegionId::UNASSIGNED);
        v.set_region(RegionKind::District, RegionId::new(9));
        assert_eq!(v.district_id.value(), 9);
        assert_eq!(v.key(), "-43.2,-22.9");
    }
}

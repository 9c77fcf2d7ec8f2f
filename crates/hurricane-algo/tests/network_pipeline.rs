//! Integration tests for the build -> tag -> canonicalize -> locate chain.

use geo_types::{polygon, Coord, LineString, MultiPolygon};
use hurricane_algo::*;
use hurricane_core::geodesy::perpendicular_distance;
use hurricane_core::{
    Diagnostics, Network, RegionId, RegionKind, RegionPolygon, Segment, SegmentId, Vertex,
    VertexId,
};
use std::collections::HashSet;

fn edge(points: Vec<(f64, f64)>, oneway: bool) -> RawEdge {
    RawEdge {
        geometry: LineString::from(points),
        oneway,
        names: vec!["Rua".to_string()],
        road_types: vec!["primary".to_string()],
    }
}

/// A small grid as a directional source would deliver it: every two-way
/// street appears once per direction.
fn grid_edges() -> Vec<RawEdge> {
    let mut edges = Vec::new();
    for row in 0..3 {
        let y = -22.9 + row as f64 * 0.001;
        edges.push(edge(vec![(-43.2, y), (-43.197, y)], false));
        edges.push(edge(vec![(-43.197, y), (-43.2, y)], false));
    }
    for col in 0..3 {
        let x = -43.2 + col as f64 * 0.0015;
        edges.push(edge(vec![(x, -22.9), (x, -22.898)], true));
    }
    // a closed loop collapses to a nudged pair
    edges.push(edge(vec![(-43.19, -22.89), (-43.19, -22.89)], false));
    edges
}

fn zones() -> Vec<RegionPolygon> {
    vec![RegionPolygon {
        id: RegionId::new(1),
        geometry: MultiPolygon(vec![polygon![
            (x: -43.201, y: -22.901),
            (x: -43.1985, y: -22.901),
            (x: -43.1985, y: -22.897),
            (x: -43.201, y: -22.897),
            (x: -43.201, y: -22.901),
        ]]),
        priority: Some(1),
        name: "Oeste".to_string(),
        active: true,
    }]
}

#[test]
fn built_vertex_ids_are_dense_and_referenced() {
    let network = build_network(&grid_edges(), &GraphBuildOptions::default()).unwrap();
    let ids: Vec<usize> = network.vertices().iter().map(|v| v.id.value()).collect();
    assert_eq!(ids, (1..=network.vertices().len()).collect::<Vec<_>>());
    let valid: HashSet<VertexId> = network.vertices().iter().map(|v| v.id).collect();
    for segment in network.segments() {
        assert!(valid.contains(&segment.start));
        assert!(valid.contains(&segment.end));
    }
    let segment_ids: Vec<usize> = network.segments().iter().map(|s| s.id.value()).collect();
    assert_eq!(segment_ids, (1..=network.segments().len()).collect::<Vec<_>>());
}

#[test]
fn canonical_network_satisfies_invariants() {
    let network = build_network(&grid_edges(), &GraphBuildOptions::default()).unwrap();
    let before = network.segments().len();
    let network = canonicalize_network(network).unwrap();
    assert!(network.segments().len() < before);

    let mut pairs = HashSet::new();
    for segment in network.segments() {
        assert!(segment.length_m > 0.0);
        assert_ne!(segment.start, segment.end);
        if !segment.oneway {
            assert!(pairs.insert(segment.unordered_pair()));
        }
    }

    let mut diag = Diagnostics::new();
    network.validate_into(&mut diag);
    assert!(!diag.has_errors(), "{diag}");
}

#[test]
fn region_tagging_is_repeatable() {
    let network = build_network(&grid_edges(), &GraphBuildOptions::default()).unwrap();
    let (mut vertices, segments) = network.into_parts();
    let set = RegionSet::new(RegionKind::Zone, zones());

    let first = associate_regions(&mut vertices, &set);
    let snapshot = vertices.clone();
    let second = associate_regions(&mut vertices, &set);
    assert_eq!(first, second);
    assert_eq!(vertices, snapshot);
    assert!(first.matched > 0 && first.unmatched > 0);

    let network = Network::from_parts(vertices, segments).unwrap();
    assert_eq!(network.stats().zoned_vertices, first.matched);
}

#[test]
fn lone_segment_midpoint_snaps_to_segment() {
    let network = canonicalize_network(
        build_network(
            &[edge(vec![(-43.2, -22.9), (-43.1994, -22.9)], false)],
            &GraphBuildOptions::default(),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(network.segments().len(), 1);
    let locator = EventLocator::new(&network).unwrap();
    let id = locator
        .locate(Coord {
            x: -43.1997,
            y: -22.9,
        })
        .unwrap();
    assert_eq!(id, network.segments()[0].id);
}

#[test]
fn four_way_intersection_picks_clearly_closest_arm() {
    // arms leave the centre at distinct angles, so no two share a line
    let centre = Coord { x: 0.0, y: 0.0 };
    let arms = [
        Coord { x: 0.001, y: 0.0002 },
        Coord { x: -0.0003, y: 0.001 },
        Coord { x: -0.001, y: -0.0004 },
        Coord { x: 0.0002, y: -0.001 },
    ];
    let mut vertices = vec![Vertex::new(VertexId::new(1), centre)];
    let mut segments = Vec::new();
    for (i, arm) in arms.iter().enumerate() {
        vertices.push(Vertex::new(VertexId::new(i + 2), *arm));
        segments.push(Segment {
            id: SegmentId::new(i + 1),
            oneway: false,
            name: vec![],
            road_type: vec![],
            start: VertexId::new(1),
            end: VertexId::new(i + 2),
            length_m: 100.0,
        });
    }
    let network = Network::from_parts(vertices, segments).unwrap();
    let locator = EventLocator::new(&network).unwrap();

    // a point a little way along the third arm, nudged off it
    let point = Coord {
        x: -0.0002,
        y: -0.00007,
    };
    let distances: Vec<f64> = arms
        .iter()
        .map(|arm| perpendicular_distance(point, centre, *arm))
        .collect();
    let expected = distances
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i + 1)
        .unwrap();
    assert_eq!(expected, 3);
    for _ in 0..3 {
        assert_eq!(locator.locate(point).unwrap(), SegmentId::new(expected));
    }
}

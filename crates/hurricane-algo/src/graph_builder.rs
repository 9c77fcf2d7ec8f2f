//! Street network construction from raw map edges.

use hurricane_core::geodesy::{
    coord_key, haversine_m, parse_coord_key, round_coord, round_to, COORD_PRECISION,
    DEGENERATE_NUDGE,
};
use hurricane_core::{HurricaneResult, Network, Segment, SegmentId, Vertex, VertexId};
use geo::LineInterpolatePoint;
use geo_types::{Coord, LineString};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Default spacing between redistributed points, in degrees (about 100 m).
pub const DEFAULT_RESOLUTION_DEG: f64 = 0.0009;

/// One road edge as delivered by the map source.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEdge {
    pub geometry: LineString<f64>,
    pub oneway: bool,
    pub names: Vec<String>,
    pub road_types: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphBuildOptions {
    /// Point spacing along each polyline, in degrees.
    pub resolution_deg: f64,
    /// Decimal digits kept on every coordinate.
    pub precision: u32,
}

impl Default for GraphBuildOptions {
    fn default() -> Self {
        Self {
            resolution_deg: DEFAULT_RESOLUTION_DEG,
            precision: COORD_PRECISION,
        }
    }
}

/// A segment before vertex resolution, endpoints still in `"lon,lat"` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SegmentRow {
    oneway: bool,
    name: Vec<String>,
    road_type: Vec<String>,
    start: String,
    end: String,
    /// Length in centimetres, so rows hash and compare exactly.
    length_cm: i64,
}

/// Build the vertex/segment network from an ordered list of raw edges.
///
/// **Algorithm:**
/// 1. Redistribute every polyline into evenly spaced points `resolution_deg`
///    apart and round each coordinate to `precision` digits. When the first
///    and last point of a polyline coincide, the last longitude is nudged by
///    1e-6 so the pair still has a direction.
/// 2. Each consecutive point pair becomes a candidate segment carrying the
///    edge's oneway flag, names and road types; its length is the haversine
///    distance in metres rounded to 2 decimals.
/// 3. Exact duplicate candidates are dropped (first occurrence wins) and the
///    survivors get ids 1..N in order.
/// 4. Endpoints are unified through their `"lon,lat"` text; the distinct keys
///    are sorted and numbered 1..M.
///
/// Empty input yields an empty network. The result is not canonicalized; see
/// [`crate::canonical::canonicalize_segments`].
pub fn build_network(edges: &[RawEdge], options: &GraphBuildOptions) -> HurricaneResult<Network> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for edge in edges {
        let points = redistribute(&edge.geometry, options);
        for pair in points.windows(2) {
            let length_m = round_to(haversine_m(pair[0], pair[1]), 2);
            let row = SegmentRow {
                oneway: edge.oneway,
                name: edge.names.clone(),
                road_type: edge.road_types.clone(),
                start: coord_key(pair[0]),
                end: coord_key(pair[1]),
                length_cm: (length_m * 100.0).round() as i64,
            };
            if seen.insert(row.clone()) {
                rows.push(row);
            }
        }
    }

    let keys: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| [row.start.as_str(), row.end.as_str()])
        .collect();
    let mut vertex_ids = HashMap::with_capacity(keys.len());
    let mut vertices = Vec::with_capacity(keys.len());
    for (index, key) in keys.into_iter().enumerate() {
        let id = VertexId::new(index + 1);
        vertices.push(Vertex::new(id, parse_coord_key(key)?));
        vertex_ids.insert(key, id);
    }

    let segments: Vec<Segment> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| Segment {
            id: SegmentId::new(index + 1),
            oneway: row.oneway,
            name: row.name.clone(),
            road_type: row.road_type.clone(),
            start: vertex_ids[row.start.as_str()],
            end: vertex_ids[row.end.as_str()],
            length_m: row.length_cm as f64 / 100.0,
        })
        .collect();

    debug!(
        edges = edges.len(),
        vertices = vertices.len(),
        segments = segments.len(),
        "built street network"
    );
    Network::from_parts(vertices, segments)
}

/// Evenly spaced points along `line`, rounded to `options.precision`.
///
/// The number of intervals is the planar length divided by the resolution,
/// rounded, and never less than one, so both ends are always kept.
fn redistribute(line: &LineString<f64>, options: &GraphBuildOptions) -> Vec<Coord<f64>> {
    if line.0.is_empty() {
        return Vec::new();
    }
    let planar: f64 = line.lines().map(|l| l.dx().hypot(l.dy())).sum();
    let intervals = if options.resolution_deg > 0.0 {
        ((planar / options.resolution_deg).round() as usize).max(1)
    } else {
        1
    };

    let mut points: Vec<Coord<f64>> = (0..=intervals)
        .map(|step| {
            let fraction = step as f64 / intervals as f64;
            let point = line
                .line_interpolate_point(fraction)
                .map(|p| p.0)
                .unwrap_or(line.0[0]);
            round_with(point, options.precision)
        })
        .collect();

    if let (Some(first), Some(last)) = (points.first().copied(), points.last_mut()) {
        if first == *last {
            last.x = round_to(last.x - DEGENERATE_NUDGE, options.precision);
        }
    }
    points
}

fn round_with(coord: Coord<f64>, precision: u32) -> Coord<f64> {
    if precision == COORD_PRECISION {
        round_coord(coord)
    } else {
        Coord {
            x: round_to(coord.x, precision),
            y: round_to(coord.y, precision),
        }
    }
}

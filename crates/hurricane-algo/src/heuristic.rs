//! Export of a zone-bounded sub-network as a patrol-routing heuristic instance.

use crate::facts::FactTable;
use geo_types::{Coord, Rect};
use hurricane_core::geodesy::{float_text, round_to};
use hurricane_core::{HurricaneError, HurricaneResult, Network, RegionId, RegionPolygon, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io::Write;

/// Degrees of latitude/longitude per kilometre used to widen the box.
pub const DEGREES_PER_KM: f64 = 0.0089;

/// Parameters of one exported instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicRequest {
    pub zones: Vec<RegionId>,
    /// Extra margin around the zones' bounding box.
    #[serde(default)]
    pub margin_km: f64,
    pub agents: u32,
    #[serde(default)]
    pub inter_zone_routes: u32,
    #[serde(default)]
    pub intra_zone_routes: u32,
    pub max_inter_zone_m: f64,
    pub max_intra_zone_m: f64,
    /// Pre-formatted route lines copied verbatim after the segments.
    #[serde(default)]
    pub vip_routes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSegment {
    pub start: VertexId,
    pub end: VertexId,
    pub total: u64,
    pub length_m: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicInstance {
    pub request: HeuristicRequest,
    pub vertices: Vec<(VertexId, RegionId)>,
    pub segments: Vec<InstanceSegment>,
    pub zone_count: usize,
}

/// Cut the sub-network around `request.zones` and attach event totals.
///
/// The box spans every exterior ring coordinate of the selected zones, widened
/// by `margin_km`. Segments touching a vertex inside the box are kept unless
/// they are loops or zero length, one per directed endpoint pair. A segment
/// whose reverse twin has events but which has none itself inherits the twin's
/// total.
pub fn build_instance(
    network: &Network,
    zones: &[RegionPolygon],
    facts: &FactTable,
    request: &HeuristicRequest,
) -> HurricaneResult<HeuristicInstance> {
    let wanted: HashSet<RegionId> = request.zones.iter().copied().collect();
    let corners: Vec<Coord<f64>> = zones
        .iter()
        .filter(|z| z.active && z.id.is_assigned() && wanted.contains(&z.id))
        .flat_map(|z| z.geometry.0.iter())
        .flat_map(|polygon| polygon.exterior().0.iter().copied())
        .collect();
    let bounds = bounding_box(&corners, request.margin_km).ok_or_else(|| {
        HurricaneError::NotFound(format!("no active zone among {:?}", request.zones))
    })?;

    let inside: HashSet<VertexId> = network
        .vertices()
        .iter()
        .filter(|v| {
            let (min, max) = (bounds.min(), bounds.max());
            v.coord.x >= min.x && v.coord.x <= max.x && v.coord.y >= min.y && v.coord.y <= max.y
        })
        .map(|v| v.id)
        .collect();

    let totals = facts.segment_totals();
    let mut pairs = HashSet::new();
    let mut segments: Vec<InstanceSegment> = network
        .segments()
        .iter()
        .filter(|s| (inside.contains(&s.start) || inside.contains(&s.end)) && !s.is_degenerate())
        .filter(|s| pairs.insert((s.start, s.end)))
        .map(|s| InstanceSegment {
            start: s.start,
            end: s.end,
            total: totals.get(&s.id).copied().unwrap_or(0),
            length_m: round_to(s.length_m, 2),
        })
        .collect();
    equalize_twins(&mut segments);

    let used: BTreeSet<VertexId> = segments.iter().flat_map(|s| [s.start, s.end]).collect();
    let vertices: Vec<(VertexId, RegionId)> = used
        .into_iter()
        .filter_map(|id| network.vertex(id).map(|v| (id, v.zone_id)))
        .collect();
    let zone_count = vertices
        .iter()
        .map(|(_, zone)| *zone)
        .collect::<HashSet<_>>()
        .len();

    Ok(HeuristicInstance {
        request: request.clone(),
        vertices,
        segments,
        zone_count,
    })
}

fn bounding_box(points: &[Coord<f64>], margin_km: f64) -> Option<Rect<f64>> {
    let first = points.first()?;
    let (mut min, mut max) = (*first, *first);
    for point in &points[1..] {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }
    let margin = margin_km * DEGREES_PER_KM;
    Some(Rect::new(
        Coord {
            x: min.x - margin,
            y: min.y - margin,
        },
        Coord {
            x: max.x + margin,
            y: max.y + margin,
        },
    ))
}

fn equalize_twins(segments: &mut [InstanceSegment]) {
    let index: HashMap<(VertexId, VertexId), usize> = segments
        .iter()
        .enumerate()
        .map(|(i, s)| ((s.start, s.end), i))
        .collect();
    let loaded: Vec<(VertexId, VertexId, u64)> = segments
        .iter()
        .filter(|s| s.total > 0)
        .map(|s| (s.start, s.end, s.total))
        .collect();
    for (start, end, total) in loaded {
        if let Some(&twin) = index.get(&(end, start)) {
            if segments[twin].total == 0 {
                segments[twin].total = total;
            }
        }
    }
}

impl HeuristicInstance {
    /// Write the instance in the solver's plain-text format.
    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        let r = &self.request;
        writeln!(
            out,
            "{} {} {} {} {} {} {} {}",
            self.vertices.len(),
            self.segments.len(),
            self.zone_count,
            r.agents,
            r.inter_zone_routes,
            r.intra_zone_routes,
            float_text(r.max_inter_zone_m),
            float_text(r.max_intra_zone_m)
        )?;
        for (vertex, zone) in &self.vertices {
            writeln!(out, "{} {}", vertex.value(), zone.value())?;
        }
        for s in &self.segments {
            writeln!(
                out,
                "{} {} {} {}",
                s.start.value(),
                s.end.value(),
                s.total,
                float_text(s.length_m)
            )?;
        }
        for route in &r.vip_routes {
            writeln!(out, "{route}")?;
        }
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

//! Snapping event coordinates onto the street network.

use geo_types::Coord;
use hurricane_core::geodesy::{haversine_m, perpendicular_distance};
use hurricane_core::{HurricaneError, HurricaneResult, Network, Segment, SegmentId, Vertex};

/// Nearest-segment search over one network generation.
///
/// Only vertices with at least one incident segment take part in the
/// nearest-vertex scan. Canonicalization can strand a vertex whose every
/// segment was a loop, and such a vertex has nothing to snap onto.
#[derive(Debug, Clone)]
pub struct EventLocator<'a> {
    network: &'a Network,
    anchors: Vec<&'a Vertex>,
}

impl<'a> EventLocator<'a> {
    /// Fails with [`HurricaneError::Validation`] when the network has no
    /// vertex with an incident segment.
    pub fn new(network: &'a Network) -> HurricaneResult<Self> {
        let anchors: Vec<&Vertex> = network
            .vertices()
            .iter()
            .filter(|v| !network.incident_segments(v.id).is_empty())
            .collect();
        if anchors.is_empty() {
            return Err(HurricaneError::Validation(
                "cannot locate events on an empty street network".into(),
            ));
        }
        Ok(Self { network, anchors })
    }

    pub fn network(&self) -> &'a Network {
        self.network
    }

    /// Vertex with the smallest great-circle distance to `point`.
    ///
    /// Exact ties resolve to the vertex met first in arena order.
    pub fn nearest_vertex(&self, point: Coord<f64>) -> &'a Vertex {
        let mut best = self.anchors[0];
        let mut best_distance = haversine_m(point, best.coord);
        for vertex in self.anchors[1..].iter().copied() {
            let distance = haversine_m(point, vertex.coord);
            if distance < best_distance {
                best = vertex;
                best_distance = distance;
            }
        }
        best
    }

    /// Segment an event at `point` belongs to.
    ///
    /// **Algorithm:**
    /// 1. Find the nearest vertex (haversine, first wins on ties).
    /// 2. Collect the segments that start or end at it, in id order.
    /// 3. A single candidate is returned directly. With several (an
    ///    intersection) the one whose supporting line is closest to the point
    ///    in planar terms wins, again first on ties.
    ///
    /// A nearest vertex with no incident segment is a
    /// [`HurricaneError::NotFound`].
    pub fn locate(&self, point: Coord<f64>) -> HurricaneResult<SegmentId> {
        let nearest = self.nearest_vertex(point);
        let candidates = self.network.incident_segments(nearest.id);
        match candidates.as_slice() {
            [] => Err(HurricaneError::NotFound(format!(
                "vertex {} has no incident segment",
                nearest.id.value()
            ))),
            [only] => Ok(only.id),
            [first, rest @ ..] => {
                let distance_to = |segment: &Segment| {
                    self.network
                        .endpoints(segment)
                        .map(|(p1, p2)| perpendicular_distance(point, p1, p2))
                        .unwrap_or(f64::INFINITY)
                };
                let mut best = first.id;
                let mut best_distance = distance_to(first);
                for segment in rest {
                    let distance = distance_to(segment);
                    if distance < best_distance {
                        best = segment.id;
                        best_distance = distance;
                    }
                }
                Ok(best)
            }
        }
    }
}

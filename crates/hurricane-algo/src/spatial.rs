//! Tagging vertices with the administrative region that contains them.

use geo::{BoundingRect, Contains};
use geo_types::{Point, Rect};
use hurricane_core::{RegionId, RegionKind, RegionPolygon, Vertex};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::debug;

/// Polygons of one region kind in the order they are scanned.
///
/// Scan order decides which region wins where polygons overlap, so it is
/// fixed at construction: zones by ascending priority, districts and
/// neighborhoods by id. Inactive rows and rows with id 0 are dropped.
#[derive(Debug, Clone)]
pub struct RegionSet {
    kind: RegionKind,
    entries: Vec<RegionEntry>,
}

#[derive(Debug, Clone)]
struct RegionEntry {
    id: RegionId,
    bounds: Option<Rect<f64>>,
    polygon: RegionPolygon,
}

/// Per-run tagging counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationSummary {
    pub kind: RegionKind,
    pub matched: usize,
    pub unmatched: usize,
}

impl RegionSet {
    /// Order polygons by the precedence policy of `kind`.
    ///
    /// Zones without a priority sort after every prioritized zone; equal
    /// priorities keep their input order.
    pub fn new(kind: RegionKind, polygons: Vec<RegionPolygon>) -> Self {
        let mut polygons: Vec<RegionPolygon> = polygons
            .into_iter()
            .filter(|p| p.active && p.id.is_assigned())
            .collect();
        match kind {
            RegionKind::Zone => {
                polygons.sort_by_key(|p| (p.priority.is_none(), p.priority.unwrap_or_default()))
            }
            RegionKind::District | RegionKind::Neighborhood => polygons.sort_by_key(|p| p.id),
        }
        let entries = polygons
            .into_iter()
            .map(|polygon| RegionEntry {
                id: polygon.id,
                bounds: polygon.geometry.bounding_rect(),
                polygon,
            })
            .collect();
        Self { kind, entries }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn polygons(&self) -> impl Iterator<Item = &RegionPolygon> {
        self.entries.iter().map(|entry| &entry.polygon)
    }

    /// Id of the first polygon, in scan order, whose area contains `point`.
    pub fn region_of(&self, point: Point<f64>) -> RegionId {
        self.entries
            .iter()
            .find(|entry| {
                entry
                    .bounds
                    .map(|rect| within_rect(&rect, point))
                    .unwrap_or(false)
                    && entry.polygon.geometry.contains(&point)
            })
            .map(|entry| entry.id)
            .unwrap_or(RegionId::UNASSIGNED)
    }
}

// Inclusive bounding-box prefilter; the polygon test decides on the boundary.
fn within_rect(rect: &Rect<f64>, point: Point<f64>) -> bool {
    let (min, max) = (rect.min(), rect.max());
    point.x() >= min.x && point.x() <= max.x && point.y() >= min.y && point.y() <= max.y
}

/// Set the `regions.kind()` id of every vertex.
///
/// Each vertex gets the id of the first containing polygon in scan order, or
/// 0 when none contains it. Ids of the other region kinds are untouched, so
/// the call is repeated once per kind over the same vertices. Re-running with
/// the same polygons yields the same assignment.
pub fn associate_regions(vertices: &mut [Vertex], regions: &RegionSet) -> AssociationSummary {
    let kind = regions.kind();
    let tag = |vertex: &mut Vertex| {
        let id = regions.region_of(Point::from(vertex.coord));
        vertex.set_region(kind, id);
    };

    #[cfg(feature = "parallel")]
    vertices.par_iter_mut().for_each(tag);
    #[cfg(not(feature = "parallel"))]
    vertices.iter_mut().for_each(tag);

    let matched = vertices
        .iter()
        .filter(|v| v.region(kind).is_assigned())
        .count();
    let summary = AssociationSummary {
        kind,
        matched,
        unmatched: vertices.len() - matched,
    };
    debug!(
        kind = kind.as_str(),
        polygons = regions.len(),
        matched = summary.matched,
        unmatched = summary.unmatched,
        "associated vertices with regions"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{polygon, Coord, MultiPolygon};
    use hurricane_core::VertexId;

    fn square(id: i64, x0: f64, y0: f64, size: f64, priority: Option<i64>) -> RegionPolygon {
        let poly = polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ];
        RegionPolygon {
            id: RegionId::new(id),
            geometry: MultiPolygon(vec![poly]),
            priority,
            name: format!("region {id}"),
            active: true,
        }
    }

    fn vertices() -> Vec<Vertex> {
        [(0.5, 0.5), (1.5, 0.5), (5.0, 5.0)]
            .iter()
            .enumerate()
            .map(|(i, (x, y))| Vertex::new(VertexId::new(i + 1), Coord { x: *x, y: *y }))
            .collect()
    }

    #[test]
    fn zones_follow_priority_order() {
        // zone 7 overlaps zone 3 but has the better priority
        let zones = RegionSet::new(
            RegionKind::Zone,
            vec![
                square(3, 0.0, 0.0, 2.0, Some(2)),
                square(7, 0.0, 0.0, 1.0, Some(1)),
            ],
        );
        let mut vs = vertices();
        let summary = associate_regions(&mut vs, &zones);
        assert_eq!(vs[0].zone_id, RegionId::new(7));
        assert_eq!(vs[1].zone_id, RegionId::new(3));
        assert_eq!(vs[2].zone_id, RegionId::UNASSIGNED);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.unmatched, 1);
    }

    #[test]
    fn districts_scan_by_id() {
        let districts = RegionSet::new(
            RegionKind::District,
            vec![square(9, 0.0, 0.0, 2.0, None), square(4, 0.0, 0.0, 2.0, None)],
        );
        let mut vs = vertices();
        associate_regions(&mut vs, &districts);
        assert_eq!(vs[0].district_id, RegionId::new(4));
        assert_eq!(vs[0].zone_id, RegionId::UNASSIGNED);
    }

    #[test]
    fn inactive_and_default_rows_are_skipped() {
        let mut inactive = square(2, 0.0, 0.0, 2.0, None);
        inactive.active = false;
        let set = RegionSet::new(
            RegionKind::Neighborhood,
            vec![inactive, square(0, 0.0, 0.0, 2.0, None)],
        );
        assert!(set.is_empty());
    }

    #[test]
    fn association_is_idempotent() {
        let zones = RegionSet::new(RegionKind::Zone, vec![square(1, 0.0, 0.0, 1.0, Some(1))]);
        let mut first = vertices();
        associate_regions(&mut first, &zones);
        let mut second = first.clone();
        associate_regions(&mut second, &zones);
        assert_eq!(first, second);
    }

    #[test]
    fn unprioritized_zones_scan_last() {
        let zones = RegionSet::new(
            RegionKind::Zone,
            vec![square(5, 0.0, 0.0, 2.0, None), square(6, 0.0, 0.0, 2.0, Some(10))],
        );
        let ids: Vec<i64> = zones.polygons().map(|p| p.id.value()).collect();
        assert_eq!(ids, vec![6, 5]);
    }
}

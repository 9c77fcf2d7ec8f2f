//! Collapsing the duplicate edges a directional map source produces.

use hurricane_core::{HurricaneResult, Network, Segment};
use std::collections::HashSet;
use tracing::debug;

/// Canonical segment set: one row per undirected two-way street, no loops.
///
/// **Algorithm:**
/// 1. One-way segments pass through unchanged.
/// 2. Two-way segments are reoriented so `start <= end`, sorted by
///    `(start, end, id)` and only the lowest id of each endpoint pair is kept.
/// 3. One-way rows come first, then the surviving two-way rows; finally every
///    row with zero length or `start == end` is dropped.
///
/// Segment ids are never renumbered.
pub fn canonicalize_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let input = segments.len();
    let (oneway, mut twoway): (Vec<Segment>, Vec<Segment>) =
        segments.into_iter().partition(|s| s.oneway);

    for segment in &mut twoway {
        if segment.start > segment.end {
            std::mem::swap(&mut segment.start, &mut segment.end);
        }
    }
    twoway.sort_by_key(|s| (s.start, s.end, s.id));

    let mut seen = HashSet::with_capacity(twoway.len());
    let canonical: Vec<Segment> = oneway
        .into_iter()
        .chain(twoway.into_iter().filter(|s| seen.insert((s.start, s.end))))
        .filter(|s| !s.is_degenerate())
        .collect();

    debug!(
        input,
        output = canonical.len(),
        "canonicalized street segments"
    );
    canonical
}

/// Rebuild `network` with its segments canonicalized; vertices are kept as is.
pub fn canonicalize_network(network: Network) -> HurricaneResult<Network> {
    let (vertices, segments) = network.into_parts();
    Network::from_parts(vertices, canonicalize_segments(segments))
}

//! Integration tests for re-runnable merges and time bucket allocation.

use chrono::NaiveDate;
use geo_types::Coord;
use hurricane_algo::*;
use hurricane_core::{
    EventCandidate, EventRecord, Network, Segment, SegmentId, TimeId, Vertex, VertexId,
};
use std::collections::BTreeMap;

fn network() -> Network {
    let vertices = (0..4)
        .map(|i| {
            Vertex::new(
                VertexId::new(i + 1),
                Coord {
                    x: -43.2 + i as f64 * 0.001,
                    y: -22.9,
                },
            )
        })
        .collect();
    let segments = (1..4)
        .map(|i| Segment {
            id: SegmentId::new(i),
            oneway: false,
            name: vec![],
            road_type: vec![],
            start: VertexId::new(i),
            end: VertexId::new(i + 1),
            length_m: 102.6,
        })
        .collect();
    Network::from_parts(vertices, segments).unwrap()
}

fn candidate(key: &str, lon: f64, day: u32) -> EventCandidate {
    EventCandidate {
        key: key.to_string(),
        date: NaiveDate::from_ymd_opt(2021, 8, day),
        period: Some("Madrugada".to_string()),
        latitude: Some(-22.9001),
        longitude: Some(lon),
        category: "roubo".to_string(),
        features: BTreeMap::new(),
    }
}

fn keys(rows: &[EventRecord]) -> Vec<&str> {
    rows.iter().map(|r| r.key.as_str()).collect()
}

#[test]
fn merge_is_idempotent() {
    let network = network();
    let locator = EventLocator::new(&network).unwrap();
    let a = candidate("A", -43.1995, 1);
    let b = candidate("B", -43.1985, 2);
    let c = candidate("C", -43.1975, 3);

    let persisted = merge_partition(Vec::new(), vec![a, b.clone()], &locator)
        .unwrap()
        .rows;
    assert_eq!(keys(&persisted), vec!["A", "B"]);

    let mut rows = persisted;
    for round in 0..3 {
        let outcome = merge_partition(rows, vec![b.clone(), c.clone()], &locator).unwrap();
        rows = outcome.rows;
        assert_eq!(keys(&rows), vec!["A", "B", "C"]);
        let expected_inserted = if round == 0 { 1 } else { 0 };
        assert_eq!(outcome.stats.inserted, expected_inserted);
    }
    assert!(rows.iter().all(|r| r.segment_id.is_some()));
}

#[test]
fn partitions_split_events_by_longitude_text() {
    let longitudes = [-43.1995, -43.1985, -43.1975, -43.19, -43.0];
    let partitions: Vec<Option<u8>> = longitudes
        .iter()
        .map(|lon| partition_of(*lon, &DEFAULT_PARTITIONS))
        .collect();
    assert_eq!(partitions, vec![Some(5), Some(5), Some(5), Some(9), None]);
}

#[test]
fn time_ids_are_stable_across_overlapping_batches() {
    let network = network();
    let locator = EventLocator::new(&network).unwrap();
    let first_rows = merge_partition(
        Vec::new(),
        vec![candidate("A", -43.1995, 1), candidate("B", -43.1985, 2)],
        &locator,
    )
    .unwrap()
    .rows;
    let first = allocate_time_buckets(Vec::new(), derive_time_keys(&first_rows))
        .unwrap()
        .ledger;

    let second_rows = merge_partition(
        first_rows,
        vec![candidate("C", -43.1975, 2), candidate("D", -43.1975, 9)],
        &locator,
    )
    .unwrap()
    .rows;
    let second = allocate_time_buckets(first.clone(), derive_time_keys(&second_rows)).unwrap();

    assert_eq!(&second.ledger[..first.len()], &first[..]);
    assert_eq!(second.added, 1);
    let max_before = first.iter().map(|b| b.id).max().unwrap();
    assert!(second.ledger[first.len()..].iter().all(|b| b.id > max_before));
    assert_eq!(second.ledger.last().unwrap().id, TimeId::new(3));

    let table = build_fact_table(&second_rows, &second.ledger, &[], &[]).unwrap();
    let total: u64 = table.rows.iter().map(|r| r.total()).sum();
    assert_eq!(total, 4);
}

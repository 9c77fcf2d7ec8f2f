use chrono::NaiveDate;
use hurricane_algo::{GraphBuildOptions, HeuristicRequest, InterfaceSpec};
use hurricane_batch::ledgers::{read_candidates, read_events, read_markers, read_time};
use hurricane_batch::{
    allocate_time, build_facts, export_heuristic, ingest_interfaces, rebuild_network, run_merge,
    InterfaceSource, MergeRunConfig, RebuildRequest,
};
use hurricane_core::{HurricaneError, RegionId, RegionKind};
use hurricane_io::{CsvRegionSource, IpcStore, JsonEdgeFile, LakeLayout, Place, TableStore};
use std::fs;
use tempfile::TempDir;

const MAP: &str = r#"{
    "Niterói, RJ, Brazil": [
        { "geometry": [[-43.2, -22.9], [-43.1991, -22.9]], "oneway": false,
          "name": "Rua Horizontal", "highway": "residential" },
        { "geometry": [[-43.1991, -22.9], [-43.2, -22.9]], "oneway": false,
          "name": "Rua Horizontal", "highway": "residential" },
        { "geometry": [[-43.2, -22.9], [-43.2, -22.8991]], "oneway": false,
          "name": "Rua Vertical", "highway": "residential" }
    ]
}"#;

const ZONES: &str = "\
id,name,priority,active,wkt
1,Centro,1,true,\"POLYGON((-43.3 -23.0, -43.1 -23.0, -43.1 -22.8, -43.3 -22.8, -43.3 -23.0))\"
";

// Longitudes end in 5 and 1, one event per partition.
const FURTO: &str = "\
ID,DATE,PERIOD,LATITUDE,LONGITUDE
10,2023-05-14,NOITE,-22.9,-43.1995
11,2023-05-15,MANHA,-22.8995,-43.2001
";

struct Lake {
    _dir: TempDir,
    layout: LakeLayout,
    store: IpcStore,
    map: JsonEdgeFile,
    regions: CsvRegionSource,
    sources: Vec<InterfaceSource>,
}

impl Lake {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("map.json"), MAP).unwrap();
        fs::write(root.join("zones.csv"), ZONES).unwrap();

        let sources = vec![InterfaceSource {
            spec: InterfaceSpec::new("furto", vec!["ID".to_string()]),
            path: root.join("furto.csv"),
        }];
        Self {
            layout: LakeLayout::new(root.join("lake"), "crimes"),
            store: IpcStore::new(),
            map: JsonEdgeFile::new(root.join("map.json")),
            regions: CsvRegionSource::new().with_file(RegionKind::Zone, root.join("zones.csv")),
            sources,
            _dir: dir,
        }
    }

    fn rebuild(&self, day: u32) -> anyhow::Result<hurricane_batch::RebuildReport> {
        let request = RebuildRequest {
            places: vec![Place::new("Niterói", "RJ", "Brazil")],
            options: GraphBuildOptions::default(),
            today: date(day),
        };
        rebuild_network(&self.layout, &self.store, &self.map, &self.regions, &request)
    }

    /// Drop `contents` in as the raw furto file and ingest it.
    fn ingest(&self, day: u32, contents: &str) {
        fs::write(&self.sources[0].path, contents).unwrap();
        let reports = ingest_interfaces(&self.layout, &self.store, &self.sources, date(day)).unwrap();
        assert_eq!(reports.len(), 1);
    }

    fn merge(&self) -> hurricane_batch::MergeSummary {
        self.merge_partitions(&[1, 5])
    }

    fn merge_partitions(&self, partitions: &[u8]) -> hurricane_batch::MergeSummary {
        let config = MergeRunConfig {
            partitions: partitions.to_vec(),
            interfaces: vec!["furto".to_string()],
            feature_columns: Vec::new(),
            threads: 2,
        };
        run_merge(&self.layout, &self.store, &config).unwrap()
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

#[test]
fn second_rebuild_on_same_day_conflicts() {
    let lake = Lake::new();
    lake.rebuild(1).unwrap();

    let err = lake.rebuild(1).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HurricaneError>(),
        Some(HurricaneError::Conflict(_))
    ));

    let markers = read_markers(&lake.store, &lake.layout.model_historic_dates()).unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].date, date(1));
    assert!(!lake.layout.silver_historic_dir().exists());
}

#[test]
fn next_day_rebuild_archives_previous_generation() {
    let lake = Lake::new();
    let first = lake.rebuild(1).unwrap();
    assert_eq!(first.stats.num_segments, 2);
    assert_eq!(first.stats.zoned_vertices, 3);

    let second = lake.rebuild(2).unwrap();
    let archived = second.archived.unwrap();
    assert!(archived.ends_with("network_2024-03-02"));
    assert!(archived.join("manifest.json").exists());

    let markers = read_markers(&lake.store, &lake.layout.model_historic_dates()).unwrap();
    let dates: Vec<_> = markers.iter().map(|m| m.date).collect();
    assert_eq!(dates, vec![date(1), date(2)]);
}

#[test]
fn merge_is_idempotent_across_runs() {
    let lake = Lake::new();
    lake.rebuild(1).unwrap();
    lake.ingest(1, FURTO);

    let first = lake.merge();
    assert_eq!(first.success, 2);
    assert!(first.network_changed);
    assert!(first.manifest_path.exists());

    let east = read_events(&lake.store, &lake.layout.partition(5)).unwrap();
    assert_eq!(east.len(), 1);
    assert_eq!(east[0].key, "10");
    assert!(east[0].segment_id.is_some());

    let second = lake.merge();
    assert!(!second.network_changed);
    assert!(second
        .jobs
        .iter()
        .all(|job| job.stats.as_ref().is_some_and(|s| s.inserted == 0)));
    assert_eq!(
        read_events(&lake.store, &lake.layout.partition(5)).unwrap(),
        east
    );
}

#[test]
fn time_and_facts_follow_the_ledgers() {
    let lake = Lake::new();
    lake.rebuild(1).unwrap();
    lake.ingest(1, FURTO);
    lake.merge();

    let time = allocate_time(&lake.layout, &lake.store, &[1, 5]).unwrap();
    assert_eq!(time.added, 2);
    let ids: Vec<u64> = read_time(&lake.store, &lake.layout.time())
        .unwrap()
        .iter()
        .map(|b| b.id.value())
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(allocate_time(&lake.layout, &lake.store, &[1, 5]).unwrap().added, 0);

    let facts = build_facts(&lake.layout, &lake.store, &[1, 5], &[], &["roubo".to_string()]).unwrap();
    assert_eq!(facts.rows, 2);
    assert_eq!(facts.events, 2);
    assert_eq!(facts.categories, vec!["furto", "roubo"]);

    let request = HeuristicRequest {
        zones: vec![RegionId::new(1)],
        margin_km: 0.5,
        agents: 2,
        inter_zone_routes: 0,
        intra_zone_routes: 1,
        max_inter_zone_m: 1000.0,
        max_intra_zone_m: 500.0,
        vip_routes: Vec::new(),
    };
    let path = export_heuristic(&lake.layout, &lake.store, &lake.regions, &request, "centro").unwrap();
    let text = fs::read_to_string(path).unwrap();
    assert!(text.starts_with("3 2 1 2 0 1 1000.0 500.0\n"));
}

#[test]
fn rebuild_invalidates_partition_ledgers() {
    let lake = Lake::new();
    lake.rebuild(1).unwrap();
    lake.ingest(1, FURTO);
    lake.merge();

    lake.rebuild(2).unwrap();
    let summary = lake.merge();
    assert!(summary.network_changed);

    let archived = lake
        .layout
        .silver_historic_dir()
        .join("crimes_5_2024-03-01.arrow");
    assert!(lake.store.exists(&archived));

    let events = read_events(&lake.store, &lake.layout.partition(5)).unwrap();
    assert_eq!(events.len(), 1);
    assert!(events[0].segment_id.is_some());
}

#[test]
fn events_survive_rebuild_after_incremental_batches() {
    let lake = Lake::new();
    lake.rebuild(1).unwrap();
    lake.ingest(1, FURTO);
    lake.merge();

    lake.ingest(
        2,
        "ID,DATE,PERIOD,LATITUDE,LONGITUDE\n12,2023-05-16,TARDE,-22.9,-43.1985\n",
    );
    lake.merge();
    assert_eq!(
        read_candidates(&lake.store, &lake.layout.interface("furto")).unwrap().len(),
        3
    );
    let raw_historic = lake.layout.raw_historic_dir();
    assert!(raw_historic.join("furto_2024-03-01.csv").exists());
    assert!(raw_historic.join("furto_2024-03-02.csv").exists());

    lake.rebuild(2).unwrap();
    let summary = lake.merge();
    assert!(summary.network_changed);

    let mut keys: Vec<String> = [1, 5]
        .iter()
        .flat_map(|&p| read_events(&lake.store, &lake.layout.partition(p)).unwrap())
        .map(|event| event.key)
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["10", "11", "12"]);
}

#[test]
fn network_change_archives_partitions_outside_the_run() {
    let lake = Lake::new();
    lake.rebuild(1).unwrap();
    lake.ingest(1, FURTO);
    lake.merge();
    assert!(lake.store.exists(&lake.layout.partition(1)));

    lake.rebuild(2).unwrap();
    let summary = lake.merge_partitions(&[5]);
    assert!(summary.network_changed);

    let historic = lake.layout.silver_historic_dir();
    assert!(lake.store.exists(&historic.join("crimes_1_2024-03-01.arrow")));
    assert!(lake.store.exists(&historic.join("crimes_5_2024-03-01.arrow")));
    assert!(!lake.store.exists(&lake.layout.partition(1)));

    // the next run over partition 1 starts from a clean ledger
    let later = lake.merge_partitions(&[1]);
    assert!(!later.network_changed);
    let west = read_events(&lake.store, &lake.layout.partition(1)).unwrap();
    assert_eq!(west.len(), 1);
    assert_eq!(west[0].key, "11");
}

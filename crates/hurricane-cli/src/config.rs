//! Pipeline configuration loaded from TOML.
//!
//! The file is read once by the binary; every stage gets the pieces it
//! needs from here as explicit arguments.

use crate::cli::parse_list;
use anyhow::{Context, Result};
use hurricane_algo::{GraphBuildOptions, HeuristicRequest, DEFAULT_PARTITIONS};
use hurricane_batch::{InterfaceSource, MergeRunConfig};
use hurricane_core::{HurricaneError, RegionKind};
use hurricane_io::{validate_places, CsvRegionSource, JsonEdgeFile, LakeLayout, Place};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Polygon tables per region kind. Kinds left unset tag no vertex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionFiles {
    pub zone: Option<PathBuf>,
    pub district: Option<PathBuf>,
    pub neighborhood: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Lake root.
    pub workdir: PathBuf,
    pub places: Vec<Place>,
    pub regions: RegionFiles,
    /// Raw edge JSON keyed by place label.
    pub map_source: PathBuf,
    pub interfaces: Vec<InterfaceSource>,
    pub fact_table: String,
    pub partitions: Vec<u8>,
    /// Worker threads for the partition merge; 0 uses every core.
    pub threads: usize,
    pub resolution_deg: f64,
    pub precision: u32,
    pub heuristic: Option<HeuristicRequest>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let graph = GraphBuildOptions::default();
        Self {
            workdir: PathBuf::from("lake"),
            places: Vec::new(),
            regions: RegionFiles::default(),
            map_source: PathBuf::from("map.json"),
            interfaces: Vec::new(),
            fact_table: "events".to_string(),
            partitions: DEFAULT_PARTITIONS.to_vec(),
            threads: 0,
            resolution_deg: graph.resolution_deg,
            precision: graph.precision,
            heuristic: None,
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a config file. Relative paths inside it are taken
    /// relative to the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .map_err(|e| HurricaneError::Parse(format!("{}: {e}", path.display())))?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.workdir);
        join(&mut self.map_source);
        for file in [
            &mut self.regions.zone,
            &mut self.regions.district,
            &mut self.regions.neighborhood,
        ]
        .into_iter()
        .flatten()
        {
            join(file);
        }
        for source in &mut self.interfaces {
            join(&mut source.path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_places(&self.places)?;
        validate_partitions(&self.partitions)?;
        if self.fact_table.trim().is_empty() {
            return Err(HurricaneError::Validation("fact_table is empty".into()).into());
        }
        if self.resolution_deg.is_nan() || self.resolution_deg <= 0.0 {
            return Err(HurricaneError::Validation(format!(
                "resolution_deg must be positive, got {}",
                self.resolution_deg
            ))
            .into());
        }
        let mut names = BTreeSet::new();
        for source in &self.interfaces {
            if source.spec.key_columns.is_empty() {
                return Err(HurricaneError::Validation(format!(
                    "interface '{}' has no key columns",
                    source.spec.name
                ))
                .into());
            }
            if !names.insert(source.spec.name.as_str()) {
                return Err(HurricaneError::Validation(format!(
                    "interface '{}' declared twice",
                    source.spec.name
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn layout(&self) -> LakeLayout {
        LakeLayout::new(&self.workdir, &self.fact_table)
    }

    pub fn graph_options(&self) -> GraphBuildOptions {
        GraphBuildOptions {
            resolution_deg: self.resolution_deg,
            precision: self.precision,
        }
    }

    pub fn map(&self) -> JsonEdgeFile {
        JsonEdgeFile::new(&self.map_source)
    }

    pub fn region_source(&self) -> CsvRegionSource {
        let files = [
            (RegionKind::Zone, &self.regions.zone),
            (RegionKind::District, &self.regions.district),
            (RegionKind::Neighborhood, &self.regions.neighborhood),
        ];
        files
            .into_iter()
            .fold(CsvRegionSource::new(), |source, (kind, file)| match file {
                Some(path) => source.with_file(kind, path),
                None => source,
            })
    }

    /// Category labels, one per interface, in declaration order.
    pub fn categories(&self) -> Vec<String> {
        self.interfaces.iter().map(|s| s.spec.name.clone()).collect()
    }

    /// Union of the interfaces' feature columns, first declaration wins.
    pub fn feature_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for source in &self.interfaces {
            for column in &source.spec.feature_columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        columns
    }

    pub fn merge_config(&self) -> MergeRunConfig {
        MergeRunConfig {
            partitions: self.partitions.clone(),
            interfaces: self.categories(),
            feature_columns: self.feature_columns(),
            threads: self.threads,
        }
    }
}

pub fn validate_partitions(partitions: &[u8]) -> Result<()> {
    if partitions.is_empty() {
        return Err(HurricaneError::Validation("partition list is empty".into()).into());
    }
    if let Some(bad) = partitions.iter().find(|&&d| d > 9) {
        return Err(HurricaneError::Validation(format!("partition {bad} is not a digit")).into());
    }
    Ok(())
}

/// Parse a `--partitions` override and hold it to the same rules as the
/// config file.
pub fn parse_partitions(spec: &str) -> Result<Vec<u8>> {
    let partitions: Vec<u8> =
        parse_list(spec).with_context(|| format!("parsing partitions '{spec}'"))?;
    validate_partitions(&partitions)?;
    Ok(partitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
workdir = "lake"
fact_table = "crimes"
map_source = "maps/edges.json"
partitions = [1, 5]

[[places]]
city = "Niterói"
state = "RJ"
country = "Brazil"

[regions]
zone = "zones.csv"

[[interfaces]]
name = "furto"
key_columns = ["ID"]
feature_columns = ["WEAPON"]
path = "raw/furto.csv"

[[interfaces]]
name = "roubo"
key_columns = ["ID", "SEQ"]
feature_columns = ["WEAPON", "VICTIM"]
path = "/data/roubo.csv"
"#;

    fn write(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hurricane.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn load_resolves_relative_paths() {
        let (dir, path) = write(SAMPLE);
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.workdir, dir.path().join("lake"));
        assert_eq!(config.map_source, dir.path().join("maps/edges.json"));
        assert_eq!(config.regions.zone, Some(dir.path().join("zones.csv")));
        assert_eq!(config.regions.district, None);
        assert_eq!(config.interfaces[0].path, dir.path().join("raw/furto.csv"));
        assert_eq!(config.interfaces[1].path, PathBuf::from("/data/roubo.csv"));
        assert_eq!(config.interfaces[0].spec.date_column, "DATE");
    }

    #[test]
    fn defaults_fill_unset_fields() {
        let (_dir, path) = write(SAMPLE);
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.threads, 0);
        assert_eq!(config.graph_options(), GraphBuildOptions::default());
        assert!(config.heuristic.is_none());
        assert_eq!(PipelineConfig::default().partitions, DEFAULT_PARTITIONS.to_vec());
    }

    #[test]
    fn categories_and_features_follow_interfaces() {
        let (_dir, path) = write(SAMPLE);
        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.categories(), vec!["furto", "roubo"]);
        assert_eq!(config.feature_columns(), vec!["WEAPON", "VICTIM"]);
        let merge = config.merge_config();
        assert_eq!(merge.partitions, vec![1, 5]);
        assert_eq!(merge.interfaces, vec!["furto", "roubo"]);
    }

    fn validation_error(config: &PipelineConfig) -> bool {
        matches!(
            config.validate().unwrap_err().downcast_ref::<HurricaneError>(),
            Some(HurricaneError::Validation(_))
        )
    }

    #[test]
    fn missing_places_are_rejected() {
        assert!(validation_error(&PipelineConfig::default()));

        let mut config = PipelineConfig {
            places: vec![Place::new("Niterói", "", "Brazil")],
            ..PipelineConfig::default()
        };
        assert!(validation_error(&config));

        config.places = vec![Place::new("Niterói", "RJ", "Brazil")];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_partitions_are_rejected() {
        let mut config = PipelineConfig {
            places: vec![Place::new("Niterói", "RJ", "Brazil")],
            partitions: Vec::new(),
            ..PipelineConfig::default()
        };
        assert!(validation_error(&config));
        config.partitions = vec![3, 12];
        assert!(validation_error(&config));
    }

    #[test]
    fn partition_override_follows_config_rules() {
        assert_eq!(parse_partitions(" 1, 5 ").unwrap(), vec![1, 5]);
        for spec in ["", " , ", "3,12"] {
            let err = parse_partitions(spec).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<HurricaneError>(),
                    Some(HurricaneError::Validation(_))
                ),
                "{spec:?} should be a validation error"
            );
        }
        assert!(parse_partitions("1,x").is_err());
    }

    #[test]
    fn heuristic_section_parses() {
        let text = format!(
            "{SAMPLE}\n[heuristic]\nzones = [1, 4]\nagents = 3\nmax_inter_zone_m = 2000.0\nmax_intra_zone_m = 800.0\n"
        );
        let (_dir, path) = write(&text);
        let request = PipelineConfig::load(&path).unwrap().heuristic.unwrap();
        assert_eq!(request.zones.len(), 2);
        assert_eq!(request.agents, 3);
        assert_eq!(request.margin_km, 0.0);
        assert!(request.vip_routes.is_empty());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let (_dir, path) = write("partitions = \"all\"");
        let err = PipelineConfig::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HurricaneError>(),
            Some(HurricaneError::Parse(_))
        ));
    }
}

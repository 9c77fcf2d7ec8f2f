//! Paths of the data lake under a working directory.

use std::path::{Path, PathBuf};

const TABLE_EXT: &str = "arrow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LakeLayout {
    root: PathBuf,
    fact_table: String,
}

impl LakeLayout {
    pub fn new(root: impl Into<PathBuf>, fact_table: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            fact_table: fact_table.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fact_table(&self) -> &str {
        &self.fact_table
    }

    fn table(dir: PathBuf, name: &str) -> PathBuf {
        dir.join(format!("{name}.{TABLE_EXT}"))
    }

    pub fn bronze_dir(&self) -> PathBuf {
        self.root.join("bronze")
    }

    pub fn silver_dir(&self) -> PathBuf {
        self.root.join("silver")
    }

    pub fn gold_dir(&self) -> PathBuf {
        self.root.join("gold")
    }

    /// Normalized raw batch of one interface.
    pub fn interface(&self, name: &str) -> PathBuf {
        Self::table(self.bronze_dir(), name)
    }

    /// Committed network generation directory.
    pub fn network_dir(&self) -> PathBuf {
        self.silver_dir().join("network")
    }

    pub fn silver_historic_dir(&self) -> PathBuf {
        self.silver_dir().join("historic")
    }

    pub fn gold_historic_dir(&self) -> PathBuf {
        self.gold_dir().join("historic")
    }

    /// Raw interface files already folded into bronze.
    pub fn raw_historic_dir(&self) -> PathBuf {
        self.root.join("raw").join("historic")
    }

    /// Marker ledger of network rebuilds.
    pub fn model_historic_dates(&self) -> PathBuf {
        Self::table(self.silver_dir(), "model_historic_dates")
    }

    /// Network markers last seen by the event pipeline.
    pub fn seen_historic_dates(&self) -> PathBuf {
        Self::table(
            self.silver_dir(),
            &format!("{}_historic_dates", self.fact_table),
        )
    }

    pub fn partition(&self, digit: u8) -> PathBuf {
        Self::table(self.silver_dir(), &format!("{}_{digit}", self.fact_table))
    }

    pub fn time(&self) -> PathBuf {
        Self::table(self.silver_dir(), "time")
    }

    pub fn fact(&self) -> PathBuf {
        Self::table(self.gold_dir(), &self.fact_table)
    }

    /// JSON manifest of the last run of a fan-out stage.
    pub fn run_manifest(&self, stage: &str) -> PathBuf {
        self.root.join("runs").join(format!("{stage}_manifest.json"))
    }

    /// Text instance written by the heuristic export.
    pub fn heuristic_instance(&self, name: &str) -> PathBuf {
        self.gold_dir().join(format!("{name}.txt"))
    }
}

use hurricane_algo::MergeStats;
use hurricane_io::LakeLayout;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Merge of one partition ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionJob {
    pub job_id: String,
    pub partition: u8,
    pub ledger: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionRecord {
    pub job_id: String,
    pub partition: u8,
    pub status: String,
    pub error: Option<String>,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<MergeStats>,
}

impl PartitionRecord {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

pub fn jobs_for_partitions(layout: &LakeLayout, partitions: &[u8]) -> Vec<PartitionJob> {
    partitions
        .iter()
        .map(|&partition| PartitionJob {
            job_id: format!("merge:{partition}"),
            partition,
            ledger: layout.partition(partition),
        })
        .collect()
}

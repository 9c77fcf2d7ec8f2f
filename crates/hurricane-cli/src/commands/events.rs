use anyhow::Result;
use chrono::Local;
use hurricane_batch::{ingest_interfaces, run_merge};
use hurricane_cli::cli::EventCommands;
use hurricane_cli::config::{parse_partitions, PipelineConfig};
use hurricane_io::IpcStore;
use tracing::info;

pub fn handle(command: &EventCommands, config: &PipelineConfig) -> Result<()> {
    match command {
        EventCommands::Merge {
            skip_ingest,
            partitions,
            threads,
        } => {
            let layout = config.layout();
            let store = IpcStore::new();
            let mut merge = config.merge_config();
            if let Some(spec) = partitions {
                merge.partitions = parse_partitions(spec)?;
            }
            if let Some(threads) = threads {
                merge.threads = *threads;
            }

            if *skip_ingest {
                info!("Skipping ingestion; merging existing bronze batches");
            } else {
                let today = Local::now().date_naive();
                for report in ingest_interfaces(&layout, &store, &config.interfaces, today)? {
                    println!(
                        "Ingested {:<12}: {} row(s), {} dropped, {} duplicate(s), {} replaced; {} in bronze",
                        report.interface,
                        report.rows,
                        report.dropped,
                        report.duplicates,
                        report.replaced,
                        report.total
                    );
                }
            }

            let summary = run_merge(&layout, &store, &merge)?;
            if summary.network_changed {
                println!("Network changed since the last run; previous ledgers archived");
            }
            for job in &summary.jobs {
                match (&job.stats, &job.error) {
                    (Some(stats), _) => println!(
                        "  partition {}: {} inserted, {} unchanged",
                        job.partition, stats.inserted, stats.unchanged
                    ),
                    (None, Some(err)) => println!("  partition {}: error: {err}", job.partition),
                    (None, None) => println!("  partition {}: {}", job.partition, job.status),
                }
            }
            println!(
                "Merge finished: {} ok, {} failed, {} unpartitioned row(s); manifest {}",
                summary.success,
                summary.failure,
                summary.unpartitioned,
                summary.manifest_path.display()
            );
            if summary.failure > 0 {
                anyhow::bail!("{} partition(s) failed", summary.failure);
            }
            Ok(())
        }
    }
}

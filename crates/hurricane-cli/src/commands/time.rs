use anyhow::Result;
use hurricane_batch::allocate_time;
use hurricane_cli::cli::TimeCommands;
use hurricane_cli::config::PipelineConfig;
use hurricane_io::IpcStore;

pub fn handle(command: &TimeCommands, config: &PipelineConfig) -> Result<()> {
    match command {
        TimeCommands::Allocate => {
            let report = allocate_time(&config.layout(), &IpcStore::new(), &config.partitions)?;
            println!(
                "Time ledger: {} bucket(s), {} new",
                report.buckets, report.added
            );
            Ok(())
        }
    }
}

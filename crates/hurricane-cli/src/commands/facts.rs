use anyhow::Result;
use hurricane_batch::build_facts;
use hurricane_cli::cli::FactCommands;
use hurricane_cli::config::PipelineConfig;
use hurricane_io::IpcStore;

pub fn handle(command: &FactCommands, config: &PipelineConfig) -> Result<()> {
    match command {
        FactCommands::Build => {
            let layout = config.layout();
            let report = build_facts(
                &layout,
                &IpcStore::new(),
                &config.partitions,
                &config.feature_columns(),
                &config.categories(),
            )?;
            println!(
                "Fact table {}: {} row(s) from {} event(s)",
                layout.fact().display(),
                report.rows,
                report.events
            );
            println!("  Categories: {}", report.categories.join(", "));
            Ok(())
        }
    }
}

use std::io::{self, Write};

use anyhow::Result;
use chrono::Local;
use hurricane_batch::{load_network, rebuild_network, RebuildRequest};
use hurricane_cli::cli::NetworkCommands;
use hurricane_cli::config::PipelineConfig;
use hurricane_core::graph_utils;
use hurricane_io::IpcStore;
use tabwriter::TabWriter;
use tracing::info;

pub fn handle(command: &NetworkCommands, config: &PipelineConfig) -> Result<()> {
    let layout = config.layout();
    match command {
        NetworkCommands::Build { date } => {
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            info!("Rebuilding network for {} place(s) on {}", config.places.len(), today);
            let request = RebuildRequest {
                places: config.places.clone(),
                options: config.graph_options(),
                today,
            };
            let report = rebuild_network(
                &layout,
                &IpcStore::new(),
                &config.map(),
                &config.region_source(),
                &request,
            )?;
            println!("Network generation {}:", report.marker.label());
            print!("{}", report.stats);
            for summary in &report.associations {
                println!(
                    "  {:<13}: {} tagged, {} untagged",
                    summary.kind.as_str(),
                    summary.matched,
                    summary.unmatched
                );
            }
            if let Some(path) = &report.archived {
                println!("Previous generation archived to {}", path.display());
            }
            if report.warnings > 0 {
                println!("{} validation warning(s), see log", report.warnings);
            }
            Ok(())
        }
        NetworkCommands::Stats { islands, emit } => {
            let network = load_network(&layout)?;
            let stats = graph_utils::graph_stats(&network)?;
            println!("Graph statistics for {}:", layout.network_dir().display());
            println!("  Vertices      : {}", stats.vertex_count);
            println!("  Segments      : {}", stats.segment_count);
            println!("  Components    : {}", stats.connected_components);
            println!("  Dead ends     : {}", stats.dead_ends);
            println!(
                "  Degree [min/avg/max]: {}/{:.2}/{}",
                stats.min_degree, stats.avg_degree, stats.max_degree
            );
            if *islands {
                let analysis = graph_utils::find_islands(&network)?;
                let mut writer = TabWriter::new(io::stdout());
                writeln!(writer, "ISLAND\tVERTICES")?;
                for summary in &analysis.islands {
                    writeln!(writer, "{}\t{}", summary.island_id, summary.vertex_count)?;
                }
                writer.flush()?;
                if *emit {
                    println!("\nVertex → Island assignments:");
                    for assignment in &analysis.assignments {
                        println!(
                            "  vertex {:>8} -> island {}",
                            assignment.vertex_id.value(),
                            assignment.island_id
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

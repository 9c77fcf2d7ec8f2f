use anyhow::{Context, Result};
use hurricane_batch::export_heuristic;
use hurricane_cli::cli::{parse_list, HeuristicCommands};
use hurricane_cli::config::PipelineConfig;
use hurricane_core::{HurricaneError, RegionId};
use hurricane_io::IpcStore;

pub fn handle(command: &HeuristicCommands, config: &PipelineConfig) -> Result<()> {
    match command {
        HeuristicCommands::Export {
            name,
            zones,
            margin_km,
        } => {
            let mut request = config.heuristic.clone().ok_or_else(|| {
                HurricaneError::Validation("no [heuristic] section in the configuration".into())
            })?;
            if let Some(spec) = zones {
                let ids: Vec<i64> =
                    parse_list(spec).with_context(|| format!("parsing zones '{spec}'"))?;
                request.zones = ids.into_iter().map(RegionId::new).collect();
            }
            if let Some(margin) = margin_km {
                request.margin_km = *margin;
            }
            let path = export_heuristic(
                &config.layout(),
                &IpcStore::new(),
                &config.region_source(),
                &request,
                name,
            )?;
            println!("Heuristic instance written to {}", path.display());
            Ok(())
        }
    }
}

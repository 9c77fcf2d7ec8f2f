use anyhow::Result;
use clap::Parser;
use hurricane_cli::cli::{Cli, Commands};
use hurricane_cli::config::PipelineConfig;
use hurricane_core::HurricaneError;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

use crate::commands::{events, facts, heuristic, network, time};

fn run(cli: &Cli) -> Result<()> {
    let Some(command) = &cli.command else {
        info!("nothing to do; see --help");
        return Ok(());
    };
    let config = PipelineConfig::load(&cli.config)?;
    info!(
        config = %cli.config.display(),
        workdir = %config.workdir.display(),
        "configuration loaded"
    );
    match command {
        Commands::Network { command } => network::handle(command, &config),
        Commands::Events { command } => events::handle(command, &config),
        Commands::Time { command } => time::handle(command, &config),
        Commands::Facts { command } => facts::handle(command, &config),
        Commands::Heuristic { command } => heuristic::handle(command, &config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<HurricaneError>() {
            Some(HurricaneError::Conflict(msg)) => {
                error!("Rebuild refused: {msg}");
                ExitCode::from(2)
            }
            _ => {
                error!("Command failed: {:?}", e);
                ExitCode::FAILURE
            }
        },
    }
}

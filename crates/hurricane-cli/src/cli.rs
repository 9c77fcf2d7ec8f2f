use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Pipeline configuration file (TOML)
    #[arg(long, short, default_value = "hurricane.toml", value_hint = ValueHint::FilePath)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Street network generations
    Network {
        #[command(subcommand)]
        command: NetworkCommands,
    },
    /// Event ingestion and partition merge
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Time bucket ledger
    Time {
        #[command(subcommand)]
        command: TimeCommands,
    },
    /// Fact table
    Facts {
        #[command(subcommand)]
        command: FactCommands,
    },
    /// Heuristic instance export
    Heuristic {
        #[command(subcommand)]
        command: HeuristicCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum NetworkCommands {
    /// Rebuild the network for the configured places and commit a new generation
    Build {
        /// Date the rebuild is recorded under (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Graph stats summary of the committed generation
    Stats {
        /// List the connected components too
        #[arg(long)]
        islands: bool,
        /// Print every vertex with its island id
        #[arg(long, requires = "islands")]
        emit: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Ingest the raw interfaces and merge them into the partition ledgers
    Merge {
        /// Reuse the bronze batches already in the lake
        #[arg(long)]
        skip_ingest: bool,
        /// Comma-separated partition digits (overrides the config)
        #[arg(long)]
        partitions: Option<String>,
        /// Worker threads, 0 for every core (overrides the config)
        #[arg(long)]
        threads: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TimeCommands {
    /// Assign ids to the time buckets seen in the partition ledgers
    Allocate,
}

#[derive(Subcommand, Debug)]
pub enum FactCommands {
    /// Recount events per time bucket and segment
    Build,
}

#[derive(Subcommand, Debug)]
pub enum HeuristicCommands {
    /// Write a heuristic instance for a zone selection
    Export {
        /// Instance name; the file is written to gold/<name>.txt
        #[arg(long)]
        name: String,
        /// Comma-separated zone ids (overrides the config)
        #[arg(long)]
        zones: Option<String>,
        /// Margin around the zones in km (overrides the config)
        #[arg(long)]
        margin_km: Option<f64>,
    },
}

/// Parse a comma-separated list, skipping blanks.
pub fn parse_list<T: std::str::FromStr>(spec: &str) -> Result<Vec<T>, T::Err> {
    spec.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

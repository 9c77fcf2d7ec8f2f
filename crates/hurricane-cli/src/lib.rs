pub mod cli;
pub mod config;

pub use cli::{
    Cli, Commands, EventCommands, FactCommands, HeuristicCommands, NetworkCommands, TimeCommands,
};
pub use config::{PipelineConfig, RegionFiles};

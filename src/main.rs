//! Strata - storage node CLI entrypoint.
//!
//! Usage:
//!   strata start --config config/strata.toml
//!   strata config validate --config config/strata.toml
//!   strata config show --format json

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use strata::cli::commands::{run_config, run_start};
use strata::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Determine config path - use global --config or default
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/strata.toml"));

    match cli.command {
        Commands::Start(_args) => run_start(&config_path, cli.log_level.as_deref()).await,
        Commands::Config(args) => run_config(args),
    }
}

//! Start command implementation.

use crate::core::config::Config;
use crate::core::runtime::Runtime;
use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

/// Start a storage node.
#[derive(Args, Debug)]
pub struct StartArgs {
    // No additional arguments - config is handled globally
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Run the start command with the given config path. A log level given on
/// the command line wins over the configured one; RUST_LOG wins over both.
pub async fn run_start(config_path: &Path, log_level: Option<&str>) -> Result<()> {
    let config = Config::from_file(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    init_tracing(log_level.unwrap_or(&config.telemetry.log_level));

    let mut runtime = Runtime::new(config)?;
    runtime.run().await
}

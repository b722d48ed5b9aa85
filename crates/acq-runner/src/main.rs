//! Acquisition Runner - Main Entry Point
//!
//! Usage: `acq-runner <config.toml>`

use std::path::PathBuf;

use acq_runner::{init_logging, open_source, run, RunnerConfig};
use anyhow::Context;
use tracing::info;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: acq-runner <config file>")?;

    let config = RunnerConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    init_logging(&config.log_level, config.log_format)?;

    info!("=== Acquisition Runner v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Transport: {:?} {}:{}",
        config.transport.mode, config.transport.address, config.transport.port
    );

    let source = open_source(&config.transport).context("opening packet source")?;
    let stats = run(&config, source)?;

    info!("Final statistics: {}", serde_json::to_string(&stats)?);
    Ok(())
}

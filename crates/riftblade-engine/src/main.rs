//! # Riftblade
//!
//! Runs one scripted encounter against the bundled actor content and prints
//! (or writes) the encounter report.
//!
//! Usage: `riftblade [config.toml]`

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::Result;
use riftblade_engine::app;
use riftblade_engine::config::EngineConfig;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    let mut config = match std::env::args_os().nth(1) {
        Some(path) => EngineConfig::load_from(path),
        None => EngineConfig::load(),
    };
    config.validate();

    // RUST_LOG wins over the config directive
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))?;
    let fmt_layer = if config.log_json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer().with_writer(std::io::stderr).boxed()
    };
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    config.check_version()?;

    info!("Riftblade starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let report = app::run(config)?;

    info!(outcome = ?report.outcome, "Riftblade shutdown complete");
    Ok(())
}

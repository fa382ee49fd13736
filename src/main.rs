//! Candle trader CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use trading_config::{load_config, load_from_env, AppConfig};
use trading_monitor::setup_logging;

const DEFAULT_CONFIG: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref())?;

    // Setup logging
    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.is_json();
    let log_file = config.logging.file.as_ref().map(PathBuf::from);
    let _guard = setup_logging(&level, json, log_file.as_deref()).context("failed to initialise logging")?;

    // Execute command
    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, config).await,
        Commands::Sweep(args) => cli::commands::backtest::sweep(args, config).await,
        Commands::Paper(args) => cli::commands::paper::run(args, config).await,
        Commands::Strategies => cli::commands::strategies::run().await,
        Commands::Indicators => cli::commands::indicators::run().await,
        Commands::ValidateConfig => cli::commands::validate::run(&config).await,
    }
}

/// An explicit path must exist; otherwise the default file is used when
/// present, and plain defaults plus environment overrides when not.
fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config(path).with_context(|| format!("failed to load configuration from {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            load_config(Path::new(DEFAULT_CONFIG)).context("failed to load config/default.toml")
        }
        None => load_from_env().context("failed to read configuration from environment"),
    }
}

//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, BacktestSettings, FeedSettings, LiveSettings, LoggingConfig,
    MarketSettings, StorageSettings, StrategySettings, SweepRun,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
///
/// The file format follows the extension (TOML, YAML, JSON). Variables like
/// `TRADING__PORTFOLIO__RISK_PCT=2` override file values.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(environment())
        .build()?;

    config.try_deserialize()
}

/// Defaults overlaid with `TRADING__*` environment variables only.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(environment())
        .build()?
        .try_deserialize()
}

fn environment() -> Environment {
    Environment::with_prefix("TRADING")
        .separator("__")
        .try_parsing(true)
}

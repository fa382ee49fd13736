//! Validate configuration command.

use anyhow::{Context, Result};
use trading_config::AppConfig;

pub async fn run(config: &AppConfig) -> Result<()> {
    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid!");
            println!();
            let indicators = config.indicator_configs()?;
            println!("Strategy: {}", config.strategy.name);
            println!("Market: {} {}", config.market.symbol, config.market.timeframe);
            println!("Indicators: {}", indicators.len());
            println!();
            let effective = toml::to_string_pretty(config).context("failed to render configuration")?;
            println!("{}", effective);
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

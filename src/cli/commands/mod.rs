//! CLI command implementations.

pub mod backtest;
pub mod indicators;
pub mod paper;
pub mod strategies;
pub mod validate;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use trading_config::AppConfig;
use trading_engine::RunReport;
use trading_indicators::IndicatorPipeline;

use crate::cli::{OutputFormat, RunArgs};

/// Fold command-line overrides into the loaded configuration and validate it.
fn apply_overrides(config: &mut AppConfig, args: &RunArgs) -> Result<()> {
    if let Some(symbol) = &args.symbol {
        config.market.symbol = symbol.clone();
    }
    if let Some(timeframe) = args.timeframe {
        config.market.timeframe = timeframe;
    }
    apply_strategy_overrides(config, args.strategy.as_ref(), args.params.as_deref(), args.capital)
}

/// Strategy, parameter and capital overrides, then validation.
fn apply_strategy_overrides(
    config: &mut AppConfig,
    strategy: Option<&String>,
    params: Option<&str>,
    capital: Option<Decimal>,
) -> Result<()> {
    if let Some(strategy) = strategy {
        if *strategy != config.strategy.name {
            config.strategy.params = serde_json::Value::Null;
        }
        config.strategy.name = strategy.clone();
    }
    if let Some(params) = params {
        config.strategy.params = serde_json::from_str(params).context("--params is not valid JSON")?;
    }
    if let Some(capital) = capital {
        config.portfolio.initial_capital = capital;
    }
    config.validate().context("invalid configuration")?;
    Ok(())
}

fn build_pipeline(config: &AppConfig) -> Result<IndicatorPipeline> {
    let indicators = config.indicator_configs()?;
    IndicatorPipeline::new(&indicators).context("failed to build indicator pipeline")
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary_text()),
    }
    Ok(())
}

//! Backtest command implementation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use trading_config::{AppConfig, SweepRun};
use trading_core::error::DataError;
use trading_core::types::{Candle, EnrichedWindow};
use trading_data::{load_csv, parse_timestamp, DataKind, FileStore, HistoricalFeed, RunMode};
use trading_engine::{ExecutionLoop, RunReport};
use trading_strategies::StrategyRegistry;

use super::{apply_overrides, apply_strategy_overrides, build_pipeline, print_report};
use crate::cli::{BacktestArgs, OutputFormat, SweepArgs};

pub async fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    apply_overrides(&mut config, &args.run)?;
    let start = args.start.as_deref().map(parse_bound).transpose()?;
    let end = args.end.as_deref().map(parse_bound).transpose()?;

    let data = &args.run.data;
    if !data.exists() {
        anyhow::bail!("Data file '{}' does not exist", data.display());
    }
    let candles = load_csv(data, start, end)
        .with_context(|| format!("failed to load candles from {}", data.display()))?;
    info!(
        candles = candles.len(),
        strategy = %config.strategy.name,
        symbol = %config.market.symbol,
        timeframe = %config.market.timeframe,
        "starting backtest"
    );

    let (report, processed) = backtest(&config, candles).await?;
    print_report(&report, args.run.output)?;

    if args.run.save {
        let store = FileStore::new(
            &config.storage.base_dir,
            RunMode::Backtest,
            &config.market.symbol,
            config.market.timeframe,
            &config.strategy.name,
        );
        save(&store, &report, &processed)?;
    }
    Ok(())
}

/// Run every configured symbol × timeframe × period and save each result.
pub async fn sweep(args: SweepArgs, mut config: AppConfig) -> Result<()> {
    apply_strategy_overrides(&mut config, args.strategy.as_ref(), args.params.as_deref(), args.capital)?;
    if let Some(dir) = &args.data_dir {
        config.backtest.data_dir = dir.display().to_string();
    }

    let runs = config.backtest.runs()?;
    if runs.is_empty() {
        anyhow::bail!("backtest sweep is empty; set backtest.symbols, backtest.timeframes and backtest.periods");
    }
    info!(runs = runs.len(), strategy = %config.strategy.name, "starting backtest sweep");

    let mut completed = 0usize;
    for sweep_run in &runs {
        let path = config.backtest.data_file(&sweep_run.symbol, sweep_run.timeframe);
        let candles = match load_csv(&path, Some(sweep_run.start), Some(sweep_run.end)) {
            Ok(candles) => candles,
            Err(DataError::NoDataAvailable) => {
                warn!(path = %path.display(), period = %sweep_run.period, "no candles in period; skipped");
                continue;
            }
            Err(DataError::Io(err)) => {
                warn!(path = %path.display(), error = %err, "candle file unreadable; skipped");
                continue;
            }
            Err(err) => {
                return Err(anyhow::Error::new(err).context(format!("failed to load candles from {}", path.display())))
            }
        };

        let mut run_config = config.clone();
        run_config.market.symbol = sweep_run.symbol.clone();
        run_config.market.timeframe = sweep_run.timeframe;
        info!(
            symbol = %sweep_run.symbol,
            timeframe = %sweep_run.timeframe,
            period = %sweep_run.period,
            candles = candles.len(),
            "sweep run"
        );

        let (report, processed) = backtest(&run_config, candles).await?;
        if matches!(args.output, OutputFormat::Text) {
            println!("--- {} {} {} ---", sweep_run.symbol, sweep_run.timeframe, sweep_run.period);
        }
        print_report(&report, args.output)?;
        save(&sweep_store(&run_config, sweep_run), &report, &processed)?;
        completed += 1;
    }

    info!(completed, skipped = runs.len() - completed, "backtest sweep finished");
    Ok(())
}

/// Store of one sweep run, labelled by strategy and period.
fn sweep_store(config: &AppConfig, run: &SweepRun) -> FileStore {
    FileStore::new(
        &config.storage.base_dir,
        RunMode::Backtest,
        &run.symbol,
        run.timeframe,
        &format!("{}_{}", config.strategy.name, run.period),
    )
}

/// One backtest; returns the report and the processed table of the whole run.
async fn backtest(config: &AppConfig, candles: Vec<Candle>) -> Result<(RunReport, EnrichedWindow)> {
    let pipeline = build_pipeline(config)?;
    let strategy = StrategyRegistry::new()
        .create(&config.strategy.name, config.strategy.params.clone())
        .context("failed to create strategy")?;

    let mut feed = HistoricalFeed::new(candles, pipeline, config.feed.window_capacity)
        .with_warmup(config.feed.warmup_candles);
    let mut engine = ExecutionLoop::new(&config.portfolio, strategy, &config.execution);
    let report = engine.run(&mut feed).await?;
    Ok((report, feed.processed_table()))
}

fn parse_bound(value: &str) -> Result<DateTime<Utc>> {
    let millis = parse_timestamp(value)?;
    DateTime::from_timestamp_millis(millis).with_context(|| format!("date out of range: {}", value))
}

fn save(store: &FileStore, report: &RunReport, processed: &EnrichedWindow) -> Result<()> {
    store.save_table(DataKind::Result, &report.trades)?;
    store.save_document(DataKind::Summary, report)?;
    store.save_enriched(processed)?;
    info!(path = %store.path(DataKind::Summary).display(), "results saved");
    Ok(())
}

//! Paper trading command implementation.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use trading_broker::PaperVenue;
use trading_config::AppConfig;
use trading_core::traits::{CandleLog, MemoryCandleLog, Venue};
use trading_data::{load_csv, FileStore, LiveFeed, LiveFeedConfig, RunMode};
use trading_engine::{ExecutionLoop, LiveRunner, LiveRunnerConfig, OrderRouter};
use trading_strategies::StrategyRegistry;

use super::{apply_overrides, build_pipeline, print_report};
use crate::cli::PaperArgs;

pub async fn run(args: PaperArgs, mut config: AppConfig) -> Result<()> {
    apply_overrides(&mut config, &args.run)?;

    let data = &args.run.data;
    let candles = load_csv(data, None, None)
        .with_context(|| format!("failed to load candles from {}", data.display()))?;
    let history = args.history.unwrap_or(config.live.history_limit).min(candles.len());

    let mut paper = PaperVenue::new(candles, config.portfolio.initial_capital)
        .with_history(history)
        .with_slippage(args.slippage)
        .with_funds_check(args.funds_check);
    if args.delay_ms > 0 {
        paper = paper.with_replay_delay(Duration::from_millis(args.delay_ms));
    }
    let venue: Arc<dyn Venue> = Arc::new(paper);
    let balance = venue.fetch_balance(&config.live.capital_asset).await?;
    info!(
        venue = venue.name(),
        asset = %config.live.capital_asset,
        %balance,
        history,
        "paper venue ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let store = args.run.save.then(|| {
        FileStore::new(
            &config.storage.base_dir,
            RunMode::Paper,
            &config.market.symbol,
            config.market.timeframe,
            &config.strategy.name,
        )
    });
    let log: Box<dyn CandleLog> = match &store {
        Some(store) => Box::new(store.raw_log()),
        None => Box::new(MemoryCandleLog::default()),
    };

    let feed = LiveFeed::connect(
        Arc::clone(&venue),
        LiveFeedConfig {
            symbol: config.market.symbol.clone(),
            timeframe: config.market.timeframe,
            window_capacity: config.feed.window_capacity,
            history_limit: history,
        },
        build_pipeline(&config)?,
        log,
        shutdown_rx.clone(),
    )
    .await
    .context("failed to start candle feed")?;

    let strategy = StrategyRegistry::new()
        .create(&config.strategy.name, config.strategy.params.clone())
        .context("failed to create strategy")?;
    let engine = ExecutionLoop::new(&config.portfolio, strategy, &config.execution)
        .with_router(OrderRouter::new(venue, config.market.symbol.clone()));

    let mut runner = LiveRunner::new(
        feed,
        engine,
        shutdown_rx,
        LiveRunnerConfig {
            retry_delay: config.live.retry_delay(),
        },
    );
    if let Some(store) = store {
        runner = runner.with_store(store);
    }

    let report = runner.run().await?;
    print_report(&report, args.run.output)
}

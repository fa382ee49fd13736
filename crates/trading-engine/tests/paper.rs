//! Paper trading end to end: paper venue, live feed, routed execution.

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use trading_broker::PaperVenue;
use trading_core::traits::{MemoryCandleLog, Venue};
use trading_core::types::{Candle, Timeframe};
use trading_data::{HistoricalFeed, LiveFeed, LiveFeedConfig};
use trading_engine::{ExecutionConfig, ExecutionLoop, LiveRunner, LiveRunnerConfig, OrderRouter, RunReport};
use trading_indicators::IndicatorPipeline;
use trading_risk::{ExitReason, PortfolioConfig};
use trading_strategies::StrategyRegistry;

fn wave_candles(n: usize) -> Vec<Candle> {
    let mut price: f64 = 100.0;
    (0..n)
        .map(|i| {
            let drift = if (i / 25) % 2 == 0 { 1.3 } else { -1.2 };
            let open = price;
            let close = (price + drift).max(5.0);
            price = close;
            Candle::new(i as i64 * 60_000, open, open.max(close) + 0.6, open.min(close) - 0.6, close, 10.0)
        })
        .collect()
}

const HISTORY: usize = 40;

/// Paper run funded with exactly the portfolio's starting capital.
async fn paper_run(candles: Vec<Candle>) -> (RunReport, Arc<PaperVenue>) {
    let capital = PortfolioConfig::default().initial_capital;
    let venue = Arc::new(
        PaperVenue::new(candles, capital)
            .with_history(HISTORY)
            .with_partial_updates(true),
    );

    let registry = StrategyRegistry::new();
    let pipeline = IndicatorPipeline::new(&registry.get("supertrend_ma").unwrap().indicators).unwrap();
    let (_tx, rx) = watch::channel(false);
    let shared: Arc<dyn Venue> = venue.clone();

    let feed = LiveFeed::connect(
        shared.clone(),
        LiveFeedConfig {
            symbol: "BTC/USDT".into(),
            timeframe: Timeframe::Minute1,
            window_capacity: 500,
            history_limit: HISTORY,
        },
        pipeline,
        Box::new(MemoryCandleLog::default()),
        rx.clone(),
    )
    .await
    .unwrap();

    let engine = ExecutionLoop::new(
        &PortfolioConfig::default(),
        registry.create_default("supertrend_ma").unwrap(),
        &ExecutionConfig::default(),
    )
    .with_router(OrderRouter::new(shared, "BTC/USDT"));

    let runner = LiveRunner::new(
        feed,
        engine,
        rx,
        LiveRunnerConfig {
            retry_delay: Duration::from_millis(1),
        },
    );
    (runner.run().await.unwrap(), venue)
}

/// The same table as a backtest whose window starts with the paper history.
async fn backtest_run(candles: Vec<Candle>) -> RunReport {
    let registry = StrategyRegistry::new();
    let pipeline = IndicatorPipeline::new(&registry.get("supertrend_ma").unwrap().indicators).unwrap();
    let mut feed = HistoricalFeed::new(candles, pipeline, 500).with_warmup(HISTORY);
    let mut engine = ExecutionLoop::new(
        &PortfolioConfig::default(),
        registry.create_default("supertrend_ma").unwrap(),
        &ExecutionConfig::default(),
    );
    engine.run(&mut feed).await.unwrap()
}

#[tokio::test]
async fn paper_run_routes_every_open_and_close() {
    let (report, venue) = paper_run(wave_candles(200)).await;

    // Only streamed candles are evaluated
    assert_eq!(report.ticks, 160);
    assert!(!report.trades.is_empty());
    assert_eq!(venue.orders().len(), 2 * report.trades.len());
    assert_eq!(venue.remaining(), 0);

    let net: rust_decimal::Decimal = report.trades.iter().map(|t| t.net_profit_loss).sum();
    assert_eq!(report.summary.final_capital, report.summary.initial_capital + net);
    if let Some(last) = report.trades.last() {
        assert!(last.exit_step <= 199);
        if last.exit_reason == ExitReason::EndOfData {
            assert_eq!(last.exit_step, 199);
        }
    }
}

#[tokio::test]
async fn paper_ledger_matches_backtest_at_default_capital() {
    let candles = wave_candles(200);
    let (paper, venue) = paper_run(candles.clone()).await;
    let backtest = backtest_run(candles.clone()).await;

    assert!(!backtest.trades.is_empty());
    assert_eq!(paper.ticks, backtest.ticks);
    assert_eq!(paper.trades.len(), backtest.trades.len());
    for (p, b) in paper.trades.iter().zip(&backtest.trades) {
        assert_eq!(p.side, b.side);
        assert_eq!((p.entry_step, p.exit_step), (b.entry_step, b.exit_step));
        assert_eq!((p.entry_price, p.exit_price), (b.entry_price, b.exit_price));
        assert_eq!(p.quantity, b.quantity);
        assert_eq!(p.exit_reason, b.exit_reason);
    }
    assert_eq!(paper.summary.final_capital, backtest.summary.final_capital);

    // Every venue fill happened at the close of the candle the engine acted on
    let acks = venue.orders();
    for (trade, pair) in paper.trades.iter().zip(acks.chunks(2)) {
        let entry_close = rust_decimal::Decimal::try_from(candles[trade.entry_step].close).unwrap();
        assert_eq!(pair[0].fill_price, Some(entry_close));
        assert_eq!(pair[0].quantity, trade.quantity);
    }
}

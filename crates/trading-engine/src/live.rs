//! Long-running harness for live and paper feeds.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use trading_core::error::TradingResult;
use trading_core::traits::{CandleFeed, FeedPoll};
use trading_data::{DataKind, FileStore};

use crate::{ExecutionLoop, RunReport};

/// Live harness settings.
#[derive(Debug, Clone)]
pub struct LiveRunnerConfig {
    /// Pause before retrying after a venue or data failure
    pub retry_delay: Duration,
}

impl Default for LiveRunnerConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(10),
        }
    }
}

/// Drives an [`ExecutionLoop`] from a feed that may stall or fail.
///
/// Transient feed and venue errors are retried indefinitely, including a
/// failed end-of-run liquidation; strategy, configuration and order
/// rejection errors end the run. Each accepted candle overwrites the
/// processed table when a store is attached.
pub struct LiveRunner<F: CandleFeed> {
    feed: F,
    engine: ExecutionLoop,
    store: Option<FileStore>,
    shutdown: watch::Receiver<bool>,
    config: LiveRunnerConfig,
}

impl<F: CandleFeed> LiveRunner<F> {
    pub fn new(
        feed: F,
        engine: ExecutionLoop,
        shutdown: watch::Receiver<bool>,
        config: LiveRunnerConfig,
    ) -> Self {
        Self {
            feed,
            engine,
            store: None,
            shutdown,
            config,
        }
    }

    /// Persist processed windows, trades and the summary.
    pub fn with_store(mut self, store: FileStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn engine(&self) -> &ExecutionLoop {
        &self.engine
    }

    pub async fn run(mut self) -> TradingResult<RunReport> {
        info!(strategy = self.engine.strategy().name(), "live run started");
        loop {
            match self.feed.advance().await {
                Ok(FeedPoll::Ready(_)) => {
                    self.engine.on_candle(&self.feed).await?;
                    self.persist_window();
                }
                Ok(FeedPoll::Pending) => continue,
                Ok(FeedPoll::Exhausted) => break,
                Err(err) if err.is_transient() => {
                    warn!(error = %err, delay = ?self.config.retry_delay, "feed error; retrying");
                    if self.wait_or_shutdown().await {
                        break;
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.liquidate().await?;
        let report = self.engine.report();
        self.persist_results(&report);
        info!(
            trades = report.stats.total_trades,
            net_profit = %report.stats.net_profit,
            "live run finished"
        );
        Ok(report)
    }

    /// Close what is still open, retrying transient venue failures.
    async fn liquidate(&mut self) -> TradingResult<()> {
        loop {
            match self.engine.liquidate(&self.feed).await {
                Ok(_) => return Ok(()),
                Err(err) if err.is_transient() => {
                    warn!(error = %err, delay = ?self.config.retry_delay, "liquidation failed; retrying");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Sleep for the retry delay; `true` if shutdown was requested meanwhile.
    async fn wait_or_shutdown(&mut self) -> bool {
        if *self.shutdown.borrow() {
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.config.retry_delay) => false,
            changed = self.shutdown.changed() => changed.is_err() || *self.shutdown.borrow(),
        }
    }

    fn persist_window(&self) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save_enriched(self.feed.window()) {
                warn!(error = %err, "failed to save processed table");
            }
        }
    }

    fn persist_results(&self, report: &RunReport) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(err) = store.save_table(DataKind::Result, &report.trades) {
            warn!(error = %err, "failed to save trade table");
        }
        if let Err(err) = store.save_document(DataKind::Summary, report) {
            warn!(error = %err, "failed to save summary");
        }
    }
}

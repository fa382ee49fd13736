//! Streaming feed over a venue candle subscription.

use async_trait::async_trait;
use futures::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use trading_core::error::DataError;
use trading_core::traits::{CandleFeed, CandleLog, CandleStream, FeedPoll, MarketView, Venue};
use trading_core::types::{CandleWindow, EnrichedWindow, Timeframe};
use trading_indicators::IndicatorPipeline;

/// Settings for a live feed.
#[derive(Debug, Clone)]
pub struct LiveFeedConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub window_capacity: usize,
    /// Closed candles fetched to seed the window
    pub history_limit: usize,
}

/// Feed driven by a venue subscription.
///
/// Only closed candles with a timestamp later than the last accepted one
/// enter the window; everything else is reported as [`FeedPoll::Pending`].
/// Each accepted candle is appended to the raw log before the window
/// changes. A shutdown signal ends the feed at the next `advance`.
pub struct LiveFeed {
    venue: Arc<dyn Venue>,
    config: LiveFeedConfig,
    pipeline: IndicatorPipeline,
    window: CandleWindow,
    enriched: EnrichedWindow,
    log: Box<dyn CandleLog>,
    // Boxed streams are Send but not Sync; the mutex keeps the feed shareable
    stream: Mutex<Option<CandleStream>>,
    shutdown: watch::Receiver<bool>,
    last_timestamp: Option<i64>,
    step: Option<usize>,
    finished: bool,
}

impl LiveFeed {
    /// Seed the window from recent history and return a ready feed.
    pub async fn connect(
        venue: Arc<dyn Venue>,
        config: LiveFeedConfig,
        pipeline: IndicatorPipeline,
        mut log: Box<dyn CandleLog>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, DataError> {
        info!(
            venue = venue.name(),
            symbol = %config.symbol,
            timeframe = %config.timeframe,
            limit = config.history_limit,
            "fetching initial candles"
        );
        let mut history = venue
            .fetch_recent_candles(&config.symbol, config.timeframe, config.history_limit)
            .await?;
        history.sort_by_key(|c| c.timestamp);
        history.dedup_by_key(|c| c.timestamp);

        let mut window = CandleWindow::with_capacity(config.window_capacity);
        for candle in &history {
            log.append(candle)?;
            window.push(*candle);
        }
        let enriched = pipeline.process(window.as_slice());
        info!(candles = history.len(), "live window seeded");

        Ok(Self {
            venue,
            last_timestamp: history.last().map(|c| c.timestamp),
            step: history.len().checked_sub(1),
            config,
            pipeline,
            window,
            enriched,
            log,
            stream: Mutex::new(None),
            shutdown,
            finished: false,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.config.timeframe
    }

    fn finish(&mut self, why: &str) -> FeedPoll {
        if !self.finished {
            info!(reason = why, "live feed finished");
        }
        self.finished = true;
        *self.stream_slot() = None;
        FeedPoll::Exhausted
    }

    fn stream_slot(&mut self) -> &mut Option<CandleStream> {
        self.stream.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MarketView for LiveFeed {
    fn window(&self) -> &EnrichedWindow {
        &self.enriched
    }
}

#[async_trait]
impl CandleFeed for LiveFeed {
    async fn advance(&mut self) -> Result<FeedPoll, DataError> {
        if self.finished || *self.shutdown.borrow() {
            return Ok(self.finish("shutdown"));
        }

        if self.stream_slot().is_none() {
            debug!(symbol = %self.config.symbol, "subscribing to candles");
            let stream = self
                .venue
                .subscribe_candles(&self.config.symbol, self.config.timeframe)
                .await?;
            *self.stream_slot() = Some(stream);
        }
        let slot = self.stream.get_mut().unwrap_or_else(PoisonError::into_inner);
        let Some(stream) = slot.as_mut() else {
            return Ok(FeedPoll::Pending);
        };

        let woke = tokio::select! {
            biased;
            changed = self.shutdown.changed() => Err(changed.is_err()),
            update = stream.next() => Ok(update),
        };
        let update = match woke {
            // A dropped sender also ends the feed
            Err(dropped) if dropped || *self.shutdown.borrow() => return Ok(self.finish("shutdown")),
            Err(_) => return Ok(FeedPoll::Pending),
            Ok(update) => update,
        };

        let streamed = match update {
            None => return Ok(self.finish("stream ended")),
            Some(Err(err)) => {
                warn!(error = %err, "candle stream failed; will resubscribe");
                *self.stream_slot() = None;
                return Err(err.into());
            }
            Some(Ok(streamed)) => streamed,
        };

        if !streamed.closed {
            return Ok(FeedPoll::Pending);
        }
        let candle = streamed.candle;
        if self.last_timestamp.is_some_and(|last| candle.timestamp <= last) {
            debug!(timestamp = candle.timestamp, "ignoring stale candle");
            return Ok(FeedPoll::Pending);
        }

        // Durable before visible
        self.log.append(&candle)?;

        self.window.push(candle);
        self.enriched = self.pipeline.process(self.window.as_slice());
        self.last_timestamp = Some(candle.timestamp);
        self.step = Some(self.step.map_or(0, |s| s + 1));
        debug!(datetime = %candle.datetime(), close = candle.close, "candle accepted");

        match self.enriched.last() {
            Some(current) => Ok(FeedPoll::Ready(current.clone())),
            None => Err(DataError::Internal("window empty after push".to_string())),
        }
    }

    fn has_more(&self) -> bool {
        !self.finished
    }

    fn step_index(&self) -> Option<usize> {
        self.step
    }
}

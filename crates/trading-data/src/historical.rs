//! Replay of a complete candle table.

use async_trait::async_trait;
use tracing::{debug, warn};
use trading_core::error::DataError;
use trading_core::traits::{CandleFeed, FeedPoll, MarketView};
use trading_core::types::{Candle, CandleWindow, EnrichedWindow};
use trading_indicators::IndicatorPipeline;

/// Feed over a pre-loaded candle table.
///
/// Never returns [`FeedPoll::Pending`]; the same table always produces the
/// same sequence of enriched windows.
pub struct HistoricalFeed {
    candles: Vec<Candle>,
    cursor: usize,
    window: CandleWindow,
    enriched: EnrichedWindow,
    pipeline: IndicatorPipeline,
}

impl HistoricalFeed {
    /// Sort the table by timestamp and drop duplicate timestamps.
    pub fn new(mut candles: Vec<Candle>, pipeline: IndicatorPipeline, capacity: usize) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        let before = candles.len();
        candles.dedup_by_key(|c| c.timestamp);
        if candles.len() != before {
            warn!(dropped = before - candles.len(), "dropped candles with duplicate timestamps");
        }

        let malformed = candles.iter().filter(|c| !c.is_well_formed()).count();
        if malformed > 0 {
            warn!(malformed, "candles with inconsistent OHLC values");
        }

        Self {
            candles,
            cursor: 0,
            window: CandleWindow::with_capacity(capacity),
            enriched: EnrichedWindow::default(),
            pipeline,
        }
    }

    /// Preload up to `count` of the earliest candles into the window before
    /// the first `advance`, so the window starts in the shape a live feed
    /// has after fetching history. Preloaded candles are never ticked.
    pub fn with_warmup(mut self, count: usize) -> Self {
        let count = count.min(self.window.capacity()).min(self.candles.len());
        if count > 0 {
            self.window.extend(self.candles[..count].iter().copied());
            self.cursor = count;
            self.refresh();
            debug!(count, "preloaded warm-up candles");
        }
        self
    }

    /// Total candles in the table.
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Candles not yet delivered.
    pub fn remaining(&self) -> usize {
        self.candles.len() - self.cursor
    }

    /// Indicators over the whole table rather than the rolling window.
    ///
    /// Rows inside the window's reach match what the strategy saw; past the
    /// window capacity, warm-up sensitive indicators can differ slightly.
    pub fn processed_table(&self) -> EnrichedWindow {
        self.pipeline.process(&self.candles)
    }

    fn refresh(&mut self) {
        self.enriched = self.pipeline.process(self.window.as_slice());
    }
}

impl MarketView for HistoricalFeed {
    fn window(&self) -> &EnrichedWindow {
        &self.enriched
    }
}

#[async_trait]
impl CandleFeed for HistoricalFeed {
    async fn advance(&mut self) -> Result<FeedPoll, DataError> {
        let Some(candle) = self.candles.get(self.cursor).copied() else {
            return Ok(FeedPoll::Exhausted);
        };
        self.cursor += 1;
        self.window.push(candle);
        self.refresh();

        match self.enriched.last() {
            Some(current) => Ok(FeedPoll::Ready(current.clone())),
            None => Err(DataError::Internal("window empty after push".to_string())),
        }
    }

    fn has_more(&self) -> bool {
        self.cursor < self.candles.len()
    }

    fn step_index(&self) -> Option<usize> {
        self.cursor.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_indicators::IndicatorConfig;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Candle::new(i as i64 * 60_000, c, c + 1.0, c - 1.0, c, 1.0)
            })
            .collect()
    }

    fn pipeline() -> IndicatorPipeline {
        IndicatorPipeline::new(&[IndicatorConfig::new("ema").with("period", 3)]).unwrap()
    }

    #[tokio::test]
    async fn test_sequential_delivery_and_exhaustion() {
        let mut feed = HistoricalFeed::new(candles(3), pipeline(), 500);
        assert!(feed.current().is_none());
        assert_eq!(feed.step_index(), None);

        for expected in 0..3 {
            let poll = feed.advance().await.unwrap();
            let FeedPoll::Ready(current) = poll else {
                panic!("expected ready, got {:?}", poll);
            };
            assert_eq!(current.timestamp(), expected as i64 * 60_000);
            assert_eq!(feed.step_index(), Some(expected));
            assert_eq!(feed.current_timestamp(), Some(expected as i64 * 60_000));
        }

        assert!(!feed.has_more());
        assert_eq!(feed.advance().await.unwrap(), FeedPoll::Exhausted);
        // The last candle stays current after exhaustion
        assert_eq!(feed.step_index(), Some(2));
    }

    #[tokio::test]
    async fn test_window_capacity_and_previous() {
        let mut feed = HistoricalFeed::new(candles(10), pipeline(), 4);
        while feed.advance().await.unwrap().is_ready() {}

        assert_eq!(feed.window().len(), 4);
        assert_eq!(feed.previous(0).unwrap().timestamp(), 9 * 60_000);
        assert_eq!(feed.previous(3).unwrap().timestamp(), 6 * 60_000);
        assert!(feed.previous(4).is_none());
    }

    #[tokio::test]
    async fn test_sorts_and_dedups() {
        let mut table = candles(4);
        table.reverse();
        table.push(table[0]);

        let mut feed = HistoricalFeed::new(table, pipeline(), 500);
        assert_eq!(feed.len(), 4);

        let mut stamps = Vec::new();
        while let FeedPoll::Ready(c) = feed.advance().await.unwrap() {
            stamps.push(c.timestamp());
        }
        assert_eq!(stamps, vec![0, 60_000, 120_000, 180_000]);
    }

    #[tokio::test]
    async fn test_warmup_preload() {
        let mut feed = HistoricalFeed::new(candles(10), pipeline(), 500).with_warmup(4);
        assert_eq!(feed.window().len(), 4);
        assert_eq!(feed.step_index(), Some(3));
        assert_eq!(feed.remaining(), 6);

        let FeedPoll::Ready(first) = feed.advance().await.unwrap() else {
            panic!("expected ready");
        };
        assert_eq!(first.timestamp(), 4 * 60_000);
        assert_eq!(feed.step_index(), Some(4));
    }

    #[tokio::test]
    async fn test_processed_table_covers_every_candle() {
        let mut feed = HistoricalFeed::new(candles(10), pipeline(), 4);
        while feed.advance().await.unwrap().is_ready() {}

        let table = feed.processed_table();
        assert_eq!(feed.window().len(), 4);
        assert_eq!(table.len(), 10);
        assert_eq!(table.rows()[0].timestamp(), 0);
        assert_eq!(table.rows()[9].timestamp(), feed.current_timestamp().unwrap());
    }

    #[tokio::test]
    async fn test_empty_table() {
        let mut feed = HistoricalFeed::new(Vec::new(), pipeline(), 500).with_warmup(10);
        assert!(feed.is_empty());
        assert!(!feed.has_more());
        assert_eq!(feed.advance().await.unwrap(), FeedPoll::Exhausted);
        assert!(feed.current().is_none());
    }
}

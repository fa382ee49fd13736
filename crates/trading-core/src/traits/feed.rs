//! Market view and candle feed contracts.

use crate::error::DataError;
use crate::types::{EnrichedCandle, EnrichedWindow};
use async_trait::async_trait;

/// Read-only access to the enriched window a strategy evaluates.
pub trait MarketView: Send + Sync {
    /// The enriched window, oldest row first.
    fn window(&self) -> &EnrichedWindow;

    /// The newest enriched candle.
    fn current(&self) -> Option<&EnrichedCandle> {
        self.window().last()
    }

    /// The candle `k` steps back; `previous(0)` is the current candle.
    ///
    /// Returns `None` when the window does not reach that far back.
    fn previous(&self, k: usize) -> Option<&EnrichedCandle> {
        self.window().from_end(k)
    }
}

impl MarketView for EnrichedWindow {
    fn window(&self) -> &EnrichedWindow {
        self
    }
}

/// Outcome of asking a feed for the next candle.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedPoll {
    /// A new candle was folded into the window.
    Ready(EnrichedCandle),
    /// Nothing new yet (stale, duplicate or unclosed candle); poll again.
    Pending,
    /// The stream has ended or was cancelled.
    Exhausted,
}

impl FeedPoll {
    pub fn is_ready(&self) -> bool {
        matches!(self, FeedPoll::Ready(_))
    }
}

/// Sequential, look-ahead-free delivery of enriched candles.
///
/// Historical and live feeds share this contract so the execution loop
/// does not care where candles come from.
#[async_trait]
pub trait CandleFeed: MarketView {
    /// Advance to the next candle.
    async fn advance(&mut self) -> Result<FeedPoll, DataError>;

    /// Whether more candles may still arrive.
    fn has_more(&self) -> bool;

    /// Zero-based position of the current candle in the stream.
    fn step_index(&self) -> Option<usize>;

    /// Timestamp (unix ms) of the current candle.
    fn current_timestamp(&self) -> Option<i64> {
        self.current().map(|c| c.candle.timestamp)
    }
}

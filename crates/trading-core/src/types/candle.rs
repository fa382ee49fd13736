//! OHLCV candle and the bounded rolling window that holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of candles kept in a rolling window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 500;

/// A single closed OHLCV candle.
///
/// Prices are `f64` for indicator math; money is converted to `Decimal`
/// at the portfolio boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix timestamp in milliseconds (candle open time)
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Traded volume
    pub volume: f64,
}

impl Candle {
    /// Create a new candle.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// UTC datetime derived from the timestamp.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// Midpoint of the candle's range, (high + low) / 2.
    #[inline]
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// True range against the previous close; the first candle of a
    /// series has no previous close and uses high - low.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let hl = self.high - self.low;
        match prev_close {
            Some(pc) => hl.max((self.high - pc).abs()).max((self.low - pc).abs()),
            None => hl,
        }
    }

    /// Value of a base column by name.
    pub fn column(&self, name: &str) -> Option<f64> {
        match name {
            "open" => Some(self.open),
            "high" => Some(self.high),
            "low" => Some(self.low),
            "close" => Some(self.close),
            "volume" => Some(self.volume),
            _ => None,
        }
    }

    /// Basic OHLC sanity: high is the maximum, low the minimum, all finite.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.high >= self.low
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}

/// Names of the raw candle columns every enriched row exposes.
pub const BASE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Bounded FIFO window of the most recent candles.
///
/// Pushing past capacity evicts the oldest candle.
#[derive(Debug, Clone)]
pub struct CandleWindow {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a candle, evicting the oldest if at capacity.
    pub fn push(&mut self, candle: Candle) {
        if self.candles.len() >= self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    /// Push several candles in order.
    pub fn extend(&mut self, candles: impl IntoIterator<Item = Candle>) {
        for candle in candles {
            self.push(candle);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent candle.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Candle by index (0 = oldest).
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// Contiguous view of the candles, oldest first.
    pub fn as_slice(&mut self) -> &[Candle] {
        self.candles.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    pub fn clear(&mut self) {
        self.candles.clear();
    }
}

//! Candles annotated with indicator columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::Candle;

/// Trend direction emitted by SuperTrend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Buy,
    Sell,
    /// No direction yet (indicator still warming up, or not configured)
    #[default]
    Unknown,
}

impl TrendDirection {
    pub fn is_buy(&self) -> bool {
        matches!(self, TrendDirection::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, TrendDirection::Sell)
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendDirection::Buy => "buy",
            TrendDirection::Sell => "sell",
            TrendDirection::Unknown => "",
        };
        f.write_str(s)
    }
}

/// A candle plus its derived indicator values.
///
/// Columns that are still warming up are absent rather than zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCandle {
    pub candle: Candle,
    pub values: BTreeMap<String, f64>,
    pub direction: TrendDirection,
}

impl EnrichedCandle {
    pub fn new(candle: Candle) -> Self {
        Self {
            candle,
            values: BTreeMap::new(),
            direction: TrendDirection::Unknown,
        }
    }

    /// Look up a column: indicator outputs first, then the raw candle fields.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.values
            .get(column)
            .copied()
            .or_else(|| self.candle.column(column))
    }

    pub fn timestamp(&self) -> i64 {
        self.candle.timestamp
    }

    pub fn open(&self) -> f64 {
        self.candle.open
    }

    pub fn high(&self) -> f64 {
        self.candle.high
    }

    pub fn low(&self) -> f64 {
        self.candle.low
    }

    pub fn close(&self) -> f64 {
        self.candle.close
    }
}

/// The enriched form of a candle window, oldest row first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichedWindow {
    columns: Vec<String>,
    rows: Vec<EnrichedCandle>,
}

impl EnrichedWindow {
    pub fn new(columns: Vec<String>, rows: Vec<EnrichedCandle>) -> Self {
        Self { columns, rows }
    }

    /// Indicator column names in pipeline order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[EnrichedCandle] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&EnrichedCandle> {
        self.rows.last()
    }

    /// Row `k` places back from the newest; `from_end(0)` is the newest.
    /// Returns `None` when `k` reaches past the oldest row.
    pub fn from_end(&self, k: usize) -> Option<&EnrichedCandle> {
        let index = self.rows.len().checked_sub(k)?.checked_sub(1)?;
        self.rows.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ts: i64, close: f64) -> EnrichedCandle {
        let mut row = EnrichedCandle::new(Candle::new(ts, close, close, close, close, 1.0));
        row.values.insert("EMA_3".to_string(), close * 2.0);
        row
    }

    #[test]
    fn test_get_prefers_indicator_columns() {
        let r = row(1, 10.0);
        assert_eq!(r.get("EMA_3"), Some(20.0));
        assert_eq!(r.get("close"), Some(10.0));
        assert_eq!(r.get("superTrend"), None);
    }

    #[test]
    fn test_from_end_bounds() {
        let window = EnrichedWindow::new(vec!["EMA_3".into()], vec![row(1, 1.0), row(2, 2.0)]);
        assert_eq!(window.from_end(0).map(|r| r.timestamp()), Some(2));
        assert_eq!(window.from_end(1).map(|r| r.timestamp()), Some(1));
        assert!(window.from_end(2).is_none());
        assert!(window.from_end(usize::MAX).is_none());
        assert!(EnrichedWindow::default().from_end(0).is_none());
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(TrendDirection::Buy.to_string(), "buy");
        assert_eq!(TrendDirection::Unknown.to_string(), "");
        assert!(TrendDirection::Sell.is_sell());
    }
}

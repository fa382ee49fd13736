//! Volatility indicators.

use trading_core::traits::{CandleIndicator, Indicator};
use trading_core::types::Candle;

use crate::moving_average::Ema;

/// True Range per candle; the first candle uses high - low.
#[derive(Debug, Clone, Default)]
pub struct TrueRange;

impl TrueRange {
    /// Plain true-range series, one value per candle.
    pub fn series(candles: &[Candle]) -> Vec<f64> {
        let mut prev_close = None;
        candles
            .iter()
            .map(|c| {
                let tr = c.true_range(prev_close);
                prev_close = Some(c.close);
                tr
            })
            .collect()
    }
}

impl CandleIndicator for TrueRange {
    type Output = f64;

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        Self::series(candles).into_iter().map(Some).collect()
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "TR"
    }
}

/// Average True Range smoothed with an EMA of span `period`.
///
/// Defined from the first candle on, since the EMA seeds with the first
/// true range.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Create a new ATR indicator.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl CandleIndicator for Atr {
    type Output = f64;

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        Ema::new(self.period).calculate(&TrueRange.calculate(candles))
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

//! SuperTrend: ATR bands with path-dependent carry-over and hysteretic
//! direction flips.
//!
//! Each row depends on the previous row's final bands and direction, so
//! the computation is a left fold over [`BandState`] rather than a
//! vectorized transform.

use trading_core::traits::CandleIndicator;
use trading_core::types::{Candle, TrendDirection};

use crate::volatility::Atr;

/// Default ATR span.
pub const DEFAULT_PERIOD: usize = 10;
/// Default band multiplier.
pub const DEFAULT_MULTIPLIER: f64 = 3.0;

/// One SuperTrend row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuperTrendPoint {
    /// Active band: final lower while trending up, final upper while down
    pub value: f64,
    pub direction: TrendDirection,
    pub final_upper: f64,
    pub final_lower: f64,
}

/// Carried state of the fold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandState {
    pub final_upper: f64,
    pub final_lower: f64,
    pub direction: TrendDirection,
    close: f64,
}

impl BandState {
    /// First row with a defined ATR. The close seeds the direction when it
    /// sits strictly beyond a band; inside both bands it defaults to up.
    pub fn seed(basic_upper: f64, basic_lower: f64, close: f64) -> Self {
        let direction = if close < basic_lower {
            TrendDirection::Sell
        } else {
            TrendDirection::Buy
        };
        Self {
            final_upper: basic_upper,
            final_lower: basic_lower,
            direction,
            close,
        }
    }

    /// Fold one more row into the state.
    pub fn step(self, basic_upper: f64, basic_lower: f64, close: f64) -> Self {
        let final_lower = if self.close <= self.final_lower {
            basic_lower
        } else {
            basic_lower.max(self.final_lower)
        };
        let final_upper = if self.close >= self.final_upper {
            basic_upper
        } else {
            basic_upper.min(self.final_upper)
        };

        let direction = match self.direction {
            TrendDirection::Sell if close > final_upper => TrendDirection::Buy,
            TrendDirection::Buy if close < final_lower => TrendDirection::Sell,
            current => current,
        };

        Self {
            final_upper,
            final_lower,
            direction,
            close,
        }
    }

    /// The band the trend currently tracks.
    pub fn value(&self) -> f64 {
        match self.direction {
            TrendDirection::Sell => self.final_upper,
            _ => self.final_lower,
        }
    }

    fn point(&self) -> SuperTrendPoint {
        SuperTrendPoint {
            value: self.value(),
            direction: self.direction,
            final_upper: self.final_upper,
            final_lower: self.final_lower,
        }
    }
}

/// SuperTrend indicator.
#[derive(Debug, Clone)]
pub struct SuperTrend {
    period: usize,
    multiplier: f64,
}

impl SuperTrend {
    /// Create a new SuperTrend with the given ATR span and band multiplier.
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        assert!(multiplier > 0.0, "Multiplier must be positive");
        Self { period, multiplier }
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Default for SuperTrend {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, DEFAULT_MULTIPLIER)
    }
}

impl CandleIndicator for SuperTrend {
    type Output = SuperTrendPoint;

    fn calculate(&self, candles: &[Candle]) -> Vec<Option<SuperTrendPoint>> {
        let atr = Atr::new(self.period).calculate(candles);

        candles
            .iter()
            .zip(atr)
            .scan(None::<BandState>, |state, (candle, atr)| {
                let Some(atr) = atr else {
                    return Some(None);
                };
                let mid = candle.midpoint();
                let basic_upper = mid + self.multiplier * atr;
                let basic_lower = mid - self.multiplier * atr;

                let next = match *state {
                    Some(prev) => prev.step(basic_upper, basic_lower, candle.close),
                    None => BandState::seed(basic_upper, basic_lower, candle.close),
                };
                *state = Some(next);
                Some(Some(next.point()))
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SuperTrend"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle::new(ts, close, high, low, close, 1.0)
    }

    #[test]
    fn test_hand_computed_flip() {
        // period 1 makes ATR equal to the true range
        let st = SuperTrend::new(1, 1.0);
        let points = st.calculate(&[
            candle(0, 11.0, 9.0, 10.0),
            candle(1, 13.0, 11.0, 12.0),
            candle(2, 9.0, 5.0, 6.0),
        ]);

        let p0 = points[0].unwrap();
        assert_eq!(p0.direction, TrendDirection::Buy);
        assert_eq!((p0.final_upper, p0.final_lower, p0.value), (12.0, 8.0, 8.0));

        // Lower band ratchets up, upper band carries over
        let p1 = points[1].unwrap();
        assert_eq!(p1.direction, TrendDirection::Buy);
        assert_eq!((p1.final_upper, p1.final_lower, p1.value), (12.0, 9.0, 9.0));

        // Close drops below the final lower band: flip to sell, track the upper band
        let p2 = points[2].unwrap();
        assert_eq!(p2.direction, TrendDirection::Sell);
        assert_eq!((p2.final_upper, p2.final_lower, p2.value), (14.0, 9.0, 14.0));
    }

    #[test]
    fn test_flat_series_never_oscillates() {
        let candles: Vec<Candle> = (0..20).map(|i| candle(i, 100.0, 100.0, 100.0)).collect();
        let points = SuperTrend::default().calculate(&candles);

        assert!(points.iter().all(|p| p.is_some()));
        let directions: Vec<TrendDirection> = points.iter().flatten().map(|p| p.direction).collect();
        assert!(directions.iter().all(|d| *d == TrendDirection::Buy));
    }

    #[test]
    fn test_seed_below_lower_band_is_sell() {
        let state = BandState::seed(110.0, 90.0, 85.0);
        assert_eq!(state.direction, TrendDirection::Sell);
        assert_eq!(state.value(), 110.0);

        let inside = BandState::seed(110.0, 90.0, 100.0);
        assert_eq!(inside.direction, TrendDirection::Buy);
    }

    #[test]
    fn test_touching_band_does_not_flip() {
        let state = BandState::seed(110.0, 90.0, 100.0);
        // Close equal to the carried lower band stays up
        let next = state.step(115.0, 90.0, 90.0);
        assert_eq!(next.direction, TrendDirection::Buy);
    }

    #[test]
    fn test_no_look_ahead() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.3).sin() * 8.0;
                candle(i, c + 1.5, c - 1.5, c)
            })
            .collect();
        let st = SuperTrend::new(7, 2.0);
        let full = st.calculate(&candles);

        for cut in [1, 10, 33, 59] {
            let prefix = st.calculate(&candles[..cut]);
            assert_eq!(prefix[..], full[..cut]);
        }
    }
}

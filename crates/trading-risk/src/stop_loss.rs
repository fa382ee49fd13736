//! Stop-loss rules: fallback stops, trailing stops and per-candle triggers.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use trading_core::types::PositionSide;

/// Stop placed when an entry signal carries none, as a percent of entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackStop {
    pub percent: Decimal,
}

impl Default for FallbackStop {
    fn default() -> Self {
        Self { percent: dec!(1) }
    }
}

impl FallbackStop {
    pub fn new(percent: Decimal) -> Self {
        Self { percent }
    }

    /// Stop price on the loss side of `entry_price`.
    pub fn stop_for(&self, entry_price: Decimal, side: PositionSide) -> Decimal {
        let offset = entry_price * self.percent / dec!(100);
        match side {
            PositionSide::Long => entry_price - offset,
            PositionSide::Short => entry_price + offset,
        }
    }
}

/// Percentage trailing stop that only ever tightens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStop {
    pub percent: Decimal,
}

impl Default for TrailingStop {
    fn default() -> Self {
        Self { percent: dec!(2) }
    }
}

impl TrailingStop {
    pub fn new(percent: Decimal) -> Self {
        Self { percent }
    }

    /// Raw candidate stop trailing `close` by the configured percent.
    pub fn candidate(&self, close: Decimal, side: PositionSide) -> Decimal {
        let factor = self.percent / dec!(100);
        match side {
            PositionSide::Long => close * (Decimal::ONE - factor),
            PositionSide::Short => close * (Decimal::ONE + factor),
        }
    }

    /// New stop to apply, if any.
    ///
    /// A candidate is accepted only when it tightens the current stop and
    /// stays strictly on the loss side of the close, so the update can
    /// never trigger on the candle that produced it.
    pub fn tighten(&self, side: PositionSide, current_stop: Decimal, close: Decimal) -> Option<Decimal> {
        let candidate = self.candidate(close, side);
        Self::accepts(side, current_stop, candidate, close).then_some(candidate)
    }

    /// Acceptance rule for an externally computed candidate.
    pub fn accepts(side: PositionSide, current_stop: Decimal, candidate: Decimal, close: Decimal) -> bool {
        match side {
            PositionSide::Long => candidate > current_stop && candidate < close,
            PositionSide::Short => candidate < current_stop && candidate > close,
        }
    }
}

/// Price at which a stop fills on a candle, if the candle reaches it.
///
/// Opening through the stop fills at the open (gap); otherwise touching it
/// intrabar fills at the stop.
pub fn stop_fill_price(
    side: PositionSide,
    stop: Decimal,
    open: Decimal,
    high: Decimal,
    low: Decimal,
) -> Option<Decimal> {
    match side {
        PositionSide::Long if open <= stop => Some(open),
        PositionSide::Long if low <= stop => Some(stop),
        PositionSide::Short if open >= stop => Some(open),
        PositionSide::Short if high >= stop => Some(stop),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_stop() {
        let fallback = FallbackStop::default();
        assert_eq!(fallback.stop_for(dec!(200), PositionSide::Long), dec!(198));
        assert_eq!(fallback.stop_for(dec!(200), PositionSide::Short), dec!(202));
    }

    #[test]
    fn test_trailing_tightens_long() {
        let trailing = TrailingStop::new(dec!(2));
        // close 110 -> candidate 107.8
        assert_eq!(
            trailing.tighten(PositionSide::Long, dec!(95), dec!(110)),
            Some(dec!(107.80))
        );
        // Looser than the current stop: keep it
        assert_eq!(trailing.tighten(PositionSide::Long, dec!(108), dec!(110)), None);
    }

    #[test]
    fn test_trailing_tightens_short() {
        let trailing = TrailingStop::new(dec!(2));
        assert_eq!(
            trailing.tighten(PositionSide::Short, dec!(105), dec!(100)),
            Some(dec!(102))
        );
        assert_eq!(trailing.tighten(PositionSide::Short, dec!(101), dec!(100)), None);
    }

    #[test]
    fn test_candidate_beyond_close_rejected() {
        // Stop 99 with close 100: a candidate of 100.5 would fire immediately
        assert!(!TrailingStop::accepts(PositionSide::Long, dec!(99), dec!(100.5), dec!(100)));
        assert!(TrailingStop::accepts(PositionSide::Long, dec!(99), dec!(99.5), dec!(100)));
        assert!(!TrailingStop::accepts(PositionSide::Short, dec!(101), dec!(99.5), dec!(100)));

        // A negative percent produces exactly that kind of candidate
        let inverted = TrailingStop::new(dec!(-0.5));
        assert_eq!(inverted.tighten(PositionSide::Long, dec!(99), dec!(100)), None);
    }

    #[test]
    fn test_stop_fill_gap_and_touch() {
        // Gap through the stop fills at the open
        assert_eq!(
            stop_fill_price(PositionSide::Long, dec!(95), dec!(90), dec!(92), dec!(88)),
            Some(dec!(90))
        );
        // Intrabar touch fills at the stop
        assert_eq!(
            stop_fill_price(PositionSide::Long, dec!(95), dec!(97), dec!(99), dec!(94)),
            Some(dec!(95))
        );
        assert_eq!(
            stop_fill_price(PositionSide::Long, dec!(95), dec!(97), dec!(99), dec!(96)),
            None
        );
        assert_eq!(
            stop_fill_price(PositionSide::Short, dec!(105), dec!(107), dec!(108), dec!(104)),
            Some(dec!(107))
        );
        assert_eq!(
            stop_fill_price(PositionSide::Short, dec!(105), dec!(103), dec!(105), dec!(101)),
            Some(dec!(105))
        );
    }
}

//! Indicator trait definitions.

use crate::types::Candle;

/// Indicator over a single aligned series.
///
/// Output index `i` corresponds to input index `i`; positions that are
/// still warming up (or whose input is undefined) are `None`.
pub trait Indicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values aligned with `data`.
    fn calculate(&self, data: &[Option<f64>]) -> Vec<Option<Self::Output>>;

    /// Get the number of inputs needed for the first value.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}

/// Indicator that reads whole candles rather than one column.
pub trait CandleIndicator: Send + Sync {
    /// The output type of the indicator.
    type Output;

    /// Calculate indicator values aligned with `candles`.
    fn calculate(&self, candles: &[Candle]) -> Vec<Option<Self::Output>>;

    /// Get the number of candles needed for the first value.
    fn period(&self) -> usize;

    /// Get the name of the indicator.
    fn name(&self) -> &str;
}

//! Trading strategy implementations.
//!
//! This crate provides:
//! - SuperTrend + moving-average band breakout (long and short)
//! - Moving average crossover (long only)
//!
//! Strategies read indicator columns by name from the enriched window, so
//! each one also knows the indicator list it expects.

mod ma_crossover;
mod registry;
mod supertrend_ma;

pub use ma_crossover::{MACrossoverConfig, MACrossoverStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use supertrend_ma::{SuperTrendMaConfig, SuperTrendMaStrategy};

use trading_core::error::StrategyError;
use trading_core::traits::MarketView;
use trading_core::types::{EnrichedCandle, BASE_COLUMNS};

/// Read `column` from `row`.
///
/// A column the pipeline never produces is a configuration error; a known
/// column without a value (still warming up) is `None`.
pub(crate) fn column_value(
    market: &dyn MarketView,
    row: &EnrichedCandle,
    column: &str,
) -> Result<Option<f64>, StrategyError> {
    let known = BASE_COLUMNS.contains(&column)
        || market.window().columns().iter().any(|c| c == column);
    if !known {
        return Err(StrategyError::MissingColumn(column.to_string()));
    }
    Ok(row.get(column))
}

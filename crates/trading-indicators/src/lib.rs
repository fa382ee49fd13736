//! Technical indicators and the configuration-driven pipeline that derives
//! indicator columns from a candle window.
//!
//! - Moving averages (rolling SMA, span EMA)
//! - Volatility (true range, EMA-smoothed ATR)
//! - SuperTrend with path-dependent bands
//!
//! Every indicator returns values aligned with its input; warm-up rows are
//! `None`.

pub mod moving_average;
pub mod pipeline;
pub mod supertrend;
pub mod volatility;

pub use moving_average::{defined, Ema, Sma};
pub use pipeline::{
    IndicatorConfig, IndicatorKind, IndicatorPipeline, SUPERTREND_COLUMN,
    SUPERTREND_DIRECTION_COLUMN,
};
pub use supertrend::{BandState, SuperTrend, SuperTrendPoint};
pub use volatility::{Atr, TrueRange};

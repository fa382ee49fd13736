//! Position-risk engine.
//!
//! Provides the single-position [`Portfolio`] (capital, fees, trade ledger),
//! risk-budget sizing, and stop-loss rules.

mod portfolio;
mod position_sizer;
mod stop_loss;

pub use portfolio::{ExitReason, Portfolio, PortfolioConfig, PortfolioSummary, Position, TradeRecord};
pub use position_sizer::{PositionSizer, QUANTITY_SCALE};
pub use stop_loss::{stop_fill_price, FallbackStop, TrailingStop};

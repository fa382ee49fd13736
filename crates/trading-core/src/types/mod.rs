//! Core data types for the trading system.

mod candle;
mod enriched;
mod order;
mod timeframe;

pub use candle::{Candle, CandleWindow, BASE_COLUMNS, DEFAULT_WINDOW_CAPACITY};
pub use enriched::{EnrichedCandle, EnrichedWindow, TrendDirection};
pub use order::{MarketOrder, OrderAck, OrderStatus, PositionSide, Side};
pub use timeframe::Timeframe;

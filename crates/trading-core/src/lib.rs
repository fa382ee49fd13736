//! Core types and traits for the candle trading system.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Candle, CandleWindow, EnrichedCandle, EnrichedWindow)
//! - Position sides, market orders and order acknowledgements
//! - Contracts for candle feeds, strategies, venues and raw candle logs
//! - The error hierarchy shared by every other crate

pub mod types;
pub mod traits;
pub mod error;

pub use error::{ConfigError, DataError, StrategyError, TradingError, TradingResult, VenueError};
pub use types::*;
pub use traits::*;

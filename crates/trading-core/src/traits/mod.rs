//! Core traits for the trading system.

mod candle_log;
mod feed;
mod indicator;
mod strategy;
mod venue;

pub use candle_log::{CandleLog, MemoryCandleLog};
pub use feed::{CandleFeed, FeedPoll, MarketView};
pub use indicator::{CandleIndicator, Indicator};
pub use strategy::{EntrySignal, ExitSignal, Strategy, StrategyConfig};
pub use venue::{CandleStream, StreamedCandle, Venue};

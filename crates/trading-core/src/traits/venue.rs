//! Trading venue trait definition.

use crate::error::VenueError;
use crate::types::{Candle, MarketOrder, OrderAck, Timeframe};
use async_trait::async_trait;
use futures::stream::BoxStream;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A candle update pushed by a venue subscription.
///
/// Venues repeat the in-progress candle until it closes; only candles
/// with `closed == true` may enter a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamedCandle {
    pub candle: Candle,
    pub closed: bool,
}

/// Stream of candle updates from a subscription.
pub type CandleStream = BoxStream<'static, Result<StreamedCandle, VenueError>>;

/// Trait for venue integrations (exchange or simulator).
#[async_trait]
pub trait Venue: Send + Sync {
    /// Most recent closed candles, oldest first.
    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, VenueError>;

    /// Place a market order.
    async fn place_market_order(&self, order: MarketOrder) -> Result<OrderAck, VenueError>;

    /// Subscribe to candle updates for a symbol.
    async fn subscribe_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<CandleStream, VenueError>;

    /// Free balance of an asset (e.g. "USDT").
    async fn fetch_balance(&self, asset: &str) -> Result<Decimal, VenueError>;

    /// Get the venue name.
    fn name(&self) -> &str;
}

//! Paper venue that replays a candle table as a live market.

use async_trait::async_trait;
use futures::StreamExt;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use trading_core::error::VenueError;
use trading_core::traits::{CandleStream, StreamedCandle, Venue};
use trading_core::types::{Candle, MarketOrder, OrderAck, OrderStatus, Side, Timeframe};

const STREAM_BUFFER: usize = 64;

/// Simulated venue for paper trading.
///
/// The first `history_len` candles answer `fetch_recent_candles`; the rest
/// are pushed through `subscribe_candles` one by one. Market orders fill at
/// the close of the last closed candle the subscriber received, adjusted for
/// slippage.
pub struct PaperVenue {
    candles: Arc<Vec<Candle>>,
    history_len: usize,
    cursor: Arc<AtomicUsize>,
    mark: Arc<Mutex<Option<Decimal>>>,
    cash: Mutex<Decimal>,
    orders: Mutex<Vec<OrderAck>>,
    slippage_pct: Decimal,
    replay_delay: Option<Duration>,
    partial_updates: bool,
    funds_check: bool,
}

impl PaperVenue {
    /// Create a paper venue over `candles` with a starting cash balance.
    pub fn new(mut candles: Vec<Candle>, cash: Decimal) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self {
            candles: Arc::new(candles),
            history_len: 0,
            cursor: Arc::new(AtomicUsize::new(0)),
            mark: Arc::new(Mutex::new(None)),
            cash: Mutex::new(cash),
            orders: Mutex::new(Vec::new()),
            slippage_pct: Decimal::ZERO,
            replay_delay: None,
            partial_updates: false,
            funds_check: false,
        }
    }

    /// Serve the first `count` candles as history instead of streaming them.
    pub fn with_history(mut self, count: usize) -> Self {
        self.history_len = count.min(self.candles.len());
        self.cursor.store(self.history_len, Ordering::SeqCst);
        let last_close = self.history_len.checked_sub(1).and_then(|i| self.candles.get(i)).map(|c| c.close);
        *lock(&self.mark) = last_close.and_then(Decimal::from_f64);
        self
    }

    /// Set slippage percentage.
    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Pause between streamed candles.
    pub fn with_replay_delay(mut self, delay: Duration) -> Self {
        self.replay_delay = Some(delay);
        self
    }

    /// Emit an unclosed update before each closed candle, the way exchange
    /// streams repeat the forming candle.
    pub fn with_partial_updates(mut self, enabled: bool) -> Self {
        self.partial_updates = enabled;
        self
    }

    /// Refuse entry buys whose notional exceeds the cash balance.
    ///
    /// Off by default: cash settles at the mark while the portfolio books
    /// strategy prices, so the two drift apart over a run.
    pub fn with_funds_check(mut self, enabled: bool) -> Self {
        self.funds_check = enabled;
        self
    }

    /// Orders accepted so far.
    pub fn orders(&self) -> Vec<OrderAck> {
        lock(&self.orders).clone()
    }

    /// Candles not yet streamed.
    pub fn remaining(&self) -> usize {
        self.candles.len().saturating_sub(self.cursor.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Venue for PaperVenue {
    async fn fetch_recent_candles(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, VenueError> {
        let history = &self.candles[..self.history_len];
        let start = history.len().saturating_sub(limit);
        Ok(history[start..].to_vec())
    }

    async fn place_market_order(&self, order: MarketOrder) -> Result<OrderAck, VenueError> {
        if order.quantity <= Decimal::ZERO {
            return Err(VenueError::OrderRejected(format!(
                "quantity must be positive, got {}",
                order.quantity
            )));
        }
        let mark = (*lock(&self.mark))
            .ok_or_else(|| VenueError::OrderRejected("no market price yet".to_string()))?;

        let slippage = self.slippage_pct / Decimal::ONE_HUNDRED;
        let fill_price = match order.side {
            Side::Buy => mark * (Decimal::ONE + slippage),
            Side::Sell => mark * (Decimal::ONE - slippage),
        };
        let value = fill_price * order.quantity;

        {
            let mut cash = lock(&self.cash);
            match order.side {
                Side::Buy => {
                    if self.funds_check && !order.reduce_only && value > *cash {
                        return Err(VenueError::InsufficientFunds {
                            required: value,
                            available: *cash,
                        });
                    }
                    *cash -= value;
                }
                Side::Sell => *cash += value,
            }
        }

        let ack = OrderAck::for_order(&order, OrderStatus::Filled, Some(fill_price));
        info!(
            id = %ack.id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = %order.quantity,
            price = %fill_price,
            reduce_only = order.reduce_only,
            "paper order filled"
        );
        lock(&self.orders).push(ack.clone());
        Ok(ack)
    }

    async fn subscribe_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<CandleStream, VenueError> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let candles = Arc::clone(&self.candles);
        let from = self.cursor.load(Ordering::SeqCst);
        let delay = self.replay_delay;
        let partial = self.partial_updates;
        debug!(symbol, %timeframe, from, "paper subscription started");

        tokio::spawn(async move {
            for (index, candle) in candles.iter().copied().enumerate().skip(from) {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if partial {
                    let forming = Candle { close: candle.open, ..candle };
                    if tx.send((index, StreamedCandle { candle: forming, closed: false })).await.is_err() {
                        return;
                    }
                }
                if tx.send((index, StreamedCandle { candle, closed: true })).await.is_err() {
                    return;
                }
            }
        });

        // Cursor and mark follow what the subscriber has taken, not what the
        // replay task has buffered, so fills never see a later candle.
        let cursor = Arc::clone(&self.cursor);
        let mark = Arc::clone(&self.mark);
        let stream = ReceiverStream::new(rx).map(move |(index, streamed): (usize, StreamedCandle)| {
            if streamed.closed {
                cursor.store(index + 1, Ordering::SeqCst);
                *lock(&mark) = Decimal::from_f64(streamed.candle.close);
            }
            Ok::<_, VenueError>(streamed)
        });
        Ok(stream.boxed())
    }

    async fn fetch_balance(&self, _asset: &str) -> Result<Decimal, VenueError> {
        Ok(*lock(&self.cash))
    }

    fn name(&self) -> &str {
        "paper"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Candle::new(i as i64 * 3_600_000, c, c + 1.0, c - 1.0, c, 1.0)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_history_then_stream() {
        let venue = PaperVenue::new(candles(5), dec!(1000)).with_history(3);

        let history = venue.fetch_recent_candles("BTC/USDT", Timeframe::Hour1, 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].close, 102.0);

        let stream = venue.subscribe_candles("BTC/USDT", Timeframe::Hour1).await.unwrap();
        let streamed: Vec<StreamedCandle> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(streamed.len(), 2);
        assert!(streamed.iter().all(|s| s.closed));
        assert_eq!(streamed[0].candle.close, 103.0);
        assert_eq!(venue.remaining(), 0);
    }

    #[tokio::test]
    async fn test_fills_use_last_received_candle() {
        let venue = PaperVenue::new(candles(6), dec!(100000)).with_history(3);
        let mut stream = venue.subscribe_candles("BTC/USDT", Timeframe::Hour1).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.candle.close, 103.0);
        // Let the replay task buffer everything that is left
        tokio::time::sleep(Duration::from_millis(20)).await;

        let ack = venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Buy, dec!(1)))
            .await
            .unwrap();
        assert_eq!(ack.fill_price, Some(dec!(103)));
        assert_eq!(venue.remaining(), 2);

        // Buffered but untaken candles are replayed by a new subscription
        drop(stream);
        let rest: Vec<f64> = venue
            .subscribe_candles("BTC/USDT", Timeframe::Hour1)
            .await
            .unwrap()
            .map(|r| r.unwrap().candle.close)
            .collect()
            .await;
        assert_eq!(rest, vec![104.0, 105.0]);
    }

    #[tokio::test]
    async fn test_partial_updates() {
        let venue = PaperVenue::new(candles(2), dec!(1000)).with_partial_updates(true);
        let stream = venue.subscribe_candles("BTC/USDT", Timeframe::Hour1).await.unwrap();
        let closed: Vec<bool> = stream.map(|r| r.unwrap().closed).collect().await;
        assert_eq!(closed, vec![false, true, false, true]);
    }

    #[tokio::test]
    async fn test_market_orders_fill_at_mark() {
        let venue = PaperVenue::new(candles(3), dec!(1000)).with_history(3);

        let ack = venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Buy, dec!(2)).with_stop_loss(dec!(95)))
            .await
            .unwrap();
        assert_eq!(ack.status, OrderStatus::Filled);
        assert_eq!(ack.fill_price, Some(dec!(102)));
        assert_eq!(venue.fetch_balance("USDT").await.unwrap(), dec!(796));

        venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Sell, dec!(2)).reduce_only())
            .await
            .unwrap();
        assert_eq!(venue.fetch_balance("USDT").await.unwrap(), dec!(1000));
        assert_eq!(venue.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_buys_beyond_cash_fill_without_funds_check() {
        let venue = PaperVenue::new(candles(3), dec!(100)).with_history(1);
        let ack = venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Buy, dec!(5)))
            .await
            .unwrap();
        assert_eq!(ack.status, OrderStatus::Filled);
        assert!(venue.fetch_balance("USDT").await.unwrap() < Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_rejections() {
        let venue = PaperVenue::new(candles(3), dec!(100));
        // Nothing streamed yet
        let err = venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Buy, dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, VenueError::OrderRejected(_)));

        let venue = venue.with_history(1).with_funds_check(true);
        let err = venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Buy, dec!(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, VenueError::InsufficientFunds { .. }));

        let err = venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Sell, Decimal::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, VenueError::OrderRejected(_)));
        assert!(venue.orders().is_empty());
    }

    #[tokio::test]
    async fn test_slippage() {
        let venue = PaperVenue::new(candles(1), dec!(1000))
            .with_history(1)
            .with_slippage(dec!(1));
        let ack = venue
            .place_market_order(MarketOrder::new("BTC/USDT", Side::Buy, dec!(1)))
            .await
            .unwrap();
        assert_eq!(ack.fill_price, Some(dec!(101)));
    }
}

//! Tick-by-tick strategy execution.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use trading_core::error::{TradingError, TradingResult, VenueError};
use trading_core::traits::{CandleFeed, EntrySignal, FeedPoll, Strategy, Venue};
use trading_core::types::{MarketOrder, OrderAck, PositionSide};
use trading_risk::{
    stop_fill_price, ExitReason, FallbackStop, Portfolio, PortfolioConfig, TradeRecord, TrailingStop,
};

use crate::report::RunReport;

/// Execution settings, expressed in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub trailing_stop_enabled: bool,
    pub trailing_stop_pct: Decimal,
    /// Stop distance used when an entry signal carries no stop
    pub fallback_stop_pct: Decimal,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            trailing_stop_enabled: false,
            trailing_stop_pct: dec!(2),
            fallback_stop_pct: dec!(1),
        }
    }
}

/// Routes portfolio changes to a venue as market orders.
pub struct OrderRouter {
    venue: Arc<dyn Venue>,
    symbol: String,
}

impl OrderRouter {
    pub fn new(venue: Arc<dyn Venue>, symbol: impl Into<String>) -> Self {
        Self {
            venue,
            symbol: symbol.into(),
        }
    }

    /// Place an order, logging the acknowledgement or the rejection.
    async fn submit(&self, order: MarketOrder) -> Result<OrderAck, VenueError> {
        match self.venue.place_market_order(order).await {
            Ok(ack) => {
                debug!(id = %ack.id, status = ?ack.status, "order acknowledged");
                Ok(ack)
            }
            Err(err) => {
                warn!(venue = self.venue.name(), error = %err, "order rejected; portfolio unchanged");
                Err(err)
            }
        }
    }
}

/// Strategy execution loop.
///
/// Flat: ask for a long entry, then (still flat) a short entry. In a
/// position: stop loss first, then the trailing update, then the strategy
/// exit for the open side. At most one position is open at any time and an
/// exhausted feed liquidates whatever is still open.
pub struct ExecutionLoop {
    portfolio: Portfolio,
    strategy: Box<dyn Strategy>,
    fallback: FallbackStop,
    trailing: Option<TrailingStop>,
    router: Option<OrderRouter>,
    ticks: usize,
    equity_curve: Vec<(i64, Decimal)>,
}

impl ExecutionLoop {
    pub fn new(portfolio: &PortfolioConfig, strategy: Box<dyn Strategy>, config: &ExecutionConfig) -> Self {
        Self {
            portfolio: Portfolio::new(portfolio),
            strategy,
            fallback: FallbackStop::new(config.fallback_stop_pct),
            trailing: config
                .trailing_stop_enabled
                .then(|| TrailingStop::new(config.trailing_stop_pct)),
            router: None,
            ticks: 0,
            equity_curve: Vec::new(),
        }
    }

    /// Place a venue order before every open and close.
    pub fn with_router(mut self, router: OrderRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn strategy(&self) -> &dyn Strategy {
        self.strategy.as_ref()
    }

    /// Candles evaluated so far.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Drive `feed` to exhaustion, then liquidate.
    ///
    /// Strategy and data errors stop the run.
    pub async fn run<F: CandleFeed + ?Sized>(&mut self, feed: &mut F) -> TradingResult<RunReport> {
        info!(strategy = self.strategy.name(), "run started");
        loop {
            match feed.advance().await? {
                FeedPoll::Ready(_) => self.on_candle(feed).await?,
                FeedPoll::Pending => tokio::task::yield_now().await,
                FeedPoll::Exhausted => break,
            }
        }
        self.liquidate(feed).await?;
        let report = self.report();
        info!(
            trades = report.stats.total_trades,
            net_profit = %report.stats.net_profit,
            "run finished"
        );
        Ok(report)
    }

    /// Evaluate the feed's current candle.
    pub async fn on_candle<F: CandleFeed + ?Sized>(&mut self, feed: &F) -> TradingResult<()> {
        let Some(current) = feed.current() else {
            return Ok(());
        };
        let candle = current.candle;
        let step = feed.step_index().unwrap_or(0);
        let close = to_decimal(candle.close, "close")?;
        self.ticks += 1;

        match self.portfolio.position().map(|p| (p.side, p.stop_loss)) {
            Some((side, stop)) => {
                let open = to_decimal(candle.open, "open")?;
                let high = to_decimal(candle.high, "high")?;
                let low = to_decimal(candle.low, "low")?;

                if let Some(fill) = stop_fill_price(side, stop, open, high, low) {
                    debug!(%side, %stop, %fill, step, "stop loss hit");
                    self.exit_or_hold(fill, candle.timestamp, step, ExitReason::StopLoss).await;
                } else {
                    if let Some(new_stop) = self.trailing.and_then(|t| t.tighten(side, stop, close)) {
                        self.portfolio.update_stop_loss(new_stop);
                    }

                    let market = feed.window();
                    let signal = match side {
                        PositionSide::Long => self.strategy.close_long_signal(market)?,
                        PositionSide::Short => self.strategy.close_short_signal(market)?,
                    };
                    if let Some(signal) = signal {
                        let price = to_decimal(signal.price, "exit price")?;
                        self.exit_or_hold(price, candle.timestamp, step, ExitReason::Signal(signal.reason))
                            .await;
                    }
                }
            }
            None => {
                if let Some(signal) = self.strategy.buy_signal(feed.window())? {
                    self.enter(PositionSide::Long, signal, candle.timestamp, step).await?;
                }
                if self.portfolio.is_flat() {
                    if let Some(signal) = self.strategy.sell_signal(feed.window())? {
                        self.enter(PositionSide::Short, signal, candle.timestamp, step).await?;
                    }
                }
            }
        }

        self.equity_curve
            .push((candle.timestamp, self.portfolio.equity(close)));
        Ok(())
    }

    /// Close any open position at the last candle's close.
    ///
    /// `Ok(None)` when already flat. A venue rejection leaves the position
    /// open and is returned so the caller can retry.
    pub async fn liquidate<F: CandleFeed + ?Sized>(&mut self, feed: &F) -> TradingResult<Option<TradeRecord>> {
        if self.portfolio.is_flat() {
            return Ok(None);
        }
        let current = feed
            .current()
            .ok_or_else(|| TradingError::Internal("open position but no candle to liquidate at".to_string()))?;
        let close = to_decimal(current.close(), "close")?;
        let step = feed.step_index().unwrap_or(0);
        info!(step, %close, "liquidating open position at end of data");
        self.exit(close, current.timestamp(), step, ExitReason::EndOfData).await
    }

    /// Report over everything traded so far.
    pub fn report(&self) -> RunReport {
        RunReport::new(
            self.strategy.name(),
            self.ticks,
            &self.portfolio,
            self.equity_curve.clone(),
        )
    }

    async fn enter(
        &mut self,
        side: PositionSide,
        signal: EntrySignal,
        timestamp: i64,
        step: usize,
    ) -> TradingResult<()> {
        let price = to_decimal(signal.price, "entry price")?;
        let stop_loss = match signal.stop_loss {
            Some(stop) => to_decimal(stop, "stop loss")?,
            None => self.fallback.stop_for(price, side),
        };
        let risk_per_unit = (price - stop_loss).abs();

        let stop_on_loss_side = match side {
            PositionSide::Long => stop_loss < price,
            PositionSide::Short => stop_loss > price,
        };
        if let Some(router) = self.router.as_ref().filter(|_| stop_on_loss_side) {
            let quantity = self.portfolio.quantity_for(price, risk_per_unit);
            if quantity > Decimal::ZERO {
                let order = MarketOrder::new(router.symbol.clone(), side.entry_side(), quantity)
                    .with_stop_loss(stop_loss);
                if router.submit(order).await.is_err() {
                    return Ok(());
                }
            }
        }

        self.portfolio
            .open(side, price, stop_loss, risk_per_unit, timestamp, step);
        Ok(())
    }

    /// Close the position, routing the reduce-only order first.
    async fn exit(
        &mut self,
        price: Decimal,
        timestamp: i64,
        step: usize,
        reason: ExitReason,
    ) -> TradingResult<Option<TradeRecord>> {
        if let (Some(router), Some(position)) = (&self.router, self.portfolio.position()) {
            let order = MarketOrder::new(router.symbol.clone(), position.side.exit_side(), position.quantity)
                .reduce_only();
            router.submit(order).await?;
        }
        Ok(self.portfolio.close(price, timestamp, step, reason))
    }

    /// Mid-run exit: a rejected close keeps the position for the next tick.
    async fn exit_or_hold(&mut self, price: Decimal, timestamp: i64, step: usize, reason: ExitReason) {
        if self.exit(price, timestamp, step, reason).await.is_err() {
            debug!(step, "exit not routed; position kept");
        }
    }
}

fn to_decimal(value: f64, what: &str) -> TradingResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| TradingError::Validation(format!("{} is not a finite number: {}", what, value)))
}

//! Strategy trait definitions.

use crate::error::StrategyError;
use crate::traits::MarketView;
use serde::{Deserialize, Serialize};

/// Configuration trait for strategies.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), StrategyError>;
}

/// Request to open a position at `price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntrySignal {
    pub price: f64,
    /// Protective stop; the execution loop applies its fallback when absent
    pub stop_loss: Option<f64>,
}

impl EntrySignal {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            stop_loss: None,
        }
    }

    pub fn with_stop_loss(mut self, stop_loss: f64) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }
}

/// Request to close the open position at `price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub price: f64,
    pub reason: String,
}

impl ExitSignal {
    pub fn new(price: f64, reason: impl Into<String>) -> Self {
        Self {
            price,
            reason: reason.into(),
        }
    }
}

/// Core strategy trait.
///
/// A strategy inspects the enriched window and answers four questions per
/// tick. The execution loop decides which of them to ask: entry signals only
/// while flat, the exit signal matching the open side only while in a
/// position. Errors are fatal for the tick and stop the run.
pub trait Strategy: Send + Sync {
    /// Get the unique name of this strategy.
    fn name(&self) -> &str;

    /// Long entry.
    fn buy_signal(&mut self, market: &dyn MarketView) -> Result<Option<EntrySignal>, StrategyError>;

    /// Short entry. Long-only strategies keep the default.
    fn sell_signal(&mut self, _market: &dyn MarketView) -> Result<Option<EntrySignal>, StrategyError> {
        Ok(None)
    }

    /// Exit for an open long position.
    fn close_long_signal(&mut self, market: &dyn MarketView) -> Result<Option<ExitSignal>, StrategyError>;

    /// Exit for an open short position.
    fn close_short_signal(&mut self, _market: &dyn MarketView) -> Result<Option<ExitSignal>, StrategyError> {
        Ok(None)
    }

    /// Number of candles needed before signals are meaningful.
    fn warmup_period(&self) -> usize {
        0
    }

    /// Get a description of the strategy.
    fn description(&self) -> &str {
        ""
    }
}

//! Moving Average Crossover Strategy.
//!
//! Long-only: holds a long position while the fast moving average is above
//! the slow one and exits at the close once it drops below.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    traits::{EntrySignal, ExitSignal, MarketView, Strategy, StrategyConfig},
};
use trading_indicators::IndicatorConfig;

use crate::column_value;

/// Configuration for the MA Crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MACrossoverConfig {
    /// Fast moving average period
    pub fast_period: usize,
    /// Slow moving average period
    pub slow_period: usize,
    /// Use EMA instead of SMA
    pub use_ema: bool,
}

impl Default for MACrossoverConfig {
    fn default() -> Self {
        Self {
            fast_period: 50,
            slow_period: 200,
            use_ema: false,
        }
    }
}

impl MACrossoverConfig {
    fn column(&self, period: usize) -> String {
        if self.use_ema {
            format!("EMA_{}", period)
        } else {
            format!("SMA_{}", period)
        }
    }

    pub fn fast_column(&self) -> String {
        self.column(self.fast_period)
    }

    pub fn slow_column(&self) -> String {
        self.column(self.slow_period)
    }

    /// Indicator list producing the columns this strategy reads.
    pub fn indicators(&self) -> Vec<IndicatorConfig> {
        let name = if self.use_ema { "ema" } else { "sma" };
        vec![
            IndicatorConfig::new(name).with("period", self.fast_period),
            IndicatorConfig::new(name).with("period", self.slow_period),
        ]
    }
}

impl StrategyConfig for MACrossoverConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Moving Average Crossover Strategy.
pub struct MACrossoverStrategy {
    config: MACrossoverConfig,
    fast_column: String,
    slow_column: String,
}

impl MACrossoverStrategy {
    /// Create a new MA Crossover strategy.
    pub fn new(config: MACrossoverConfig) -> Self {
        Self {
            fast_column: config.fast_column(),
            slow_column: config.slow_column(),
            config,
        }
    }

    /// Fast and slow values on the current candle, once both are defined.
    fn averages(&self, market: &dyn MarketView) -> Result<Option<(f64, f64, f64)>, StrategyError> {
        let Some(now) = market.current() else {
            return Ok(None);
        };
        let fast = column_value(market, now, &self.fast_column)?;
        let slow = column_value(market, now, &self.slow_column)?;
        Ok(fast.zip(slow).map(|(f, s)| (f, s, now.close())))
    }
}

impl Strategy for MACrossoverStrategy {
    fn name(&self) -> &str {
        "MA Crossover"
    }

    fn description(&self) -> &str {
        "Long while the fast moving average is above the slow one"
    }

    fn buy_signal(&mut self, market: &dyn MarketView) -> Result<Option<EntrySignal>, StrategyError> {
        Ok(self
            .averages(market)?
            .and_then(|(fast, slow, close)| (fast > slow).then(|| EntrySignal::new(close))))
    }

    fn close_long_signal(&mut self, market: &dyn MarketView) -> Result<Option<ExitSignal>, StrategyError> {
        Ok(self.averages(market)?.and_then(|(fast, slow, close)| {
            (fast < slow).then(|| ExitSignal::new(close, "sma_crossover_exit"))
        }))
    }

    fn warmup_period(&self) -> usize {
        self.config.slow_period
    }
}

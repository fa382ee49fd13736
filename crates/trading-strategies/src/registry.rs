//! Strategy registry for name-keyed strategy construction.

use crate::{MACrossoverConfig, MACrossoverStrategy, SuperTrendMaConfig, SuperTrendMaStrategy};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use trading_core::{error::StrategyError, traits::Strategy, traits::StrategyConfig};
use trading_indicators::IndicatorConfig;

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Registry key
    pub key: String,
    /// Display name
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
    /// Indicators the default configuration reads
    pub indicators: Vec<IndicatorConfig>,
}

/// Registry for available trading strategies.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let mut strategies = BTreeMap::new();

        let supertrend = SuperTrendMaConfig::default();
        strategies.insert(
            "supertrend_ma".to_string(),
            StrategyInfo {
                key: "supertrend_ma".to_string(),
                name: "SuperTrend MA".to_string(),
                description: "Band breakouts on the rolling mean of highs/lows confirmed by SuperTrend"
                    .to_string(),
                default_config: serde_json::to_value(&supertrend).unwrap_or_default(),
                indicators: supertrend.indicators(),
            },
        );

        let crossover = MACrossoverConfig::default();
        strategies.insert(
            "ma_crossover".to_string(),
            StrategyInfo {
                key: "ma_crossover".to_string(),
                name: "MA Crossover".to_string(),
                description: "Long while the fast moving average is above the slow one".to_string(),
                default_config: serde_json::to_value(&crossover).unwrap_or_default(),
                indicators: crossover.indicators(),
            },
        );

        Self { strategies }
    }

    /// List all available strategies, sorted by key.
    pub fn list(&self) -> Vec<&StrategyInfo> {
        self.strategies.values().collect()
    }

    /// Get strategy info by name.
    pub fn get(&self, name: &str) -> Option<&StrategyInfo> {
        self.strategies.get(name)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Get all strategy names.
    pub fn names(&self) -> Vec<&String> {
        self.strategies.keys().collect()
    }

    /// Create a strategy instance from JSON parameters.
    ///
    /// `null` means defaults; unspecified fields take their defaults.
    pub fn create(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        debug!(strategy = name, %params, "creating strategy");
        match name {
            "supertrend_ma" => {
                let config: SuperTrendMaConfig = parse_config(params)?;
                config.validate()?;
                Ok(Box::new(SuperTrendMaStrategy::new(config)))
            }
            "ma_crossover" => {
                let config: MACrossoverConfig = parse_config(params)?;
                config.validate()?;
                Ok(Box::new(MACrossoverStrategy::new(config)))
            }
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }

    /// Create a strategy with default configuration.
    pub fn create_default(&self, name: &str) -> Result<Box<dyn Strategy>, StrategyError> {
        self.create(name, serde_json::Value::Null)
    }

    /// Indicators a strategy reads with the given parameters.
    pub fn indicators_for(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<Vec<IndicatorConfig>, StrategyError> {
        match name {
            "supertrend_ma" => Ok(parse_config::<SuperTrendMaConfig>(params)?.indicators()),
            "ma_crossover" => Ok(parse_config::<MACrossoverConfig>(params)?.indicators()),
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_config<T: DeserializeOwned + Default>(params: serde_json::Value) -> Result<T, StrategyError> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}

//! Configuration structures.

use chrono::{DateTime, Duration as Span, Month, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use trading_core::error::ConfigError;
use trading_core::types::Timeframe;
use trading_engine::ExecutionConfig;
use trading_indicators::{IndicatorConfig, IndicatorPipeline};
use trading_risk::PortfolioConfig;
use trading_strategies::StrategyRegistry;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub strategy: StrategySettings,
    #[serde(default)]
    pub market: MarketSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub live: LiveSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
    /// Explicit indicator list; empty means "whatever the strategy reads"
    #[serde(default)]
    pub indicators: Vec<IndicatorConfig>,
}

impl AppConfig {
    /// Indicators to compute: the explicit list, or the strategy's own.
    pub fn indicator_configs(&self) -> Result<Vec<IndicatorConfig>, ConfigError> {
        if !self.indicators.is_empty() {
            return Ok(self.indicators.clone());
        }
        StrategyRegistry::new()
            .indicators_for(&self.strategy.name, self.strategy.params.clone())
            .map_err(|e| ConfigError::Invalid(format!("strategy '{}': {}", self.strategy.name, e)))
    }

    /// Check ranges and that the strategy and indicator list build.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.portfolio;
        if p.initial_capital <= Decimal::ZERO {
            return Err(invalid("portfolio.initial_capital must be positive"));
        }
        if p.risk_pct <= Decimal::ZERO || p.risk_pct > Decimal::ONE_HUNDRED {
            return Err(invalid("portfolio.risk_pct must be in (0, 100]"));
        }
        if p.fee_pct < Decimal::ZERO || p.fee_pct >= Decimal::ONE_HUNDRED {
            return Err(invalid("portfolio.fee_pct must be in [0, 100)"));
        }

        let e = &self.execution;
        for (name, pct) in [
            ("execution.trailing_stop_pct", e.trailing_stop_pct),
            ("execution.fallback_stop_pct", e.fallback_stop_pct),
        ] {
            if pct <= Decimal::ZERO || pct >= Decimal::ONE_HUNDRED {
                return Err(ConfigError::Invalid(format!("{} must be in (0, 100)", name)));
            }
        }

        if self.feed.window_capacity == 0 {
            return Err(invalid("feed.window_capacity must be positive"));
        }
        if self.live.history_limit == 0 {
            return Err(invalid("live.history_limit must be positive"));
        }
        if self.market.symbol.trim().is_empty() {
            return Err(invalid("market.symbol must not be empty"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not one of {:?}",
                self.logging.level, LOG_LEVELS
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format '{}' must be 'pretty' or 'json'",
                self.logging.format
            )));
        }

        self.backtest.runs()?;

        StrategyRegistry::new()
            .create(&self.strategy.name, self.strategy.params.clone())
            .map_err(|e| ConfigError::Invalid(format!("strategy '{}': {}", self.strategy.name, e)))?;
        IndicatorPipeline::new(&self.indicator_configs()?)?;
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "candle-trader".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<String>,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Candle window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    /// Candles kept in the rolling window
    pub window_capacity: usize,
    /// Historical candles loaded before the first evaluated tick
    pub warmup_candles: usize,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            window_capacity: 500,
            warmup_candles: 0,
        }
    }
}

/// Strategy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Registry key
    pub name: String,
    /// Strategy parameters; missing keys take the strategy defaults
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            name: "supertrend_ma".to_string(),
            params: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: Timeframe::Hour1,
        }
    }
}

/// Where tables and documents are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub base_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            base_dir: "data".to_string(),
        }
    }
}

/// Live and paper trading settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    /// Closed candles fetched to seed the window
    pub history_limit: usize,
    pub retry_delay_secs: u64,
    /// Asset whose balance is reported at startup
    pub capital_asset: String,
}

impl LiveSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            history_limit: 100,
            retry_delay_secs: 10,
            capital_asset: "USDT".to_string(),
        }
    }
}

/// Backtest sweep: every symbol × timeframe × period.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub symbols: Vec<String>,
    pub timeframes: Vec<Timeframe>,
    /// Directory holding one candle CSV per symbol and timeframe
    pub data_dir: String,
    /// File name with `{symbol}` and `{timeframe}` placeholders
    pub file_pattern: String,
    /// Year to month names; an empty list covers the whole year
    pub periods: BTreeMap<String, Vec<String>>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            timeframes: Vec::new(),
            data_dir: "data/raw".to_string(),
            file_pattern: "{symbol}_{timeframe}.csv".to_string(),
            periods: BTreeMap::new(),
        }
    }
}

/// One backtest of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepRun {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// `2024` for a whole year, `2024_march` for a month
    pub period: String,
    /// First millisecond of the period
    pub start: DateTime<Utc>,
    /// Last millisecond of the period
    pub end: DateTime<Utc>,
}

impl BacktestSettings {
    /// Expand the sweep, symbols outermost, then timeframes, then periods
    /// in year order.
    pub fn runs(&self) -> Result<Vec<SweepRun>, ConfigError> {
        let mut ranges = Vec::new();
        for (year, months) in &self.periods {
            let year: i32 = year
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("backtest.periods: '{}' is not a year", year)))?;
            if months.is_empty() {
                ranges.push((year.to_string(), year_start(year, 1)?, year_start(year + 1, 1)?));
                continue;
            }
            for name in months {
                let month: Month = name
                    .parse()
                    .map_err(|_| ConfigError::Invalid(format!("backtest.periods: unknown month '{}'", name)))?;
                let number = month.number_from_month();
                let next = if number == 12 { year_start(year + 1, 1)? } else { year_start(year, number + 1)? };
                ranges.push((
                    format!("{}_{}", year, month.name().to_lowercase()),
                    year_start(year, number)?,
                    next,
                ));
            }
        }

        let mut runs = Vec::new();
        for symbol in &self.symbols {
            for timeframe in &self.timeframes {
                for (period, start, next) in &ranges {
                    runs.push(SweepRun {
                        symbol: symbol.clone(),
                        timeframe: *timeframe,
                        period: period.clone(),
                        start: *start,
                        end: *next - Span::milliseconds(1),
                    });
                }
            }
        }
        Ok(runs)
    }

    /// Candle file for a symbol and timeframe.
    pub fn data_file(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        let symbol: String = symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        let name = self
            .file_pattern
            .replace("{symbol}", &symbol)
            .replace("{timeframe}", &timeframe.to_string());
        PathBuf::from(&self.data_dir).join(name)
    }
}

fn year_start(year: i32, month: u32) -> Result<DateTime<Utc>, ConfigError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| ConfigError::Invalid(format!("backtest.periods: year {} out of range", year)))
}

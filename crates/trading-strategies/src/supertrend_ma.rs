//! SuperTrend + moving-average band breakout.
//!
//! Enters long when the close breaks above the rolling mean of highs on two
//! consecutive green candles while SuperTrend points up; shorts mirror this
//! on the rolling mean of lows. Positions exit when the candle trades back
//! through the previous candle's band against the position.

use serde::{Deserialize, Serialize};
use trading_core::{
    error::StrategyError,
    traits::{EntrySignal, ExitSignal, MarketView, Strategy, StrategyConfig},
    types::{EnrichedCandle, TrendDirection},
};
use trading_indicators::{IndicatorConfig, SUPERTREND_COLUMN};

use crate::column_value;

/// Configuration for the SuperTrend MA strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuperTrendMaConfig {
    /// Period of the high/low band averages
    pub ma_period: usize,
    /// SuperTrend ATR period
    pub supertrend_period: usize,
    /// SuperTrend band multiplier
    pub supertrend_multiplier: f64,
    /// Initial stop distance from the entry price (percent)
    pub stop_loss_pct: f64,
    /// Take short entries
    pub allow_short: bool,
}

impl Default for SuperTrendMaConfig {
    fn default() -> Self {
        Self {
            ma_period: 20,
            supertrend_period: 10,
            supertrend_multiplier: 3.0,
            stop_loss_pct: 4.0,
            allow_short: true,
        }
    }
}

impl SuperTrendMaConfig {
    pub fn high_column(&self) -> String {
        format!("ma{}high", self.ma_period)
    }

    pub fn low_column(&self) -> String {
        format!("ma{}low", self.ma_period)
    }

    /// Indicator list producing the columns this strategy reads.
    pub fn indicators(&self) -> Vec<IndicatorConfig> {
        vec![
            IndicatorConfig::new("ma_high").with("period", self.ma_period),
            IndicatorConfig::new("ma_low").with("period", self.ma_period),
            IndicatorConfig::new("supertrend")
                .with("period", self.supertrend_period)
                .with("multiplier", self.supertrend_multiplier),
        ]
    }
}

impl StrategyConfig for SuperTrendMaConfig {
    fn validate(&self) -> Result<(), StrategyError> {
        if self.ma_period == 0 || self.supertrend_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Periods must be greater than 0".into(),
            ));
        }
        if !(self.supertrend_multiplier > 0.0) {
            return Err(StrategyError::InvalidConfig(
                "SuperTrend multiplier must be positive".into(),
            ));
        }
        if !(self.stop_loss_pct > 0.0 && self.stop_loss_pct < 100.0) {
            return Err(StrategyError::InvalidConfig(
                "Stop loss percentage must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

/// SuperTrend MA band strategy.
pub struct SuperTrendMaStrategy {
    config: SuperTrendMaConfig,
    high_column: String,
    low_column: String,
}

impl SuperTrendMaStrategy {
    pub fn new(config: SuperTrendMaConfig) -> Self {
        Self {
            high_column: config.high_column(),
            low_column: config.low_column(),
            config,
        }
    }

    fn body(candle: &EnrichedCandle) -> f64 {
        candle.close() - candle.open()
    }

    /// Current and previous candle, with the SuperTrend column checked.
    fn pair<'a>(
        market: &'a dyn MarketView,
    ) -> Result<Option<(&'a EnrichedCandle, &'a EnrichedCandle)>, StrategyError> {
        let (Some(today), Some(yesterday)) = (market.current(), market.previous(1)) else {
            return Ok(None);
        };
        column_value(market, today, SUPERTREND_COLUMN)?;
        Ok(Some((today, yesterday)))
    }
}

impl Strategy for SuperTrendMaStrategy {
    fn name(&self) -> &str {
        "SuperTrend MA"
    }

    fn description(&self) -> &str {
        "Band breakouts on the rolling mean of highs/lows confirmed by SuperTrend direction"
    }

    fn buy_signal(&mut self, market: &dyn MarketView) -> Result<Option<EntrySignal>, StrategyError> {
        let Some((today, yesterday)) = Self::pair(market)? else {
            return Ok(None);
        };
        let Some(band) = column_value(market, today, &self.high_column)? else {
            return Ok(None);
        };

        if today.close() > band
            && Self::body(today) > 0.0
            && Self::body(yesterday) > 0.0
            && today.direction == TrendDirection::Buy
        {
            let price = today.close();
            let stop = price * (1.0 - self.config.stop_loss_pct / 100.0);
            return Ok(Some(EntrySignal::new(price).with_stop_loss(stop)));
        }
        Ok(None)
    }

    fn sell_signal(&mut self, market: &dyn MarketView) -> Result<Option<EntrySignal>, StrategyError> {
        if !self.config.allow_short {
            return Ok(None);
        }
        let Some((today, yesterday)) = Self::pair(market)? else {
            return Ok(None);
        };
        let Some(band) = column_value(market, today, &self.low_column)? else {
            return Ok(None);
        };

        if today.close() < band
            && Self::body(today) < 0.0
            && Self::body(yesterday) < 0.0
            && today.direction == TrendDirection::Sell
        {
            let price = today.close();
            let stop = price * (1.0 + self.config.stop_loss_pct / 100.0);
            return Ok(Some(EntrySignal::new(price).with_stop_loss(stop)));
        }
        Ok(None)
    }

    fn close_long_signal(&mut self, market: &dyn MarketView) -> Result<Option<ExitSignal>, StrategyError> {
        let (Some(today), Some(yesterday)) = (market.current(), market.previous(1)) else {
            return Ok(None);
        };
        let Some(band) = column_value(market, yesterday, &self.high_column)? else {
            return Ok(None);
        };

        if band > today.low() && Self::body(today) < 0.0 {
            return Ok(Some(ExitSignal::new(band, "ma_high_crossover")));
        }
        Ok(None)
    }

    fn close_short_signal(&mut self, market: &dyn MarketView) -> Result<Option<ExitSignal>, StrategyError> {
        let (Some(today), Some(yesterday)) = (market.current(), market.previous(1)) else {
            return Ok(None);
        };
        let Some(band) = column_value(market, yesterday, &self.low_column)? else {
            return Ok(None);
        };

        if today.high() > band && Self::body(today) > 0.0 {
            return Ok(Some(ExitSignal::new(band, "ma_low_crossover")));
        }
        Ok(None)
    }

    fn warmup_period(&self) -> usize {
        self.config.ma_period.max(self.config.supertrend_period) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trading_core::types::{Candle, EnrichedWindow};

    struct Row {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        band_high: f64,
        band_low: f64,
        direction: TrendDirection,
    }

    fn row(open: f64, close: f64, band_high: f64, band_low: f64, direction: TrendDirection) -> Row {
        Row {
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            band_high,
            band_low,
            direction,
        }
    }

    fn window(rows: &[Row]) -> EnrichedWindow {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut c = EnrichedCandle::new(Candle::new(i as i64, r.open, r.high, r.low, r.close, 1.0));
                c.values.insert("ma20high".into(), r.band_high);
                c.values.insert("ma20low".into(), r.band_low);
                c.values.insert(SUPERTREND_COLUMN.into(), 0.0);
                c.direction = r.direction;
                c
            })
            .collect();
        EnrichedWindow::new(
            vec!["ma20high".into(), "ma20low".into(), SUPERTREND_COLUMN.into()],
            rows,
        )
    }

    fn strategy() -> SuperTrendMaStrategy {
        SuperTrendMaStrategy::new(SuperTrendMaConfig::default())
    }

    #[test]
    fn test_config_validation() {
        assert!(SuperTrendMaConfig::default().validate().is_ok());

        let config = SuperTrendMaConfig {
            stop_loss_pct: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SuperTrendMaConfig {
            ma_period: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_indicator_list_matches_columns() {
        let config = SuperTrendMaConfig::default();
        let indicators = config.indicators();
        let names: Vec<&str> = indicators.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ma_high", "ma_low", "supertrend"]);
        assert_eq!(config.high_column(), "ma20high");
    }

    #[test]
    fn test_long_entry_needs_two_green_candles_and_uptrend() {
        let mut s = strategy();
        let market = window(&[
            row(100.0, 102.0, 101.0, 95.0, TrendDirection::Buy),
            row(102.0, 105.0, 103.0, 96.0, TrendDirection::Buy),
        ]);
        let signal = s.buy_signal(&market).unwrap().unwrap();
        assert_eq!(signal.price, 105.0);
        assert!((signal.stop_loss.unwrap() - 100.8).abs() < 1e-9);

        // Red previous candle
        let market = window(&[
            row(102.0, 100.0, 101.0, 95.0, TrendDirection::Buy),
            row(102.0, 105.0, 103.0, 96.0, TrendDirection::Buy),
        ]);
        assert_eq!(s.buy_signal(&market).unwrap(), None);

        // Downtrend
        let market = window(&[
            row(100.0, 102.0, 101.0, 95.0, TrendDirection::Buy),
            row(102.0, 105.0, 103.0, 96.0, TrendDirection::Sell),
        ]);
        assert_eq!(s.buy_signal(&market).unwrap(), None);
    }

    #[test]
    fn test_short_entry_and_long_only_switch() {
        let rows = [
            row(100.0, 98.0, 105.0, 99.0, TrendDirection::Sell),
            row(98.0, 95.0, 104.0, 97.0, TrendDirection::Sell),
        ];
        let signal = strategy().sell_signal(&window(&rows)).unwrap().unwrap();
        assert_eq!(signal.price, 95.0);
        assert!((signal.stop_loss.unwrap() - 98.8).abs() < 1e-9);

        let mut long_only = SuperTrendMaStrategy::new(SuperTrendMaConfig {
            allow_short: false,
            ..Default::default()
        });
        assert_eq!(long_only.sell_signal(&window(&rows)).unwrap(), None);
    }

    #[test]
    fn test_exits_use_previous_band() {
        let mut s = strategy();
        let market = window(&[
            row(104.0, 106.0, 103.0, 95.0, TrendDirection::Buy),
            row(105.0, 102.0, 104.0, 96.0, TrendDirection::Buy),
        ]);
        let exit = s.close_long_signal(&market).unwrap().unwrap();
        assert_eq!(exit.price, 103.0);
        assert_eq!(exit.reason, "ma_high_crossover");

        let market = window(&[
            row(96.0, 94.0, 105.0, 97.0, TrendDirection::Sell),
            row(95.0, 98.0, 104.0, 96.0, TrendDirection::Sell),
        ]);
        let exit = s.close_short_signal(&market).unwrap().unwrap();
        assert_eq!(exit.price, 97.0);
        assert_eq!(exit.reason, "ma_low_crossover");
    }

    #[test]
    fn test_single_candle_and_warmup_values() {
        let mut s = strategy();
        let market = window(&[row(100.0, 102.0, 101.0, 95.0, TrendDirection::Buy)]);
        assert_eq!(s.buy_signal(&market).unwrap(), None);
        assert_eq!(s.close_long_signal(&market).unwrap(), None);

        // Band column exists but has no value yet
        let mut market = window(&[
            row(100.0, 102.0, 101.0, 95.0, TrendDirection::Buy),
            row(102.0, 105.0, 103.0, 96.0, TrendDirection::Buy),
        ]);
        let rows: Vec<EnrichedCandle> = market
            .rows()
            .iter()
            .cloned()
            .map(|mut c| {
                c.values.remove("ma20high");
                c
            })
            .collect();
        market = EnrichedWindow::new(market.columns().to_vec(), rows);
        assert_eq!(s.buy_signal(&market).unwrap(), None);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let mut s = SuperTrendMaStrategy::new(SuperTrendMaConfig {
            ma_period: 50,
            ..Default::default()
        });
        let market = window(&[
            row(100.0, 102.0, 101.0, 95.0, TrendDirection::Buy),
            row(102.0, 105.0, 103.0, 96.0, TrendDirection::Buy),
        ]);
        assert!(matches!(
            s.buy_signal(&market),
            Err(StrategyError::MissingColumn(c)) if c == "ma50high"
        ));
    }
}

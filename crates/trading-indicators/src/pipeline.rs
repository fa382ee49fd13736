//! Configuration-driven indicator pipeline.
//!
//! A pipeline is an ordered list of transforms built from `{name, ...params}`
//! entries. Every transform is validated when the pipeline is built, so
//! [`IndicatorPipeline::process`] cannot fail.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use trading_core::error::ConfigError;
use trading_core::traits::{CandleIndicator, Indicator};
use trading_core::types::{Candle, EnrichedCandle, EnrichedWindow, TrendDirection, BASE_COLUMNS};

use crate::moving_average::{Ema, Sma};
use crate::supertrend::{SuperTrend, DEFAULT_MULTIPLIER, DEFAULT_PERIOD};

/// Output column of the SuperTrend value unless renamed.
pub const SUPERTREND_COLUMN: &str = "superTrend";
/// Column name under which SuperTrend direction is exported.
pub const SUPERTREND_DIRECTION_COLUMN: &str = "superTrendDirection";

const DEFAULT_BAND_PERIOD: usize = 20;

/// One `{name, ...params}` entry of the indicator list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub name: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl IndicatorConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter setter.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// Supported indicator names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    MaHigh,
    MaLow,
    Sma,
    Ema,
    SuperTrend,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 5] = [
        IndicatorKind::MaHigh,
        IndicatorKind::MaLow,
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::SuperTrend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::MaHigh => "ma_high",
            IndicatorKind::MaLow => "ma_low",
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::SuperTrend => "supertrend",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            IndicatorKind::MaHigh => "Rolling mean of highs (period=20) -> ma{period}high",
            IndicatorKind::MaLow => "Rolling mean of lows (period=20) -> ma{period}low",
            IndicatorKind::Sma => "Rolling mean of a column (period required, column=close) -> SMA_{period}",
            IndicatorKind::Ema => "Exponential mean of a column (period required, column=close) -> EMA_{period}",
            IndicatorKind::SuperTrend => "ATR trend bands (period=10, multiplier=3) -> superTrend, superTrendDirection",
        }
    }

    fn allowed_params(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::MaHigh | IndicatorKind::MaLow => &["period", "output_name", "custom_name"],
            IndicatorKind::Sma | IndicatorKind::Ema => &["period", "column", "output_name", "custom_name"],
            IndicatorKind::SuperTrend => &["period", "multiplier", "output_name", "custom_name"],
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IndicatorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownIndicator(s.to_string()))
    }
}

#[derive(Debug, Clone)]
enum Transform {
    RollingMean {
        source: String,
        indicator: Sma,
        output: String,
    },
    Ema {
        source: String,
        indicator: Ema,
        output: String,
    },
    SuperTrend {
        indicator: SuperTrend,
        output: String,
    },
}

impl Transform {
    fn output(&self) -> &str {
        match self {
            Transform::RollingMean { output, .. }
            | Transform::Ema { output, .. }
            | Transform::SuperTrend { output, .. } => output,
        }
    }

    fn period(&self) -> usize {
        match self {
            Transform::RollingMean { indicator, .. } => indicator.period(),
            Transform::Ema { indicator, .. } => Indicator::period(indicator),
            Transform::SuperTrend { indicator, .. } => indicator.period(),
        }
    }
}

/// Ordered indicator transforms applied to a whole candle window.
#[derive(Debug, Clone, Default)]
pub struct IndicatorPipeline {
    transforms: Vec<Transform>,
}

impl IndicatorPipeline {
    /// Build and validate a pipeline from configuration entries.
    pub fn new(configs: &[IndicatorConfig]) -> Result<Self, ConfigError> {
        let mut transforms: Vec<Transform> = Vec::with_capacity(configs.len());

        for config in configs {
            let transform = build_transform(config)?;
            if let Transform::RollingMean { source, .. } | Transform::Ema { source, .. } = &transform {
                let known = BASE_COLUMNS.contains(&source.as_str())
                    || transforms.iter().any(|t| t.output() == source);
                if !known {
                    return Err(ConfigError::UnknownColumn {
                        indicator: config.name.clone(),
                        column: source.clone(),
                    });
                }
            }
            transforms.push(transform);
        }

        Ok(Self { transforms })
    }

    /// Output column names in configured order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::with_capacity(self.transforms.len() + 1);
        for transform in &self.transforms {
            if !columns.iter().any(|c| c == transform.output()) {
                columns.push(transform.output().to_string());
            }
        }
        columns
    }

    /// Whether a SuperTrend transform is configured.
    pub fn has_supertrend(&self) -> bool {
        self.transforms
            .iter()
            .any(|t| matches!(t, Transform::SuperTrend { .. }))
    }

    /// Longest lookback of any transform.
    pub fn warmup_period(&self) -> usize {
        self.transforms.iter().map(Transform::period).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Recompute every configured column over the whole window.
    pub fn process(&self, candles: &[Candle]) -> EnrichedWindow {
        let mut table: HashMap<String, Vec<Option<f64>>> = HashMap::new();
        let mut directions = vec![TrendDirection::Unknown; candles.len()];

        for transform in &self.transforms {
            match transform {
                Transform::RollingMean {
                    source,
                    indicator,
                    output,
                } => {
                    let values = indicator.calculate(&source_series(candles, &table, source));
                    table.insert(output.clone(), values);
                }
                Transform::Ema {
                    source,
                    indicator,
                    output,
                } => {
                    let values = indicator.calculate(&source_series(candles, &table, source));
                    table.insert(output.clone(), values);
                }
                Transform::SuperTrend { indicator, output } => {
                    let points = indicator.calculate(candles);
                    for (slot, point) in directions.iter_mut().zip(&points) {
                        *slot = point.map(|p| p.direction).unwrap_or_default();
                    }
                    table.insert(output.clone(), points.iter().map(|p| p.map(|p| p.value)).collect());
                }
            }
        }

        let columns = self.columns();
        let rows = candles
            .iter()
            .enumerate()
            .map(|(i, candle)| {
                let mut row = EnrichedCandle::new(*candle);
                for column in &columns {
                    if let Some(value) = table.get(column).and_then(|values| values[i]) {
                        row.values.insert(column.clone(), value);
                    }
                }
                row.direction = directions[i];
                row
            })
            .collect();

        EnrichedWindow::new(columns, rows)
    }
}

fn source_series(
    candles: &[Candle],
    table: &HashMap<String, Vec<Option<f64>>>,
    source: &str,
) -> Vec<Option<f64>> {
    // Outputs shadow base columns of the same name, matching build order
    if let Some(values) = table.get(source) {
        return values.clone();
    }
    candles.iter().map(|c| c.column(source)).collect()
}

fn build_transform(config: &IndicatorConfig) -> Result<Transform, ConfigError> {
    let kind: IndicatorKind = config.name.parse()?;

    if let Some(unknown) = config
        .params
        .keys()
        .find(|key| !kind.allowed_params().contains(&key.as_str()))
    {
        return Err(invalid(config, unknown, "unsupported parameter"));
    }

    let output_name = match config.params.get("output_name") {
        Some(_) => string_param(config, "output_name")?,
        None => string_param(config, "custom_name")?,
    };

    let transform = match kind {
        IndicatorKind::MaHigh | IndicatorKind::MaLow => {
            let period = period_param(config)?.unwrap_or(DEFAULT_BAND_PERIOD);
            let (source, default_name) = if kind == IndicatorKind::MaHigh {
                ("high", format!("ma{}high", period))
            } else {
                ("low", format!("ma{}low", period))
            };
            Transform::RollingMean {
                source: source.to_string(),
                indicator: Sma::new(period),
                output: output_name.unwrap_or(default_name),
            }
        }
        IndicatorKind::Sma => {
            let period = period_param(config)?.ok_or_else(|| missing(config, "period"))?;
            Transform::RollingMean {
                source: string_param(config, "column")?.unwrap_or_else(|| "close".to_string()),
                indicator: Sma::new(period),
                output: output_name.unwrap_or_else(|| format!("SMA_{}", period)),
            }
        }
        IndicatorKind::Ema => {
            let period = period_param(config)?.ok_or_else(|| missing(config, "period"))?;
            Transform::Ema {
                source: string_param(config, "column")?.unwrap_or_else(|| "close".to_string()),
                indicator: Ema::new(period),
                output: output_name.unwrap_or_else(|| format!("EMA_{}", period)),
            }
        }
        IndicatorKind::SuperTrend => {
            let period = period_param(config)?.unwrap_or(DEFAULT_PERIOD);
            let multiplier = number_param(config, "multiplier")?.unwrap_or(DEFAULT_MULTIPLIER);
            if !(multiplier.is_finite() && multiplier > 0.0) {
                return Err(invalid(config, "multiplier", "must be a positive number"));
            }
            Transform::SuperTrend {
                indicator: SuperTrend::new(period, multiplier),
                output: output_name.unwrap_or_else(|| SUPERTREND_COLUMN.to_string()),
            }
        }
    };

    Ok(transform)
}

fn missing(config: &IndicatorConfig, parameter: &str) -> ConfigError {
    ConfigError::MissingParameter {
        indicator: config.name.clone(),
        parameter: parameter.to_string(),
    }
}

fn invalid(config: &IndicatorConfig, parameter: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        indicator: config.name.clone(),
        parameter: parameter.to_string(),
        reason: reason.to_string(),
    }
}

/// Numbers may arrive as JSON numbers or numeric strings (environment overrides).
fn number_param(config: &IndicatorConfig, key: &str) -> Result<Option<f64>, ConfigError> {
    let Some(value) = config.params.get(key) else {
        return Ok(None);
    };
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .map(Some)
        .ok_or_else(|| invalid(config, key, "expected a number"))
}

fn period_param(config: &IndicatorConfig) -> Result<Option<usize>, ConfigError> {
    let Some(period) = number_param(config, "period")? else {
        return Ok(None);
    };
    if period.fract() != 0.0 || period < 1.0 {
        return Err(invalid(config, "period", "must be a positive integer"));
    }
    Ok(Some(period as usize))
}

fn string_param(config: &IndicatorConfig, key: &str) -> Result<Option<String>, ConfigError> {
    match config.params.get(key) {
        None => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.trim().to_string())),
        Some(_) => Err(invalid(config, key, "expected a non-empty string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.4).sin() * 5.0;
                Candle::new(i as i64 * 60_000, c - 0.5, c + 1.0, c - 1.0, c, 10.0)
            })
            .collect()
    }

    fn default_configs() -> Vec<IndicatorConfig> {
        vec![
            IndicatorConfig::new("ma_high").with("period", 20),
            IndicatorConfig::new("ma_low").with("period", 20),
            IndicatorConfig::new("supertrend").with("period", 10).with("multiplier", 3),
            IndicatorConfig::new("ema").with("period", 50),
        ]
    }

    #[test]
    fn test_columns_in_configured_order() {
        let pipeline = IndicatorPipeline::new(&default_configs()).unwrap();
        assert_eq!(pipeline.columns(), vec!["ma20high", "ma20low", "superTrend", "EMA_50"]);
        assert!(pipeline.has_supertrend());
        assert_eq!(pipeline.warmup_period(), 50);
    }

    #[test]
    fn test_unknown_indicator_rejected() {
        let err = IndicatorPipeline::new(&[IndicatorConfig::new("rsi")]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownIndicator("rsi".into()));
    }

    #[test]
    fn test_ema_requires_period() {
        let err = IndicatorPipeline::new(&[IndicatorConfig::new("ema")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter { ref parameter, .. } if parameter == "period"));
    }

    #[test]
    fn test_invalid_parameters() {
        let zero = IndicatorConfig::new("ma_high").with("period", 0);
        assert!(matches!(
            IndicatorPipeline::new(&[zero]).unwrap_err(),
            ConfigError::InvalidParameter { .. }
        ));

        let text = IndicatorConfig::new("supertrend").with("multiplier", "three");
        assert!(IndicatorPipeline::new(&[text]).is_err());

        let typo = IndicatorConfig::new("ema").with("period", 5).with("peroid", 6);
        assert!(IndicatorPipeline::new(&[typo]).is_err());
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let config = IndicatorConfig::new("ema").with("period", "12");
        let pipeline = IndicatorPipeline::new(&[config]).unwrap();
        assert_eq!(pipeline.columns(), vec!["EMA_12"]);
    }

    #[test]
    fn test_ema_column_must_exist_earlier() {
        let later = vec![
            IndicatorConfig::new("ema").with("period", 5).with("column", "ma20high"),
            IndicatorConfig::new("ma_high"),
        ];
        assert!(matches!(
            IndicatorPipeline::new(&later).unwrap_err(),
            ConfigError::UnknownColumn { .. }
        ));

        let chained = vec![
            IndicatorConfig::new("ma_high"),
            IndicatorConfig::new("ema")
                .with("period", 5)
                .with("column", "ma20high")
                .with("output_name", "smooth_high"),
        ];
        let pipeline = IndicatorPipeline::new(&chained).unwrap();
        let window = pipeline.process(&candles(30));

        // EMA seeds on the first defined rolling mean
        assert!(window.rows()[18].get("smooth_high").is_none());
        assert_eq!(
            window.rows()[19].get("smooth_high"),
            window.rows()[19].get("ma20high")
        );
        assert!(window.rows()[29].get("smooth_high").is_some());
    }

    #[test]
    fn test_warmup_values_absent() {
        let pipeline = IndicatorPipeline::new(&default_configs()).unwrap();
        let window = pipeline.process(&candles(25));

        assert_eq!(window.len(), 25);
        assert!(window.rows()[18].get("ma20high").is_none());
        assert!(window.rows()[19].get("ma20high").is_some());
        // EMA and SuperTrend are defined from the first row
        assert!(window.rows()[0].get("EMA_50").is_some());
        assert!(window.rows()[0].get("superTrend").is_some());
        assert_ne!(window.rows()[0].direction, TrendDirection::Unknown);
    }

    #[test]
    fn test_custom_name_alias() {
        let config = IndicatorConfig::new("supertrend").with("custom_name", "st");
        let pipeline = IndicatorPipeline::new(&[config]).unwrap();
        assert_eq!(pipeline.columns(), vec!["st"]);
    }

    #[test]
    fn test_process_is_idempotent() {
        let pipeline = IndicatorPipeline::new(&default_configs()).unwrap();
        let data = candles(120);
        let first = serde_json::to_string(&pipeline.process(&data)).unwrap();
        let second = serde_json::to_string(&pipeline.process(&data)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_look_ahead_across_pipeline() {
        let pipeline = IndicatorPipeline::new(&default_configs()).unwrap();
        let mut data = candles(80);
        let before = pipeline.process(&data[..60]);

        // Rewrite the future: earlier rows must not change
        for c in data.iter_mut().skip(60) {
            c.close *= 3.0;
            c.high *= 3.0;
        }
        let after = pipeline.process(&data);
        assert_eq!(before.rows(), &after.rows()[..60]);
    }

    #[test]
    fn test_config_deserializes_flattened_params() {
        let json = r#"[{"name": "ema", "period": 20, "column": "high"}, {"name": "supertrend"}]"#;
        let configs: Vec<IndicatorConfig> = serde_json::from_str(json).unwrap();
        assert_eq!(configs[0].params.get("column"), Some(&Value::from("high")));
        let pipeline = IndicatorPipeline::new(&configs).unwrap();
        assert_eq!(pipeline.columns(), vec!["EMA_20", "superTrend"]);
    }
}

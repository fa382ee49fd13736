//! Candle timeframes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Candle interval, serialized with exchange-style labels ("1m", "4h", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "3m")]
    Minute3,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    #[default]
    Hour1,
    #[serde(rename = "2h")]
    Hour2,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "12h")]
    Hour12,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl Timeframe {
    /// Interval length in seconds.
    pub fn as_secs(&self) -> i64 {
        match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute3 => 180,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Minute30 => 1_800,
            Timeframe::Hour1 => 3_600,
            Timeframe::Hour2 => 7_200,
            Timeframe::Hour4 => 14_400,
            Timeframe::Hour12 => 43_200,
            Timeframe::Day1 => 86_400,
            Timeframe::Week1 => 604_800,
        }
    }

    /// Interval length in milliseconds.
    pub fn as_millis(&self) -> i64 {
        self.as_secs() * 1_000
    }

    /// Open time of the candle containing `timestamp_ms`.
    pub fn align(&self, timestamp_ms: i64) -> i64 {
        timestamp_ms - timestamp_ms.rem_euclid(self.as_millis())
    }

    /// Number of whole candles missing between two consecutive open times.
    pub fn missing_between(&self, previous_ms: i64, next_ms: i64) -> i64 {
        ((next_ms - previous_ms) / self.as_millis() - 1).max(0)
    }

    /// Label used in file names and on the wire.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute3 => "3m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour2 => "2h",
            Timeframe::Hour4 => "4h",
            Timeframe::Hour12 => "12h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "1min" => Ok(Timeframe::Minute1),
            "3m" | "3min" => Ok(Timeframe::Minute3),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "30m" | "30min" => Ok(Timeframe::Minute30),
            "1h" | "hour" => Ok(Timeframe::Hour1),
            "2h" => Ok(Timeframe::Hour2),
            "4h" => Ok(Timeframe::Hour4),
            "12h" => Ok(Timeframe::Hour12),
            "1d" | "day" | "daily" => Ok(Timeframe::Day1),
            "1w" | "week" | "weekly" => Ok(Timeframe::Week1),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}

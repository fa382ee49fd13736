//! CSV candle source.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use trading_core::error::DataError;
use trading_core::types::{Candle, Timeframe};

/// CSV record format.
///
/// Accepts exchange dumps (`timestamp` in unix ms or s), spreadsheet exports
/// (`Date`) and the raw tables this crate writes (`timestamp` + `datetime`).
/// Extra columns such as indicator outputs are ignored.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Timestamp", alias = "Date", alias = "date", alias = "time", default)]
    timestamp: Option<String>,
    #[serde(alias = "Datetime", default)]
    datetime: Option<String>,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

/// CSV file of historical candles.
pub struct CsvCandleSource {
    path: PathBuf,
}

impl CsvCandleSource {
    /// Create a new CSV source; the file must exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Load every candle, sorted by timestamp.
    pub fn load_all(&self) -> Result<Vec<Candle>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut candles = Vec::new();

        for (line, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(format!("row {}: {}", line + 1, e)))?;

            let stamp = record
                .timestamp
                .as_deref()
                .filter(|s| !s.is_empty())
                .or(record.datetime.as_deref())
                .ok_or_else(|| DataError::ParseError(format!("row {}: no timestamp column", line + 1)))?;
            let timestamp = parse_timestamp(stamp)?;

            candles.push(Candle::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }

        candles.sort_by_key(|c| c.timestamp);
        debug!(path = %self.path.display(), rows = candles.len(), "loaded candles");

        Ok(candles)
    }

    /// Load candles whose open time falls in `[start, end]`.
    pub fn load_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>, DataError> {
        let start = start.map(|d| d.timestamp_millis()).unwrap_or(i64::MIN);
        let end = end.map(|d| d.timestamp_millis()).unwrap_or(i64::MAX);
        let candles: Vec<Candle> = self
            .load_all()?
            .into_iter()
            .filter(|c| c.timestamp >= start && c.timestamp <= end)
            .collect();

        if candles.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(candles)
    }
}

/// Parse the timestamp formats found in candle dumps.
pub fn parse_timestamp(value: &str) -> Result<i64, DataError> {
    let value = value.trim();

    // Unix timestamp; more than 10 digits means milliseconds
    if let Ok(ts) = value.parse::<i64>() {
        return Ok(if ts.abs() > 10_000_000_000 { ts } else { ts * 1000 });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y/%m/%d %H:%M:%S"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc().timestamp_millis());
            }
        }
    }

    Err(DataError::ParseError(format!("Could not parse date: {}", value)))
}

/// Count missing candles between consecutive rows; logs each gap.
///
/// Gaps are tolerated, never filled.
pub fn count_gaps(candles: &[Candle], timeframe: Timeframe) -> i64 {
    candles
        .windows(2)
        .map(|pair| {
            let missing = timeframe.missing_between(pair[0].timestamp, pair[1].timestamp);
            if missing > 0 {
                warn!(
                    after = %pair[0].datetime(),
                    missing,
                    "gap in candle data"
                );
            }
            missing
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2024-01-01").unwrap(), 1_704_067_200_000);
        assert_eq!(parse_timestamp("2024-01-01 01:00:00").unwrap(), 1_704_070_800_000);
        assert_eq!(parse_timestamp("2024-01-01T01:00:00+00:00").unwrap(), 1_704_070_800_000);
        assert_eq!(parse_timestamp("1704067200000").unwrap(), 1_704_067_200_000); // Unix ms
        assert_eq!(parse_timestamp("1704067200").unwrap(), 1_704_067_200_000); // Unix sec
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_sorts_and_ignores_extra_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,datetime,open,high,low,close,volume,EMA_5").unwrap();
        writeln!(file, "1704070800000,2024-01-01T01:00:00+00:00,2,3,1,2.5,10,2.1").unwrap();
        writeln!(file, "1704067200000,2024-01-01T00:00:00+00:00,1,2,0.5,1.5,12,").unwrap();

        let candles = CsvCandleSource::new(file.path()).unwrap().load_all().unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1_704_067_200_000);
        assert_eq!(candles[1].close, 2.5);
    }

    #[test]
    fn test_spreadsheet_headers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Open,High,Low,Close,Volume").unwrap();
        writeln!(file, "2024-01-02,10,11,9,10.5,100").unwrap();
        writeln!(file, "2024-01-03,10.5,12,10,11.5,100").unwrap();

        let source = CsvCandleSource::new(file.path()).unwrap();
        let start = DateTime::parse_from_rfc3339("2024-01-03T00:00:00Z").unwrap().with_timezone(&Utc);
        let candles = source.load_range(Some(start), None).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].high, 12.0);

        let end = DateTime::parse_from_rfc3339("2023-12-31T00:00:00Z").unwrap().with_timezone(&Utc);
        assert!(matches!(source.load_range(None, Some(end)), Err(DataError::NoDataAvailable)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CsvCandleSource::new("/definitely/not/here.csv"),
            Err(DataError::NoDataAvailable)
        ));
    }

    #[test]
    fn test_count_gaps() {
        let c = |ts: i64| Candle::new(ts, 1.0, 1.0, 1.0, 1.0, 1.0);
        let candles = [c(0), c(60_000), c(240_000), c(300_000)];
        assert_eq!(count_gaps(&candles, Timeframe::Minute1), 2);
    }
}

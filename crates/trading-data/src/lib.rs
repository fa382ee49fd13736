//! Candle feeds and file storage.
//!
//! - [`HistoricalFeed`] replays a loaded table for backtests
//! - [`LiveFeed`] follows a venue subscription for paper and live runs
//! - [`FileStore`] persists raw, processed, result and summary artifacts

mod csv_source;
mod historical;
mod live;
mod store;

pub use csv_source::{count_gaps, parse_timestamp, CsvCandleSource};
pub use historical::HistoricalFeed;
pub use live::{LiveFeed, LiveFeedConfig};
pub use store::{file_stem, CandleRow, DataKind, FileCandleLog, FileStore, RunMode};

use chrono::{DateTime, Utc};
use std::path::Path;
use trading_core::error::DataError;
use trading_core::types::Candle;

/// Load candles from a CSV file, optionally limited to `[start, end]`.
pub fn load_csv(
    path: impl AsRef<Path>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<Candle>, DataError> {
    let source = CsvCandleSource::new(path)?;
    if start.is_none() && end.is_none() {
        let candles = source.load_all()?;
        if candles.is_empty() {
            return Err(DataError::NoDataAvailable);
        }
        return Ok(candles);
    }
    source.load_range(start, end)
}

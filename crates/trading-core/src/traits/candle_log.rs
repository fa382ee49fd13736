//! Durable raw candle log.

use crate::error::DataError;
use crate::types::Candle;

/// Append-only sink for accepted raw candles.
///
/// `append` returns only after the candle is flushed, so a caller that
/// sees `Ok` may fold the candle into its window.
pub trait CandleLog: Send + Sync {
    fn append(&mut self, candle: &Candle) -> Result<(), DataError>;
}

/// A log that keeps candles in memory; used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryCandleLog {
    pub candles: Vec<Candle>,
}

impl CandleLog for MemoryCandleLog {
    fn append(&mut self, candle: &Candle) -> Result<(), DataError> {
        self.candles.push(*candle);
        Ok(())
    }
}

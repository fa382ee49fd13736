//! File-backed persistence for raw candles, processed windows, trade
//! tables and run summaries.
//!
//! Layout: `<base>/<mode>/<kind>/<symbol>_<timeframe>_<label>.<csv|json>`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;
use trading_core::error::DataError;
use trading_core::traits::CandleLog;
use trading_core::types::{Candle, EnrichedWindow, Timeframe, BASE_COLUMNS};
use trading_indicators::SUPERTREND_DIRECTION_COLUMN;

/// Which run produced the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Backtest,
    Paper,
    Live,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Backtest => write!(f, "backtest"),
            RunMode::Paper => write!(f, "paper"),
            RunMode::Live => write!(f, "live"),
        }
    }
}

/// Kind of artifact stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Raw,
    Processed,
    Result,
    Summary,
}

impl DataKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            DataKind::Raw => "raw",
            DataKind::Processed => "processed",
            DataKind::Result => "result",
            DataKind::Summary => "summary",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DataKind::Summary => "json",
            _ => "csv",
        }
    }
}

/// Row of a raw candle table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRow {
    pub timestamp: i64,
    pub datetime: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<&Candle> for CandleRow {
    fn from(c: &Candle) -> Self {
        Self {
            timestamp: c.timestamp,
            datetime: c.datetime().to_rfc3339(),
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
        }
    }
}

impl From<&CandleRow> for Candle {
    fn from(row: &CandleRow) -> Self {
        Candle::new(row.timestamp, row.open, row.high, row.low, row.close, row.volume)
    }
}

/// CSV/JSON store for one symbol, timeframe and run.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    stem: String,
}

impl FileStore {
    /// `label` distinguishes runs over the same market, e.g. `"all_2024"`.
    pub fn new(
        base_dir: impl AsRef<Path>,
        mode: RunMode,
        symbol: &str,
        timeframe: Timeframe,
        label: &str,
    ) -> Self {
        Self {
            root: base_dir.as_ref().join(mode.to_string()),
            stem: file_stem(symbol, timeframe, label),
        }
    }

    /// Path of an artifact.
    pub fn path(&self, kind: DataKind) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{}.{}", self.stem, kind.extension()))
    }

    fn prepare(&self, kind: DataKind) -> Result<PathBuf, DataError> {
        let path = self.path(kind);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    /// Overwrite a table.
    pub fn save_table<T: Serialize>(&self, kind: DataKind, rows: &[T]) -> Result<(), DataError> {
        let path = self.prepare(kind)?;
        let mut writer = csv::Writer::from_path(&path).map_err(storage_error)?;
        for row in rows {
            writer.serialize(row).map_err(storage_error)?;
        }
        writer.flush()?;
        debug!(path = %path.display(), rows = rows.len(), "table saved");
        Ok(())
    }

    /// Append rows to a table, writing the header only for a new file.
    pub fn append_rows<T: Serialize>(&self, kind: DataKind, rows: &[T]) -> Result<(), DataError> {
        let path = self.prepare(kind)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(&mut file);
        for row in rows {
            writer.serialize(row).map_err(storage_error)?;
        }
        writer.flush()?;
        drop(writer);
        file.sync_data()?;
        Ok(())
    }

    /// Load a table; a missing file is an empty table.
    pub fn load_table<T: DeserializeOwned>(&self, kind: DataKind) -> Result<Vec<T>, DataError> {
        let path = self.path(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path).map_err(storage_error)?;
        reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| DataError::ParseError(e.to_string()))
    }

    /// Overwrite the processed table with an enriched window.
    ///
    /// Indicator columns follow the base columns in pipeline order; values
    /// still warming up are left empty.
    pub fn save_enriched(&self, window: &EnrichedWindow) -> Result<(), DataError> {
        let path = self.prepare(DataKind::Processed)?;
        let mut writer = csv::Writer::from_path(&path).map_err(storage_error)?;

        let mut header: Vec<&str> = vec!["timestamp", "datetime"];
        header.extend(BASE_COLUMNS);
        header.extend(window.columns().iter().map(String::as_str));
        header.push(SUPERTREND_DIRECTION_COLUMN);
        writer.write_record(&header).map_err(storage_error)?;

        for row in window.rows() {
            let c = &row.candle;
            let mut record = vec![
                c.timestamp.to_string(),
                c.datetime().to_rfc3339(),
                c.open.to_string(),
                c.high.to_string(),
                c.low.to_string(),
                c.close.to_string(),
                c.volume.to_string(),
            ];
            for column in window.columns() {
                record.push(row.values.get(column).map(f64::to_string).unwrap_or_default());
            }
            record.push(row.direction.to_string());
            writer.write_record(&record).map_err(storage_error)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Overwrite a JSON document.
    pub fn save_document<T: Serialize>(&self, kind: DataKind, document: &T) -> Result<(), DataError> {
        let path = self.prepare(kind)?;
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| DataError::Storage(e.to_string()))?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "document saved");
        Ok(())
    }

    /// Load a JSON document; a missing file is `None`.
    pub fn load_document<T: DeserializeOwned>(&self, kind: DataKind) -> Result<Option<T>, DataError> {
        let path = self.path(kind);
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&path)?);
        serde_json::from_reader(reader)
            .map(Some)
            .map_err(|e| DataError::ParseError(e.to_string()))
    }

    /// Append-only raw candle log backed by this store.
    pub fn raw_log(&self) -> FileCandleLog {
        FileCandleLog { store: self.clone() }
    }
}

/// Raw candle log that appends and syncs each candle to the raw table.
#[derive(Debug, Clone)]
pub struct FileCandleLog {
    store: FileStore,
}

impl CandleLog for FileCandleLog {
    fn append(&mut self, candle: &Candle) -> Result<(), DataError> {
        self.store.append_rows(DataKind::Raw, &[CandleRow::from(candle)])
    }
}

/// `{symbol without '/', lowercase}_{timeframe}_{label}`
pub fn file_stem(symbol: &str, timeframe: Timeframe, label: &str) -> String {
    let symbol: String = symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    format!("{}_{}_{}", symbol, timeframe, label)
}

fn storage_error(err: csv::Error) -> DataError {
    DataError::Storage(err.to_string())
}

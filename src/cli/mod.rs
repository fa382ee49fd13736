//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use trading_core::types::Timeframe;

#[derive(Parser)]
#[command(name = "trading")]
#[command(author, version, about = "Candle-driven strategy backtester and paper trader")]
pub struct Cli {
    /// Configuration file path (TOML or YAML); defaults plus TRADING__* env when absent
    #[arg(short, long, env = "TRADING_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level; overrides the configured one
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a backtest over a CSV candle table
    Backtest(BacktestArgs),
    /// Backtest every configured symbol, timeframe and period, saving each run
    Sweep(SweepArgs),
    /// Replay a CSV through the live path against a paper venue
    Paper(PaperArgs),
    /// List available strategies
    Strategies,
    /// List available indicators
    Indicators,
    /// Validate configuration and print the effective settings
    ValidateConfig,
}

/// Settings shared by every run command; each overrides the config file.
#[derive(clap::Args)]
pub struct RunArgs {
    /// Candle CSV file
    #[arg(short, long)]
    pub data: PathBuf,

    /// Strategy to run
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Strategy parameters as JSON, e.g. '{"ma_period": 30}'
    #[arg(long)]
    pub params: Option<String>,

    /// Market symbol used for order routing and file names
    #[arg(short = 'S', long)]
    pub symbol: Option<String>,

    /// Timeframe
    #[arg(short, long)]
    pub timeframe: Option<Timeframe>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save trades, summary and the processed table under the storage directory
    #[arg(long)]
    pub save: bool,
}

#[derive(clap::Args)]
pub struct SweepArgs {
    /// Strategy to run
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Strategy parameters as JSON
    #[arg(long)]
    pub params: Option<String>,

    /// Initial capital for every run
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Directory of candle CSVs; overrides backtest.data_dir
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Start date (YYYY-MM-DD, RFC 3339 or unix time)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD, RFC 3339 or unix time)
    #[arg(long)]
    pub end: Option<String>,
}

#[derive(clap::Args)]
pub struct PaperArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Candles served as history before streaming starts
    #[arg(long)]
    pub history: Option<usize>,

    /// Delay between streamed candles, in milliseconds
    #[arg(long, default_value = "0")]
    pub delay_ms: u64,

    /// Fill slippage in percent
    #[arg(long, default_value = "0")]
    pub slippage: Decimal,

    /// Refuse entries the simulated cash balance cannot cover
    #[arg(long)]
    pub funds_check: bool,
}

//! Error types for the trading system.

use thiserror::Error;

/// Top-level trading system error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Whether a live loop may retry after this error.
    ///
    /// Venue outages and data failures are transient; rejected orders,
    /// configuration and strategy failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            TradingError::Venue(err) => err.is_transient(),
            TradingError::Data(err) => err.is_transient(),
            TradingError::Io(_) => true,
            _ => false,
        }
    }
}

/// Setup-time configuration errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown indicator: {0}")]
    UnknownIndicator(String),

    #[error("Indicator '{indicator}' is missing required parameter '{parameter}'")]
    MissingParameter { indicator: String, parameter: String },

    #[error("Indicator '{indicator}' has invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        indicator: String,
        parameter: String,
        reason: String,
    },

    #[error("Indicator '{indicator}' reads column '{column}' which is not available")]
    UnknownColumn { indicator: String, column: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Column '{0}' is not present in the enriched window")]
    MissingColumn(String),

    #[error("Strategy evaluation failed: {0}")]
    Evaluation(String),
}

/// Trading venue errors.
#[derive(Error, Debug)]
pub enum VenueError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),
}

impl VenueError {
    /// Whether the same request may succeed later. Rejections are final.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            VenueError::Connection(_) | VenueError::RateLimited { .. } | VenueError::Stream(_) | VenueError::Api(_)
        )
    }
}

/// Data source and persistence errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Data source error: {0}")]
    Internal(String),
}

impl DataError {
    /// Whether retrying the same read may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DataError::Io(_) | DataError::Venue(_) | DataError::Storage(_))
    }
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;

use std::path::PathBuf;
use thiserror::Error;

/// Input rejected before a backtest starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BacktestError {
    #[error("initial capital must be positive and finite (value: {0})")]
    InvalidCapital(f64),
    #[error("position size fraction must be in (0, 1] (value: {0})")]
    InvalidPositionSize(f64),
    #[error("bar {index} timestamp is not after the previous bar")]
    NonIncreasingTimestamp { index: usize },
    #[error("bar {index} has invalid {field} (value: {value})")]
    InvalidBar {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error("setting {key} is invalid: {reason}")]
    InvalidSetting { key: String, reason: String },
}

/// Failures of the market-data boundary. Raised before the engine runs.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read market data from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse market data in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("no bars available in {0}")]
    Empty(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
    #[error("invalid order for {symbol}: {reason}")]
    InvalidOrder { symbol: String, reason: String },
    #[error("insufficient funds: required {required:.2}, available {available:.2}")]
    InsufficientFunds { required: f64, available: f64 },
    #[error("position {0} does not exist")]
    UnknownPosition(String),
    #[error("insufficient quantity for {symbol}: requested {requested}, held {held}")]
    InsufficientQuantity {
        symbol: String,
        requested: f64,
        held: f64,
    },
}

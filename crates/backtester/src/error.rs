// In crates/backtester/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid backtest settings: {0}")]
    InvalidSettings(String),

    #[error("Signal error: {0}")]
    Signal(#[from] strategies::Error),

    #[error("Cannot backtest {symbol}: the candle series is empty")]
    EmptySeries { symbol: String },
}

pub type Result<T> = std::result::Result<T, Error>;

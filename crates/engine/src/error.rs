// In crates/engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
    #[error("No enabled assets to trade")]
    NoAssets,
    #[error("No candles returned for {0}")]
    NoCandles(String),
    #[error("Signal error: {0}")]
    Signal(#[from] strategies::Error),
    #[error("Risk error: {0}")]
    Risk(#[from] risk::Error),
    #[error("Market data error: {0}")]
    MarketData(#[from] api_client::Error),
    #[error("Execution error: {0}")]
    Execution(#[from] execution::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

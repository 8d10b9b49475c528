// In crates/core-types/src/error.rs

use thiserror::Error;

/// Errors raised while building the core data structures.
///
/// Every variant describes bad input data; none of them is recoverable by retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed kline at index {index}: {reason}")]
    MalformedKline { index: usize, reason: String },

    #[error("Klines out of order at index {index}: open time {current} does not follow {previous}")]
    OutOfOrder {
        index: usize,
        previous: i64,
        current: i64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

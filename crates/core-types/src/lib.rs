// In crates/core-types/src/lib.rs

pub mod error;
pub mod kline;
pub mod signal;
pub mod types;

// Re-export the most important types for easy access from other crates.
pub use error::{Error, Result};
pub use kline::{CandleSeries, Kline};
pub use signal::SignalState;
pub use types::{Execution, OrderRequest, PositionInfo, Symbol};

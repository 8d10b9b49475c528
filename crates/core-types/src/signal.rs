// In crates/core-types/src/signal.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The rolling-low signal evaluated at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalState {
    /// Open time of the bar this state belongs to (ms since epoch).
    pub open_time: i64,
    /// Close of the bar.
    pub close: Decimal,
    /// Minimum low over the trailing window, including this bar.
    pub window_low: Decimal,
    /// `window_low * (1 + range_pct / 100)`.
    pub buy_range_upper: Decimal,
    /// `(close - window_low) / window_low * 100`. May be slightly negative.
    pub distance_pct: Decimal,
    /// `window_low <= close <= buy_range_upper`.
    pub in_range: bool,
}

// In crates/strategies/src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RollingLowSettings {
    /// Number of bars in the trailing window (1440 = 24h of 1m candles).
    pub window_size: usize,
    /// Width of the buy range above the window low, in percent.
    pub range_pct: f64,
    /// Candle interval the window is measured in, e.g. "1m".
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_interval() -> String {
    "1m".to_string()
}

impl Default for RollingLowSettings {
    fn default() -> Self {
        Self {
            window_size: 1440,
            range_pct: 0.05,
            interval: default_interval(),
        }
    }
}

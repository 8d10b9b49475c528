// In crates/strategies/src/lib.rs

pub mod analysis;
pub mod error;
pub mod rolling_low;
pub mod types;

pub use analysis::{SignalStrength, SignalType, WindowAnalysis};
pub use error::{Error, Result};
pub use rolling_low::{RollingLowIter, RollingLowSignal};
pub use types::RollingLowSettings;

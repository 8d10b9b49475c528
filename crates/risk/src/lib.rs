// In crates/risk/src/lib.rs

use chrono::{DateTime, Utc};
use core_types::{SignalState, Symbol};

pub mod buy_block;
pub mod decision;
pub mod error;
pub mod types;

// Re-export public types
pub use buy_block::BuyBlockState;
pub use decision::{Action, Decision, GateStatus, LiveDecisionEngine, NoneReason, PositionExposure};
pub use error::{Error, Result};
pub use types::BuyGateSettings;

/// The universal interface for a risk management module.
///
/// A `RiskManager` turns a fresh signal snapshot plus the account's exposure and
/// buy history into a `Decision`. It is pure: all mutable state is passed in, and
/// recording a confirmed buy is the caller's job.
pub trait RiskManager: Send + Sync {
    /// The name of the risk management strategy.
    fn name(&self) -> &'static str;

    /// Capacity and time gates for `symbol`, independent of any signal.
    fn gate_status(
        &self,
        symbol: &Symbol,
        exposure: &PositionExposure,
        blocks: &BuyBlockState,
        now: DateTime<Utc>,
    ) -> GateStatus;

    /// Decides whether to buy `symbol` now.
    fn decide(
        &self,
        symbol: &Symbol,
        signal: &SignalState,
        exposure: &PositionExposure,
        blocks: &BuyBlockState,
        now: DateTime<Utc>,
    ) -> Decision;
}

// In crates/backtester/src/lib.rs

pub mod accumulation;
pub mod error;
pub mod report;
pub mod round_trip;
pub mod schedule;
pub mod sweep;
pub mod types;

pub use accumulation::{
    AccumulationBacktest, AccumulationLedger, AccumulationReport, DailySummary, LedgerEntry,
};
pub use error::{Error, Result};
pub use report::PortfolioSummary;
pub use round_trip::{OpenPosition, RoundTripBacktest, RoundTripReport};
pub use schedule::CheckSchedule;
pub use sweep::{RangeSweep, SweepReport};
pub use types::{AccumulationSettings, RoundTripSettings, SweepSettings};

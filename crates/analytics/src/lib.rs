// In crates/analytics/src/lib.rs

pub mod engine;
pub mod market;
pub mod types;

pub use engine::AnalyticsEngine;
pub use market::MarketStats;
pub use types::{EquityPoint, ExitReason, PerformanceReport, Trade};

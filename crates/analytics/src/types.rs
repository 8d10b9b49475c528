// In crates/analytics/src/types.rs

use core_types::Symbol;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::TakeProfit => write!(f, "TAKE_PROFIT"),
            ExitReason::StopLoss => write!(f, "STOP_LOSS"),
        }
    }
}

/// A closed round trip, from entry to exit. Times are ms since the epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub symbol: Symbol,
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub profit_loss: Decimal,
    pub profit_pct: Decimal,
    pub exit_reason: ExitReason,
}

/// A point on the realized equity curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub value: Decimal,
}

/// Summary statistics over a list of closed trades.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PerformanceReport {
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub take_profit_exits: u32,
    pub stop_loss_exits: u32,

    pub net_pnl_absolute: Decimal,
    pub net_pnl_percentage: f64,
    pub win_rate: f64,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub profit_factor: f64,
    pub expectancy: Decimal,

    pub max_drawdown_absolute: Decimal,
    pub max_drawdown_percentage: f64,
    pub avg_trade_duration_secs: f64,
}

impl PerformanceReport {
    pub fn new() -> Self {
        Self::default()
    }
}

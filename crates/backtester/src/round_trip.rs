// In crates/backtester/src/round_trip.rs

use crate::schedule::CheckSchedule;
use crate::types::{RoundTripSettings, to_decimal};
use crate::{Error, Result};
use analytics::{AnalyticsEngine, ExitReason, MarketStats, PerformanceReport, Trade};
use core_types::{CandleSeries, SignalState, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use strategies::RollingLowSignal;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Position {
    Flat,
    Long {
        entry_price: Decimal,
        quantity: Decimal,
        entry_time: i64,
    },
}

/// A position still open when the series ran out, marked at the last close.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenPosition {
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub entry_time: i64,
    pub mark_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTripReport {
    pub symbol: Symbol,
    pub starting_capital: Decimal,
    /// Starting capital plus realized P&L.
    pub realized_equity: Decimal,
    /// Realized equity plus the unrealized P&L of any open position.
    pub final_value: Decimal,
    pub total_return: Decimal,
    pub return_pct: Decimal,
    pub trades: Vec<Trade>,
    pub open_position: Option<OpenPosition>,
    pub performance: PerformanceReport,
    pub market: Option<MarketStats>,
}

/// Replays a series through the signal with one take-profit / stop-loss position at a time.
#[derive(Debug, Clone)]
pub struct RoundTripBacktest {
    symbol: Symbol,
    signal: RollingLowSignal,
    position_size: Decimal,
    take_profit_pct: Decimal,
    stop_loss_pct: Decimal,
    reinvest_proceeds: bool,
    check_interval_secs: u64,
}

impl RoundTripBacktest {
    pub fn new(symbol: Symbol, signal: RollingLowSignal, settings: &RoundTripSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            symbol,
            signal,
            position_size: to_decimal("position_size_usd", settings.position_size_usd)?,
            take_profit_pct: to_decimal("take_profit_pct", settings.take_profit_pct)?,
            stop_loss_pct: to_decimal("stop_loss_pct", settings.stop_loss_pct)?,
            reinvest_proceeds: settings.reinvest_proceeds,
            check_interval_secs: settings.check_interval_secs,
        })
    }

    pub fn run(&self, series: &CandleSeries) -> Result<RoundTripReport> {
        let last = series.last().ok_or_else(|| Error::EmptySeries {
            symbol: self.symbol.to_string(),
        })?;

        let states: Vec<SignalState> = self.signal.compute(series);
        let mut schedule = CheckSchedule::new(self.check_interval_secs);
        let mut position = Position::Flat;
        let mut realized_equity = self.position_size;
        let mut trades = Vec::new();
        let mut entries = Vec::new();

        for state in &states {
            if !schedule.is_boundary(state.open_time) {
                continue;
            }

            match position {
                Position::Flat => {
                    if !state.in_range {
                        continue;
                    }
                    let stake = if self.reinvest_proceeds {
                        realized_equity
                    } else {
                        self.position_size
                    };
                    if stake <= Decimal::ZERO {
                        continue;
                    }
                    let quantity = stake / state.close;
                    debug!(
                        symbol = %self.symbol,
                        time = state.open_time,
                        price = %state.close,
                        window_low = %state.window_low,
                        distance_pct = %state.distance_pct.round_dp(4),
                        "Entry"
                    );
                    position = Position::Long {
                        entry_price: state.close,
                        quantity,
                        entry_time: state.open_time,
                    };
                    entries.push(*state);
                }
                Position::Long {
                    entry_price,
                    quantity,
                    entry_time,
                } => {
                    let profit_pct = (state.close - entry_price) / entry_price * dec!(100);
                    let exit_reason = if profit_pct >= self.take_profit_pct {
                        ExitReason::TakeProfit
                    } else if profit_pct <= -self.stop_loss_pct {
                        ExitReason::StopLoss
                    } else {
                        continue;
                    };

                    let profit_loss = quantity * (state.close - entry_price);
                    realized_equity += profit_loss;
                    debug!(
                        symbol = %self.symbol,
                        time = state.open_time,
                        price = %state.close,
                        reason = %exit_reason,
                        pnl = %profit_loss.round_dp(2),
                        "Exit"
                    );
                    trades.push(Trade {
                        symbol: self.symbol.clone(),
                        entry_time,
                        exit_time: state.open_time,
                        entry_price,
                        exit_price: state.close,
                        quantity,
                        profit_loss,
                        profit_pct,
                        exit_reason,
                    });
                    position = Position::Flat;
                }
            }
        }

        let open_position = match position {
            Position::Flat => None,
            Position::Long {
                entry_price,
                quantity,
                entry_time,
            } => {
                let market_value = quantity * last.close;
                Some(OpenPosition {
                    entry_price,
                    quantity,
                    entry_time,
                    mark_price: last.close,
                    market_value,
                    unrealized_pnl: market_value - quantity * entry_price,
                    unrealized_pct: (last.close - entry_price) / entry_price * dec!(100),
                })
            }
        };

        let unrealized = open_position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.unrealized_pnl);
        let final_value = realized_equity + unrealized;
        let total_return = final_value - self.position_size;
        let performance = AnalyticsEngine::new().calculate(self.position_size, &trades);

        info!(
            symbol = %self.symbol,
            trades = trades.len(),
            final_value = %final_value.round_dp(2),
            holding = open_position.is_some(),
            "Round-trip backtest finished"
        );

        Ok(RoundTripReport {
            symbol: self.symbol.clone(),
            starting_capital: self.position_size,
            realized_equity,
            final_value,
            total_return,
            return_pct: total_return / self.position_size * dec!(100),
            trades,
            open_position,
            performance,
            market: MarketStats::from_states(&states, &entries),
        })
    }
}

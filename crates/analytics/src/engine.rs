// In crates/analytics/src/engine.rs

use crate::types::{EquityPoint, ExitReason, PerformanceReport, Trade};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Calculates performance metrics from closed trades.
#[derive(Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the realized equity curve: starting capital plus cumulative P&L at each exit.
    pub fn equity_curve(&self, initial_capital: Decimal, trades: &[Trade]) -> Vec<EquityPoint> {
        let mut equity = initial_capital;
        trades
            .iter()
            .map(|t| {
                equity += t.profit_loss;
                EquityPoint {
                    timestamp: t.exit_time,
                    value: equity,
                }
            })
            .collect()
    }

    pub fn calculate(&self, initial_capital: Decimal, trades: &[Trade]) -> PerformanceReport {
        let mut report = PerformanceReport::new();
        if trades.is_empty() {
            return report;
        }

        report.total_trades = trades.len() as u32;
        report.net_pnl_absolute = trades.iter().map(|t| t.profit_loss).sum();
        if initial_capital > dec!(0) {
            report.net_pnl_percentage =
                (report.net_pnl_absolute / initial_capital).to_f64().unwrap_or(0.0) * 100.0;
        }

        // Win rate, averages and profit factor
        let wins: Vec<Decimal> = trades
            .iter()
            .map(|t| t.profit_loss)
            .filter(|p| *p > dec!(0))
            .collect();
        let losses: Vec<Decimal> = trades
            .iter()
            .map(|t| t.profit_loss)
            .filter(|p| *p < dec!(0))
            .collect();
        report.winning_trades = wins.len() as u32;
        report.losing_trades = losses.len() as u32;
        report.win_rate = (wins.len() as f64 / trades.len() as f64) * 100.0;

        let gross_profit: Decimal = wins.iter().sum();
        let gross_loss: Decimal = losses.iter().sum::<Decimal>().abs();
        if !wins.is_empty() {
            report.avg_win = gross_profit / Decimal::from(wins.len());
        }
        if !losses.is_empty() {
            report.avg_loss = -gross_loss / Decimal::from(losses.len());
        }
        report.profit_factor = if gross_loss > dec!(0) {
            (gross_profit / gross_loss).to_f64().unwrap_or(0.0)
        } else {
            f64::INFINITY
        };
        report.expectancy = report.net_pnl_absolute / Decimal::from(trades.len());

        report.take_profit_exits = trades
            .iter()
            .filter(|t| t.exit_reason == ExitReason::TakeProfit)
            .count() as u32;
        report.stop_loss_exits = trades
            .iter()
            .filter(|t| t.exit_reason == ExitReason::StopLoss)
            .count() as u32;

        // Max drawdown over realized equity
        let mut peak_equity = initial_capital;
        let mut max_drawdown = dec!(0);
        let mut max_drawdown_pct = 0.0;
        for point in self.equity_curve(initial_capital, trades) {
            peak_equity = peak_equity.max(point.value);
            let drawdown = peak_equity - point.value;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
                if peak_equity > dec!(0) {
                    max_drawdown_pct = (drawdown / peak_equity).to_f64().unwrap_or(0.0) * 100.0;
                }
            }
        }
        report.max_drawdown_absolute = max_drawdown;
        report.max_drawdown_percentage = max_drawdown_pct;

        let total_duration_ms: i64 = trades.iter().map(|t| t.exit_time - t.entry_time).sum();
        report.avg_trade_duration_secs = total_duration_ms as f64 / 1000.0 / trades.len() as f64;

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Symbol;

    fn trade(entry_time: i64, exit_time: i64, pnl: Decimal, reason: ExitReason) -> Trade {
        Trade {
            symbol: Symbol::from("BTCUSDT"),
            entry_time,
            exit_time,
            entry_price: dec!(100),
            exit_price: dec!(100) + pnl,
            quantity: dec!(1),
            profit_loss: pnl,
            profit_pct: pnl,
            exit_reason: reason,
        }
    }

    #[test]
    fn empty_trades_give_default_report() {
        let report = AnalyticsEngine::new().calculate(dec!(1000), &[]);
        assert_eq!(report, PerformanceReport::default());
    }

    #[test]
    fn summarizes_wins_and_losses() {
        let trades = vec![
            trade(0, 60_000, dec!(5), ExitReason::TakeProfit),
            trade(120_000, 240_000, dec!(-3), ExitReason::StopLoss),
            trade(300_000, 360_000, dec!(5), ExitReason::TakeProfit),
        ];
        let report = AnalyticsEngine::new().calculate(dec!(100), &trades);

        assert_eq!(report.total_trades, 3);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.take_profit_exits, 2);
        assert_eq!(report.stop_loss_exits, 1);
        assert_eq!(report.net_pnl_absolute, dec!(7));
        assert_eq!(report.avg_win, dec!(5));
        assert_eq!(report.avg_loss, dec!(-3));
        assert!((report.profit_factor - 10.0 / 3.0).abs() < 1e-9);
        assert!((report.win_rate - 200.0 / 3.0).abs() < 1e-9);
        // Peak 105 then 102.
        assert_eq!(report.max_drawdown_absolute, dec!(3));
        assert!((report.avg_trade_duration_secs - 80.0).abs() < 1e-9);
    }

    #[test]
    fn equity_curve_accumulates_realized_pnl() {
        let trades = vec![
            trade(0, 10, dec!(2), ExitReason::TakeProfit),
            trade(20, 30, dec!(-1), ExitReason::StopLoss),
        ];
        let curve = AnalyticsEngine::new().equity_curve(dec!(10), &trades);
        let values: Vec<Decimal> = curve.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![dec!(12), dec!(11)]);
    }
}

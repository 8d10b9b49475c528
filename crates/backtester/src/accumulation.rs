// In crates/backtester/src/accumulation.rs

use crate::schedule::CheckSchedule;
use crate::types::{AccumulationSettings, to_decimal};
use crate::{Error, Result};
use analytics::MarketStats;
use chrono::{NaiveDate, TimeZone, Utc};
use core_types::{CandleSeries, SignalState, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::BTreeMap;
use strategies::RollingLowSignal;
use tracing::{debug, info};

/// One executed buy, with the signal context it was taken in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub open_time: i64,
    pub date: NaiveDate,
    pub price: Decimal,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub window_low: Decimal,
    pub buy_range_upper: Decimal,
    pub distance_pct: Decimal,
}

/// Capital, holdings and per-day counters of an accumulation run.
///
/// `remaining_capital + total_spent() == initial_capital` holds after every call.
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulationLedger {
    initial_capital: Decimal,
    remaining_capital: Decimal,
    total_coins: Decimal,
    daily_buys: BTreeMap<NaiveDate, u32>,
    buys: Vec<LedgerEntry>,
}

impl AccumulationLedger {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            remaining_capital: initial_capital,
            total_coins: Decimal::ZERO,
            daily_buys: BTreeMap::new(),
            buys: Vec::new(),
        }
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn remaining_capital(&self) -> Decimal {
        self.remaining_capital
    }

    pub fn total_coins(&self) -> Decimal {
        self.total_coins
    }

    pub fn total_spent(&self) -> Decimal {
        self.buys.iter().map(|b| b.amount).sum()
    }

    pub fn buys(&self) -> &[LedgerEntry] {
        &self.buys
    }

    pub fn buys_on(&self, date: NaiveDate) -> u32 {
        self.daily_buys.get(&date).copied().unwrap_or(0)
    }

    pub fn daily_buys(&self) -> &BTreeMap<NaiveDate, u32> {
        &self.daily_buys
    }

    /// Buys `min(max_buy_amount, remaining)` at the state's close if the state is in
    /// range, at least `max_buy_amount` is left, and the day is under its cap.
    pub fn try_buy(
        &mut self,
        state: &SignalState,
        date: NaiveDate,
        max_buy_amount: Decimal,
        max_buys_per_day: u32,
    ) -> Option<&LedgerEntry> {
        if !state.in_range
            || self.remaining_capital < max_buy_amount
            || self.buys_on(date) >= max_buys_per_day
            || state.close <= Decimal::ZERO
        {
            return None;
        }

        let amount = max_buy_amount.min(self.remaining_capital);
        let quantity = amount / state.close;
        self.remaining_capital -= amount;
        self.total_coins += quantity;
        *self.daily_buys.entry(date).or_insert(0) += 1;
        self.buys.push(LedgerEntry {
            open_time: state.open_time,
            date,
            price: state.close,
            amount,
            quantity,
            window_low: state.window_low,
            buy_range_upper: state.buy_range_upper,
            distance_pct: state.distance_pct,
        });
        self.buys.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub buys: u32,
    pub spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulationReport {
    pub symbol: Symbol,
    pub range_pct: Decimal,
    pub initial_capital: Decimal,
    pub total_spent: Decimal,
    pub remaining_capital: Decimal,
    pub total_coins: Decimal,
    pub final_price: Decimal,
    pub holdings_value: Decimal,
    pub final_value: Decimal,
    pub total_return: Decimal,
    pub return_pct: Decimal,
    pub unrealized_pnl: Decimal,
    /// Unrealized P&L relative to the capital spent.
    pub unrealized_pct: Decimal,
    pub capital_utilization_pct: Decimal,
    pub avg_buy_amount: Option<Decimal>,
    pub avg_buy_price: Option<Decimal>,
    pub daily: Vec<DailySummary>,
    pub buys: Vec<LedgerEntry>,
    pub market: Option<MarketStats>,
}

/// Buy-only replay: spends a fixed budget in small slices whenever the close is in range.
#[derive(Debug, Clone)]
pub struct AccumulationBacktest {
    symbol: Symbol,
    signal: RollingLowSignal,
    initial_capital: Decimal,
    max_buy_amount: Decimal,
    max_buys_per_day: u32,
    check_interval_secs: u64,
}

impl AccumulationBacktest {
    pub fn new(
        symbol: Symbol,
        signal: RollingLowSignal,
        settings: &AccumulationSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            symbol,
            signal,
            initial_capital: to_decimal("initial_capital", settings.initial_capital)?,
            max_buy_amount: to_decimal("max_buy_amount", settings.max_buy_amount)?,
            max_buys_per_day: settings.max_buys_per_day,
            check_interval_secs: settings.check_interval_secs,
        })
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn signal(&self) -> &RollingLowSignal {
        &self.signal
    }

    /// The same run with a different range width.
    pub fn with_signal(&self, signal: RollingLowSignal) -> Self {
        Self {
            signal,
            ..self.clone()
        }
    }

    pub fn run(&self, series: &CandleSeries) -> Result<AccumulationReport> {
        let last = series.last().ok_or_else(|| Error::EmptySeries {
            symbol: self.symbol.to_string(),
        })?;

        let states = self.signal.compute(series);
        let mut schedule = CheckSchedule::new(self.check_interval_secs);
        let mut ledger = AccumulationLedger::new(self.initial_capital);
        let mut entries = Vec::new();

        for state in &states {
            if !schedule.is_boundary(state.open_time) {
                continue;
            }
            let Some(date) = utc_date(state.open_time) else {
                continue;
            };
            if let Some(buy) =
                ledger.try_buy(state, date, self.max_buy_amount, self.max_buys_per_day)
            {
                debug!(
                    symbol = %self.symbol,
                    time = buy.open_time,
                    price = %buy.price,
                    window_low = %buy.window_low,
                    amount = %buy.amount,
                    coins = %buy.quantity,
                    "Buy"
                );
                entries.push(*state);
            }
        }

        let report = self.report(&ledger, last.close, MarketStats::from_states(&states, &entries));
        info!(
            symbol = %self.symbol,
            range_pct = %self.signal.range_pct(),
            buys = report.buys.len(),
            spent = %report.total_spent.round_dp(2),
            return_pct = %report.return_pct.round_dp(2),
            "Accumulation backtest finished"
        );
        Ok(report)
    }

    fn report(
        &self,
        ledger: &AccumulationLedger,
        final_price: Decimal,
        market: Option<MarketStats>,
    ) -> AccumulationReport {
        let total_spent = ledger.total_spent();
        let holdings_value = ledger.total_coins() * final_price;
        let final_value = ledger.remaining_capital() + holdings_value;
        let total_return = final_value - ledger.initial_capital();
        let unrealized_pnl = holdings_value - total_spent;
        let buys = ledger.buys();

        let count = Decimal::from(buys.len());
        let (avg_buy_amount, avg_buy_price) = if buys.is_empty() {
            (None, None)
        } else {
            (
                Some(total_spent / count),
                Some(buys.iter().map(|b| b.price).sum::<Decimal>() / count),
            )
        };

        let daily = ledger
            .daily_buys()
            .iter()
            .map(|(&date, &count)| DailySummary {
                date,
                buys: count,
                spent: buys
                    .iter()
                    .filter(|b| b.date == date)
                    .map(|b| b.amount)
                    .sum(),
            })
            .collect();

        AccumulationReport {
            symbol: self.symbol.clone(),
            range_pct: self.signal.range_pct(),
            initial_capital: ledger.initial_capital(),
            total_spent,
            remaining_capital: ledger.remaining_capital(),
            total_coins: ledger.total_coins(),
            final_price,
            holdings_value,
            final_value,
            total_return,
            return_pct: total_return / ledger.initial_capital() * dec!(100),
            unrealized_pnl,
            unrealized_pct: if total_spent.is_zero() {
                Decimal::ZERO
            } else {
                unrealized_pnl / total_spent * dec!(100)
            },
            capital_utilization_pct: total_spent / ledger.initial_capital() * dec!(100),
            avg_buy_amount,
            avg_buy_price,
            daily,
            buys: buys.to_vec(),
            market,
        }
    }
}

fn utc_date(open_time: i64) -> Option<NaiveDate> {
    Utc.timestamp_millis_opt(open_time)
        .single()
        .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Kline;

    const DAY_MS: i64 = 86_400_000;

    fn bars(points: &[(i64, Decimal)]) -> CandleSeries {
        let klines = points
            .iter()
            .map(|&(open_time, close)| Kline {
                open_time,
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1),
                close_time: open_time + 59_999,
            })
            .collect();
        CandleSeries::new(klines).unwrap()
    }

    fn backtest(capital: f64, max_buy: f64, per_day: u32) -> AccumulationBacktest {
        let settings = AccumulationSettings {
            initial_capital: capital,
            max_buy_amount: max_buy,
            max_buys_per_day: per_day,
            check_interval_secs: 60,
        };
        let signal = RollingLowSignal::new(1, 0.5).unwrap();
        AccumulationBacktest::new(Symbol::from("SOLUSDT"), signal, &settings).unwrap()
    }

    #[test]
    fn daily_cap_resets_on_utc_midnight() {
        let series = bars(&[
            (0, dec!(10)),
            (60_000, dec!(10)),
            (120_000, dec!(10)),
            (DAY_MS, dec!(10)),
            (DAY_MS + 60_000, dec!(10)),
        ]);
        let report = backtest(100.0, 10.0, 2).run(&series).unwrap();

        assert_eq!(report.buys.len(), 4);
        assert_eq!(report.daily.len(), 2);
        assert_eq!(report.daily[0].buys, 2);
        assert_eq!(report.daily[0].spent, dec!(20));
        assert_eq!(report.remaining_capital, dec!(60));
    }

    #[test]
    fn stops_when_less_than_one_slice_remains() {
        let series = bars(&(0..5).map(|i| (i * 60_000, dec!(10))).collect::<Vec<_>>());
        let report = backtest(25.0, 10.0, 10).run(&series).unwrap();
        assert_eq!(report.buys.len(), 2);
        assert_eq!(report.remaining_capital, dec!(5));
        assert_eq!(report.remaining_capital + report.total_spent, dec!(25));
    }

    #[test]
    fn report_values_holdings_at_last_close() {
        let series = bars(&[(0, dec!(10)), (60_000, dec!(20))]);
        let report = backtest(100.0, 10.0, 10).run(&series).unwrap();

        // Both bars are on their own one-bar low.
        assert_eq!(report.total_coins, dec!(1.5));
        assert_eq!(report.holdings_value, dec!(30));
        assert_eq!(report.final_value, dec!(110));
        assert_eq!(report.return_pct, dec!(10));
        assert_eq!(report.unrealized_pnl, dec!(10));
        assert_eq!(report.unrealized_pct, dec!(50));
        assert_eq!(report.capital_utilization_pct, dec!(20));
        assert_eq!(report.avg_buy_price, Some(dec!(15)));
    }

    #[test]
    fn ledger_skips_out_of_range_states() {
        let mut ledger = AccumulationLedger::new(dec!(100));
        let state = SignalState {
            open_time: 0,
            close: dec!(11),
            window_low: dec!(10),
            buy_range_upper: dec!(10.05),
            distance_pct: dec!(10),
            in_range: false,
        };
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(ledger.try_buy(&state, date, dec!(10), 5).is_none());
        assert_eq!(ledger.remaining_capital(), dec!(100));
    }
}

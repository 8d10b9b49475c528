// In crates/backtester/src/sweep.rs

use crate::Result;
use crate::accumulation::{AccumulationBacktest, AccumulationReport};
use crate::types::SweepSettings;
use core_types::CandleSeries;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    /// One report per candidate, in candidate order.
    pub results: Vec<AccumulationReport>,
    pub best_index: usize,
}

impl SweepReport {
    pub fn best(&self) -> Option<&AccumulationReport> {
        self.results.get(self.best_index)
    }
}

/// Runs the accumulation backtest once per candidate range width.
pub struct RangeSweep {
    candidates: Vec<f64>,
}

impl RangeSweep {
    pub fn new(settings: &SweepSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            candidates: settings.range_candidates.clone(),
        })
    }

    /// Picks the highest return percentage; the first candidate wins a tie.
    pub fn run(&self, base: &AccumulationBacktest, series: &CandleSeries) -> Result<SweepReport> {
        let mut results: Vec<AccumulationReport> = Vec::with_capacity(self.candidates.len());
        let mut best_index = 0;

        for (index, &range_pct) in self.candidates.iter().enumerate() {
            let signal = base.signal().with_range_pct(range_pct)?;
            let report = base.with_signal(signal).run(series)?;
            if index > 0 && report.return_pct > results[best_index].return_pct {
                best_index = index;
            }
            results.push(report);
        }

        if let Some(best) = results.get(best_index) {
            info!(
                symbol = %base.symbol(),
                range_pct = %best.range_pct,
                return_pct = %best.return_pct.round_dp(2),
                "Best range found"
            );
        }
        Ok(SweepReport {
            results,
            best_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccumulationSettings;
    use core_types::{Kline, Symbol};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use strategies::RollingLowSignal;

    fn kline(i: i64, low: Decimal, close: Decimal) -> Kline {
        Kline {
            open_time: i * 60_000,
            open: close,
            high: close,
            low,
            close,
            volume: dec!(1),
            close_time: i * 60_000 + 59_999,
        }
    }

    fn base() -> AccumulationBacktest {
        let settings = AccumulationSettings {
            initial_capital: 100.0,
            max_buy_amount: 10.0,
            max_buys_per_day: 10,
            check_interval_secs: 60,
        };
        let signal = RollingLowSignal::new(10, 0.05).unwrap();
        AccumulationBacktest::new(Symbol::from("BTCUSDT"), signal, &settings).unwrap()
    }

    #[test]
    fn wider_range_wins_when_it_catches_the_rally() {
        // Bar 1 closes 0.3 % above the low; the price then doubles.
        let series = CandleSeries::new(vec![
            kline(0, dec!(100), dec!(100.3)),
            kline(1, dec!(100.3), dec!(100.3)),
            kline(2, dec!(200), dec!(200)),
        ])
        .unwrap();
        let sweep = RangeSweep::new(&SweepSettings {
            range_candidates: vec![0.1, 0.5],
        })
        .unwrap();
        let report = sweep.run(&base(), &series).unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.best_index, 1);
        assert_eq!(report.best().unwrap().range_pct, dec!(0.5));
    }

    #[test]
    fn ties_go_to_first_candidate() {
        let series = CandleSeries::new(vec![kline(0, dec!(100), dec!(110))]).unwrap();
        let sweep = RangeSweep::new(&SweepSettings {
            range_candidates: vec![0.1, 0.2, 0.3],
        })
        .unwrap();
        let report = sweep.run(&base(), &series).unwrap();
        // No candidate buys, so every return is zero.
        assert_eq!(report.best_index, 0);
    }
}

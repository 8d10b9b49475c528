// In crates/backtester/tests/ledger_properties.rs

use backtester::{AccumulationBacktest, AccumulationSettings};
use core_types::{CandleSeries, Kline, Symbol};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use strategies::RollingLowSignal;

/// (minutes since previous bar, low in cents, close offset in cents)
fn arb_bars() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((1i64..600, 1_000i64..2_000, 0i64..20), 1..300)
}

fn to_series(bars: &[(i64, i64, i64)]) -> CandleSeries {
    let mut open_time = 1_704_067_200_000; // 2024-01-01T00:00:00Z
    let klines = bars
        .iter()
        .map(|&(gap, low, offset)| {
            open_time += gap * 60_000;
            let low = Decimal::new(low, 2);
            let close = low + Decimal::new(offset, 2);
            Kline {
                open_time,
                open: close,
                high: close,
                low,
                close,
                volume: dec!(1),
                close_time: open_time + 59_999,
            }
        })
        .collect();
    CandleSeries::new(klines).expect("generated bars are valid")
}

proptest! {
    #[test]
    fn capital_is_conserved_and_daily_cap_holds(
        bars in arb_bars(),
        capital in 10u32..500,
        slice in 1u32..50,
        per_day in 1u32..8,
        window in 1usize..120,
    ) {
        let settings = AccumulationSettings {
            initial_capital: f64::from(capital),
            max_buy_amount: f64::from(slice),
            max_buys_per_day: per_day,
            check_interval_secs: 60,
        };
        let signal = RollingLowSignal::new(window, 0.1).unwrap();
        let backtest = AccumulationBacktest::new(Symbol::from("BTCUSDT"), signal, &settings).unwrap();
        let report = backtest.run(&to_series(&bars)).unwrap();

        let spent: Decimal = report.buys.iter().map(|b| b.amount).sum();
        prop_assert_eq!(report.remaining_capital + spent, Decimal::from(capital));
        prop_assert!(report.remaining_capital >= Decimal::ZERO);

        let mut per_date: HashMap<_, u32> = HashMap::new();
        for buy in &report.buys {
            *per_date.entry(buy.date).or_default() += 1;
        }
        for count in per_date.values() {
            prop_assert!(*count <= per_day);
        }

        let mut coins = Decimal::ZERO;
        for buy in &report.buys {
            prop_assert!(buy.quantity > Decimal::ZERO);
            coins += buy.quantity;
        }
        prop_assert_eq!(coins, report.total_coins);
    }
}

// In crates/analytics/src/market.rs

use core_types::SignalState;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Min / max / mean of a set of decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: Decimal,
    pub max: Decimal,
    pub avg: Decimal,
}

impl Range {
    fn of(values: impl IntoIterator<Item = Decimal>) -> Option<Self> {
        let mut iter = values.into_iter();
        let first = iter.next()?;
        let (mut min, mut max, mut sum, mut count) = (first, first, first, 1u32);
        for v in iter {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }
        Some(Self {
            min,
            max,
            avg: sum / Decimal::from(count),
        })
    }

    /// `(max - min) / avg * 100`.
    pub fn volatility_pct(&self) -> f64 {
        if self.avg.is_zero() {
            return 0.0;
        }
        ((self.max - self.min) / self.avg * dec!(100))
            .to_f64()
            .unwrap_or(0.0)
    }
}

/// Market context for a backtest run: how prices and the window low moved,
/// and how many in-range bars were turned into entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub price: Range,
    pub window_low: Range,
    pub buy_opportunities: usize,
    pub opportunities_taken: usize,
    pub conversion_rate_pct: f64,
    /// Distance from the window low over every in-range bar.
    pub opportunity_distance: Option<Range>,
    /// Distance from the window low of the entries actually taken.
    pub entry_distance: Option<Range>,
}

impl MarketStats {
    /// `states` is the full signal sequence; `entries` the subset that led to a buy.
    /// Returns `None` for an empty run.
    pub fn from_states(states: &[SignalState], entries: &[SignalState]) -> Option<Self> {
        let price = Range::of(states.iter().map(|s| s.close))?;
        let window_low = Range::of(states.iter().map(|s| s.window_low))?;

        let opportunities: Vec<&SignalState> = states.iter().filter(|s| s.in_range).collect();
        let conversion_rate_pct = if opportunities.is_empty() {
            0.0
        } else {
            entries.len() as f64 / opportunities.len() as f64 * 100.0
        };

        Some(Self {
            price,
            window_low,
            buy_opportunities: opportunities.len(),
            opportunities_taken: entries.len(),
            conversion_rate_pct,
            opportunity_distance: Range::of(opportunities.iter().map(|s| s.distance_pct)),
            entry_distance: Range::of(entries.iter().map(|s| s.distance_pct)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(close: Decimal, window_low: Decimal, in_range: bool) -> SignalState {
        SignalState {
            open_time: 0,
            close,
            window_low,
            buy_range_upper: window_low * dec!(1.01),
            distance_pct: (close - window_low) / window_low * dec!(100),
            in_range,
        }
    }

    #[test]
    fn computes_ranges_and_conversion() {
        let states = vec![
            state(dec!(100), dec!(100), true),
            state(dec!(110), dec!(100), false),
            state(dec!(90), dec!(90), true),
            state(dec!(100), dec!(90), false),
        ];
        let entries = vec![states[2]];
        let stats = MarketStats::from_states(&states, &entries).unwrap();

        assert_eq!(stats.price.min, dec!(90));
        assert_eq!(stats.price.max, dec!(110));
        assert_eq!(stats.price.avg, dec!(100));
        assert!((stats.price.volatility_pct() - 20.0).abs() < 1e-9);
        assert_eq!(stats.window_low.avg, dec!(95));
        assert_eq!(stats.buy_opportunities, 2);
        assert_eq!(stats.opportunities_taken, 1);
        assert!((stats.conversion_rate_pct - 50.0).abs() < 1e-9);
        assert_eq!(stats.entry_distance.unwrap().max, dec!(0));
    }

    #[test]
    fn empty_run_has_no_stats() {
        assert!(MarketStats::from_states(&[], &[]).is_none());
    }
}

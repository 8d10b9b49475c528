// In crates/strategies/src/rolling_low.rs

use crate::types::RollingLowSettings;
use crate::{Error, Result};
use core_types::{CandleSeries, Kline, SignalState};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

/// Rolling-window price floor signal.
///
/// For every bar the signal takes the minimum low of the trailing `window_size`
/// bars (fewer while the window is still filling), scales it up by `range_pct`
/// to form the buy range, and flags whether the close lies inside it.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingLowSignal {
    window_size: usize,
    range_pct: Decimal,
    range_multiplier: Decimal,
}

impl RollingLowSignal {
    /// Creates a signal, rejecting a zero window or a negative / non-finite range.
    pub fn new(window_size: usize, range_pct: f64) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::InvalidParameters(
                "window_size must be at least 1".to_string(),
            ));
        }
        if !range_pct.is_finite() || range_pct < 0.0 {
            return Err(Error::InvalidParameters(format!(
                "range_pct must be a finite, non-negative percentage (got {range_pct})"
            )));
        }
        let range_pct = Decimal::from_f64(range_pct).ok_or_else(|| {
            Error::InvalidParameters(format!("range_pct {range_pct} is not representable"))
        })?;

        Ok(Self {
            window_size,
            range_pct,
            range_multiplier: dec!(1) + range_pct / dec!(100),
        })
    }

    pub fn from_settings(settings: &RollingLowSettings) -> Result<Self> {
        Self::new(settings.window_size, settings.range_pct)
    }

    /// The same window with a different range width.
    pub fn with_range_pct(&self, range_pct: f64) -> Result<Self> {
        Self::new(self.window_size, range_pct)
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn range_pct(&self) -> Decimal {
        self.range_pct
    }

    /// Lazily walks the series, yielding one state per bar.
    pub fn iter<'a>(&self, series: &'a CandleSeries) -> RollingLowIter<'a> {
        RollingLowIter {
            klines: series.klines(),
            next_index: 0,
            window: VecDeque::with_capacity(self.window_size.min(series.len()) + 1),
            signal: self.clone(),
        }
    }

    /// Computes the full state sequence, aligned 1:1 with the series.
    pub fn compute(&self, series: &CandleSeries) -> Vec<SignalState> {
        self.iter(series).collect()
    }

    /// The state of the last bar only. `None` for an empty series.
    pub fn latest(&self, series: &CandleSeries) -> Option<SignalState> {
        let klines = series.klines();
        let last = klines.last()?;
        let start = klines.len().saturating_sub(self.window_size);
        let window_low = klines[start..].iter().map(|k| k.low).min()?;
        Some(self.evaluate(last, window_low))
    }

    /// Derives the buy range and distance for one bar given its window low.
    pub fn evaluate(&self, kline: &Kline, window_low: Decimal) -> SignalState {
        let buy_range_upper = window_low * self.range_multiplier;
        let distance_pct = (kline.close - window_low) / window_low * dec!(100);
        let in_range = window_low <= kline.close && kline.close <= buy_range_upper;

        SignalState {
            open_time: kline.open_time,
            close: kline.close,
            window_low,
            buy_range_upper,
            distance_pct,
            in_range,
        }
    }
}

/// Streaming evaluation backed by a monotonic deque of bar indices.
///
/// The front of the deque always holds the index of the minimum low inside the
/// current window, so each bar costs O(1) amortized.
#[derive(Debug, Clone)]
pub struct RollingLowIter<'a> {
    klines: &'a [Kline],
    next_index: usize,
    window: VecDeque<usize>,
    signal: RollingLowSignal,
}

impl Iterator for RollingLowIter<'_> {
    type Item = SignalState;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next_index;
        let kline = self.klines.get(index)?;
        self.next_index += 1;

        while let Some(&back) = self.window.back() {
            if self.klines[back].low >= kline.low {
                self.window.pop_back();
            } else {
                break;
            }
        }
        self.window.push_back(index);

        while let Some(&front) = self.window.front() {
            if front + self.signal.window_size <= index {
                self.window.pop_front();
            } else {
                break;
            }
        }

        // The deque is never empty here: `index` was just pushed and is inside the window.
        let window_low = self.klines[*self.window.front()?].low;
        Some(self.signal.evaluate(kline, window_low))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.klines.len() - self.next_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for RollingLowIter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(bars: &[(Decimal, Decimal)]) -> CandleSeries {
        // (low, close); high is the max of the two plus a margin.
        let klines = bars
            .iter()
            .enumerate()
            .map(|(i, &(low, close))| Kline {
                open_time: i as i64 * 60_000,
                open: close,
                high: close.max(low) + dec!(1),
                low,
                close,
                volume: dec!(10),
                close_time: i as i64 * 60_000 + 59_999,
            })
            .collect();
        CandleSeries::new(klines).unwrap()
    }

    #[test]
    fn window_low_expands_then_rolls() {
        let s = series(&[
            (dec!(100), dec!(101)),
            (dec!(98), dec!(99)),
            (dec!(102), dec!(102)),
            (dec!(103), dec!(104)),
            (dec!(104), dec!(104)),
        ]);
        let signal = RollingLowSignal::new(3, 1.0).unwrap();
        let lows: Vec<Decimal> = signal.compute(&s).iter().map(|st| st.window_low).collect();
        assert_eq!(lows, vec![dec!(100), dec!(98), dec!(98), dec!(98), dec!(102)]);
    }

    #[test]
    fn three_bar_scenario() {
        let s = series(&[
            (dec!(100), dec!(100)),
            (dec!(98), dec!(98)),
            (dec!(102), dec!(102)),
        ]);
        let signal = RollingLowSignal::new(3, 1.0).unwrap();
        let states = signal.compute(&s);

        assert_eq!(states[2].window_low, dec!(98));
        assert_eq!(states[2].buy_range_upper, dec!(98.98));
        assert!(!states[2].in_range);
        assert!(states[1].in_range);
    }

    #[test]
    fn zero_range_only_matches_exact_low() {
        let s = series(&[(dec!(100), dec!(100)), (dec!(99), dec!(99.01))]);
        let signal = RollingLowSignal::new(10, 0.0).unwrap();
        let states = signal.compute(&s);
        assert!(states[0].in_range);
        assert!(!states[1].in_range);
    }

    #[test]
    fn upper_bound_is_inclusive() {
        let s = series(&[(dec!(100), dec!(101))]);
        let signal = RollingLowSignal::new(5, 1.0).unwrap();
        let state = signal.latest(&s).unwrap();
        assert_eq!(state.buy_range_upper, dec!(101));
        assert_eq!(state.distance_pct, dec!(1));
        assert!(state.in_range);
    }

    #[test]
    fn latest_matches_last_computed_state() {
        let s = series(&[
            (dec!(10), dec!(11)),
            (dec!(9), dec!(9.5)),
            (dec!(12), dec!(12)),
            (dec!(11), dec!(11.05)),
        ]);
        let signal = RollingLowSignal::new(2, 0.5).unwrap();
        assert_eq!(signal.latest(&s), signal.compute(&s).last().copied());
    }

    #[test]
    fn empty_series_yields_nothing() {
        let signal = RollingLowSignal::new(3, 1.0).unwrap();
        let empty = CandleSeries::default();
        assert!(signal.compute(&empty).is_empty());
        assert!(signal.latest(&empty).is_none());
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(RollingLowSignal::new(0, 1.0).is_err());
        assert!(RollingLowSignal::new(10, -0.1).is_err());
        assert!(RollingLowSignal::new(10, f64::NAN).is_err());
    }
}

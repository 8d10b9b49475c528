// In crates/strategies/src/analysis.rs

use crate::rolling_low::RollingLowSignal;
use core_types::{CandleSeries, SignalState};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    BuyRange,
    Wait,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::BuyRange => write!(f, "BUY_RANGE"),
            SignalType::Wait => write!(f, "WAIT"),
        }
    }
}

/// How close the last close sits to the window low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
}

impl SignalStrength {
    /// STRONG below 0.1 %, MODERATE below 0.2 %, WEAK otherwise.
    pub fn from_distance(distance_pct: Decimal) -> Self {
        if distance_pct < dec!(0.1) {
            SignalStrength::Strong
        } else if distance_pct < dec!(0.2) {
            SignalStrength::Moderate
        } else {
            SignalStrength::Weak
        }
    }
}

impl fmt::Display for SignalStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalStrength::Strong => write!(f, "STRONG"),
            SignalStrength::Moderate => write!(f, "MODERATE"),
            SignalStrength::Weak => write!(f, "WEAK"),
        }
    }
}

/// A point-in-time view of the signal plus statistics over the fetched window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowAnalysis {
    pub latest: SignalState,
    pub signal_type: SignalType,
    pub strength: SignalStrength,
    pub bars: usize,
    pub min_close: Decimal,
    pub max_close: Decimal,
    pub avg_close: Decimal,
    pub volatility_pct: f64,
    pub buy_opportunities: usize,
}

impl RollingLowSignal {
    /// Builds the analysis snapshot for `series`. `None` when the series is empty.
    pub fn analyze(&self, series: &CandleSeries) -> Option<WindowAnalysis> {
        let mut min_close: Option<Decimal> = None;
        let mut max_close: Option<Decimal> = None;
        let mut sum = Decimal::ZERO;
        let mut buy_opportunities = 0;
        let mut latest = None;

        for state in self.iter(series) {
            min_close = Some(min_close.map_or(state.close, |m| m.min(state.close)));
            max_close = Some(max_close.map_or(state.close, |m| m.max(state.close)));
            sum += state.close;
            if state.in_range {
                buy_opportunities += 1;
            }
            latest = Some(state);
        }

        let latest = latest?;
        let (min_close, max_close) = (min_close?, max_close?);
        let avg_close = sum / Decimal::from(series.len());
        let volatility_pct = if avg_close.is_zero() {
            0.0
        } else {
            ((max_close - min_close) / avg_close * dec!(100))
                .to_f64()
                .unwrap_or_default()
        };

        Some(WindowAnalysis {
            signal_type: if latest.in_range {
                SignalType::BuyRange
            } else {
                SignalType::Wait
            },
            strength: SignalStrength::from_distance(latest.distance_pct),
            latest,
            bars: series.len(),
            min_close,
            max_close,
            avg_close,
            volatility_pct,
            buy_opportunities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Kline;

    fn closes(values: &[Decimal]) -> CandleSeries {
        let klines = values
            .iter()
            .enumerate()
            .map(|(i, &close)| Kline {
                open_time: i as i64 * 60_000,
                open: close,
                high: close,
                low: close,
                close,
                volume: dec!(1),
                close_time: i as i64 * 60_000 + 59_999,
            })
            .collect();
        CandleSeries::new(klines).unwrap()
    }

    #[test]
    fn strength_thresholds() {
        assert_eq!(SignalStrength::from_distance(dec!(0.05)), SignalStrength::Strong);
        assert_eq!(SignalStrength::from_distance(dec!(0.1)), SignalStrength::Moderate);
        assert_eq!(SignalStrength::from_distance(dec!(0.19)), SignalStrength::Moderate);
        assert_eq!(SignalStrength::from_distance(dec!(0.2)), SignalStrength::Weak);
    }

    #[test]
    fn summarizes_window() {
        let series = closes(&[dec!(100), dec!(110), dec!(90), dec!(100)]);
        let signal = RollingLowSignal::new(10, 5.0).unwrap();
        let analysis = signal.analyze(&series).unwrap();

        assert_eq!(analysis.bars, 4);
        assert_eq!(analysis.min_close, dec!(90));
        assert_eq!(analysis.max_close, dec!(110));
        assert_eq!(analysis.avg_close, dec!(100));
        assert!((analysis.volatility_pct - 20.0).abs() < 1e-9);
        // Bars 0 and 2 sit on their window low.
        assert_eq!(analysis.buy_opportunities, 2);
        assert_eq!(analysis.signal_type, SignalType::Wait);
        assert_eq!(analysis.strength, SignalStrength::Weak);
    }

    #[test]
    fn close_at_low_is_strong_buy() {
        let series = closes(&[dec!(100), dec!(95)]);
        let signal = RollingLowSignal::new(10, 1.0).unwrap();
        let analysis = signal.analyze(&series).unwrap();
        assert_eq!(analysis.signal_type, SignalType::BuyRange);
        assert_eq!(analysis.strength, SignalStrength::Strong);
        assert_eq!(analysis.signal_type.to_string(), "BUY_RANGE");
    }

    #[test]
    fn empty_series_has_no_analysis() {
        let signal = RollingLowSignal::new(10, 1.0).unwrap();
        assert!(signal.analyze(&CandleSeries::default()).is_none());
    }
}

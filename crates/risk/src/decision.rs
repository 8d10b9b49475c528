// In crates/risk/src/decision.rs

use crate::buy_block::BuyBlockState;
use crate::types::BuyGateSettings;
use crate::{Error, Result, RiskManager};
use chrono::{DateTime, Duration, Utc};
use core_types::{SignalState, Symbol};
use rust_decimal::prelude::*;
use serde::Serialize;
use std::fmt;

/// What the account currently holds of one asset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PositionExposure {
    pub has_open_position: bool,
    /// `|signed_size| * mid_price`.
    pub current_value_usd: Decimal,
}

/// Capacity and time gates of one asset at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateStatus {
    pub current_value_usd: Decimal,
    pub max_position_value_usd: Decimal,
    pub remaining_capacity_usd: Decimal,
    /// How many more buys fit under the ceiling.
    pub remaining_trades: Decimal,
    pub can_buy_capacity: bool,
    pub can_buy_time: bool,
    pub time_block_remaining_secs: Option<i64>,
    pub last_buy: Option<DateTime<Utc>>,
}

impl GateStatus {
    pub fn position_limit_reached(&self) -> bool {
        self.current_value_usd >= self.max_position_value_usd
    }

    pub fn ready(&self) -> bool {
        self.can_buy_capacity && self.can_buy_time
    }

    /// "Buy blocked - 29m 59s remaining (last buy: 12:00:00)" while blocked.
    pub fn time_block_message(&self) -> Option<String> {
        let secs = self.time_block_remaining_secs?;
        let mut msg = format!("Buy blocked - {}m {}s remaining", secs / 60, secs % 60);
        if let Some(last) = self.last_buy {
            msg.push_str(&format!(" (last buy: {})", last.format("%H:%M:%S")));
        }
        Some(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoneReason {
    NoSignal,
    TimeBlocked,
    CapacityBlocked,
    /// All gates open but no buy; kept for completeness of the reason order.
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy { notional_usd: Decimal },
    None { reason: NoneReason },
}

/// The outcome of evaluating one asset in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub symbol: Symbol,
    pub signal: SignalState,
    pub gate: GateStatus,
    pub position_value_usd: Decimal,
    pub action: Action,
}

impl Decision {
    pub fn is_buy(&self) -> bool {
        matches!(self.action, Action::Buy { .. })
    }

    pub fn reason(&self) -> Option<NoneReason> {
        match self.action {
            Action::Buy { .. } => None,
            Action::None { reason } => Some(reason),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            Action::Buy { notional_usd } => write!(
                f,
                "Market buy ${:.2} (distance {:.3}%)",
                notional_usd, self.signal.distance_pct
            ),
            Action::None { reason: NoneReason::NoSignal } => write!(
                f,
                "No buy signal - price {:.3}% above window low",
                self.signal.distance_pct
            ),
            Action::None { reason: NoneReason::TimeBlocked } => {
                write!(f, "{}", self.gate.time_block_message().unwrap_or_default())
            }
            Action::None { reason: NoneReason::CapacityBlocked } => {
                if self.gate.position_limit_reached() {
                    write!(
                        f,
                        "Position limit reached (${:.2}/${:.2})",
                        self.gate.current_value_usd, self.gate.max_position_value_usd
                    )
                } else {
                    write!(
                        f,
                        "Insufficient capacity (${:.2} < ${:.2})",
                        self.gate.remaining_capacity_usd, self.position_value_usd
                    )
                }
            }
            Action::None { reason: NoneReason::Waiting } => write!(
                f,
                "Waiting for buy opportunity (Value: ${:.2})",
                self.gate.current_value_usd
            ),
        }
    }
}

/// Buys an in-range asset when the position has room for one more slice and the
/// asset's buy block has expired.
#[derive(Debug, Clone)]
pub struct LiveDecisionEngine {
    position_value: Decimal,
    max_position_value: Decimal,
    buy_block: Duration,
}

impl LiveDecisionEngine {
    pub fn new(settings: &BuyGateSettings) -> Result<Self> {
        settings.validate()?;
        let decimal = |name: &str, value: f64| {
            Decimal::from_f64(value)
                .ok_or_else(|| Error::InvalidParameters(format!("{name} ({value}) is not representable")))
        };
        let minutes = i64::try_from(settings.buy_block_minutes)
            .map_err(|_| Error::InvalidParameters("buy_block_minutes is out of range".to_string()))?;
        let buy_block = Duration::try_minutes(minutes)
            .ok_or_else(|| Error::InvalidParameters("buy_block_minutes is out of range".to_string()))?;

        Ok(Self {
            position_value: decimal("position_value_usd", settings.position_value_usd)?,
            max_position_value: decimal("max_position_value_usd", settings.max_position_value_usd)?,
            buy_block,
        })
    }

    pub fn position_value(&self) -> Decimal {
        self.position_value
    }

    pub fn max_position_value(&self) -> Decimal {
        self.max_position_value
    }

    pub fn buy_block(&self) -> Duration {
        self.buy_block
    }

    pub fn can_buy_capacity(&self, current_value_usd: Decimal) -> bool {
        self.max_position_value - current_value_usd >= self.position_value
    }
}

impl RiskManager for LiveDecisionEngine {
    fn name(&self) -> &'static str {
        "LiveDecisionEngine"
    }

    fn gate_status(
        &self,
        symbol: &Symbol,
        exposure: &PositionExposure,
        blocks: &BuyBlockState,
        now: DateTime<Utc>,
    ) -> GateStatus {
        let remaining_capacity = self.max_position_value - exposure.current_value_usd;
        let time_block = blocks.remaining(symbol, now, self.buy_block);
        GateStatus {
            current_value_usd: exposure.current_value_usd,
            max_position_value_usd: self.max_position_value,
            remaining_capacity_usd: remaining_capacity,
            remaining_trades: if remaining_capacity > Decimal::ZERO {
                remaining_capacity / self.position_value
            } else {
                Decimal::ZERO
            },
            can_buy_capacity: self.can_buy_capacity(exposure.current_value_usd),
            can_buy_time: time_block.is_none(),
            // Round up so a partial second still reads as blocked.
            time_block_remaining_secs: time_block
                .map(|d| (d.num_milliseconds() + 999).div_euclid(1000)),
            last_buy: blocks.last_buy(symbol),
        }
    }

    fn decide(
        &self,
        symbol: &Symbol,
        signal: &SignalState,
        exposure: &PositionExposure,
        blocks: &BuyBlockState,
        now: DateTime<Utc>,
    ) -> Decision {
        let gate = self.gate_status(symbol, exposure, blocks, now);

        let action = if signal.in_range && gate.can_buy_capacity && gate.can_buy_time {
            Action::Buy {
                notional_usd: self.position_value,
            }
        } else {
            let reason = if !signal.in_range {
                NoneReason::NoSignal
            } else if !gate.can_buy_time {
                NoneReason::TimeBlocked
            } else if !gate.can_buy_capacity {
                NoneReason::CapacityBlocked
            } else {
                NoneReason::Waiting
            };
            Action::None { reason }
        };

        Decision {
            symbol: symbol.clone(),
            signal: *signal,
            gate,
            position_value_usd: self.position_value,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn engine() -> LiveDecisionEngine {
        LiveDecisionEngine::new(&BuyGateSettings {
            position_value_usd: 20.0,
            max_position_value_usd: 140.0,
            buy_block_minutes: 60,
        })
        .unwrap()
    }

    fn signal(in_range: bool) -> SignalState {
        SignalState {
            open_time: 0,
            close: dec!(100.02),
            window_low: dec!(100),
            buy_range_upper: dec!(100.05),
            distance_pct: if in_range { dec!(0.02) } else { dec!(0.5) },
            in_range,
        }
    }

    fn exposure(value: Decimal) -> PositionExposure {
        PositionExposure {
            has_open_position: value > Decimal::ZERO,
            current_value_usd: value,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn capacity_needs_a_full_slice() {
        let engine = engine();
        assert!(!engine.can_buy_capacity(dec!(130)));
        assert!(engine.can_buy_capacity(dec!(120)));
    }

    #[test]
    fn buys_when_all_gates_open() {
        let btc = Symbol::from("BTCUSDT");
        let decision = engine().decide(&btc, &signal(true), &exposure(dec!(0)), &BuyBlockState::new(), t0());
        assert_eq!(decision.action, Action::Buy { notional_usd: dec!(20) });
        assert_eq!(decision.gate.remaining_trades, dec!(7));
    }

    #[test]
    fn buy_block_lifts_after_duration() {
        let btc = Symbol::from("BTCUSDT");
        let mut blocks = BuyBlockState::new();
        blocks.record_buy(&btc, t0());
        let engine = engine();

        let early = engine.decide(&btc, &signal(true), &exposure(dec!(20)), &blocks, t0() + Duration::minutes(30));
        assert_eq!(early.reason(), Some(NoneReason::TimeBlocked));
        assert_eq!(early.gate.time_block_remaining_secs, Some(1800));
        assert!(early.to_string().starts_with("Buy blocked - 30m 0s remaining"));

        let late = engine.decide(&btc, &signal(true), &exposure(dec!(20)), &blocks, t0() + Duration::minutes(61));
        assert!(late.is_buy());
    }

    #[test]
    fn reasons_follow_priority_order() {
        let btc = Symbol::from("BTCUSDT");
        let mut blocks = BuyBlockState::new();
        blocks.record_buy(&btc, t0());
        let engine = engine();
        let now = t0() + Duration::minutes(10);

        // Everything blocked: the missing signal is reported first.
        let d = engine.decide(&btc, &signal(false), &exposure(dec!(140)), &blocks, now);
        assert_eq!(d.reason(), Some(NoneReason::NoSignal));

        // Signal present: time block beats capacity.
        let d = engine.decide(&btc, &signal(true), &exposure(dec!(140)), &blocks, now);
        assert_eq!(d.reason(), Some(NoneReason::TimeBlocked));

        let d = engine.decide(&btc, &signal(true), &exposure(dec!(140)), &BuyBlockState::new(), now);
        assert_eq!(d.reason(), Some(NoneReason::CapacityBlocked));
        assert_eq!(d.to_string(), "Position limit reached ($140.00/$140.00)");

        let d = engine.decide(&btc, &signal(true), &exposure(dec!(130)), &BuyBlockState::new(), now);
        assert_eq!(d.to_string(), "Insufficient capacity ($10.00 < $20.00)");
    }

    #[test]
    fn rejects_ceiling_below_slice() {
        let settings = BuyGateSettings {
            position_value_usd: 50.0,
            max_position_value_usd: 20.0,
            buy_block_minutes: 60,
        };
        assert!(LiveDecisionEngine::new(&settings).is_err());
    }
}

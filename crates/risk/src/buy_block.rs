// In crates/risk/src/buy_block.rs

use chrono::{DateTime, Duration, Utc};
use core_types::Symbol;
use std::collections::HashMap;

/// Last confirmed buy per asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyBlockState {
    last_buy: HashMap<Symbol, DateTime<Utc>>,
}

impl BuyBlockState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_buy(&self, symbol: &Symbol) -> Option<DateTime<Utc>> {
        self.last_buy.get(symbol).copied()
    }

    /// Time left until `symbol` may be bought again, or `None` if it may be bought now.
    pub fn remaining(&self, symbol: &Symbol, now: DateTime<Utc>, block: Duration) -> Option<Duration> {
        let last = self.last_buy(symbol)?;
        let elapsed = now - last;
        (elapsed < block).then(|| block - elapsed)
    }

    pub fn can_buy(&self, symbol: &Symbol, now: DateTime<Utc>, block: Duration) -> bool {
        self.remaining(symbol, now, block).is_none()
    }

    /// Records a confirmed buy. An older timestamp never replaces a newer one.
    pub fn record_buy(&mut self, symbol: &Symbol, at: DateTime<Utc>) {
        self.last_buy
            .entry(symbol.clone())
            .and_modify(|last| *last = (*last).max(at))
            .or_insert(at);
        tracing::debug!(symbol = %symbol, at = %at, "Recorded buy");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn blocks_until_duration_elapses() {
        let btc = Symbol::from("BTCUSDT");
        let block = Duration::minutes(60);
        let mut state = BuyBlockState::new();
        assert!(state.can_buy(&btc, t0(), block));

        state.record_buy(&btc, t0());
        assert!(!state.can_buy(&btc, t0() + Duration::minutes(30), block));
        assert_eq!(
            state.remaining(&btc, t0() + Duration::minutes(30), block),
            Some(Duration::minutes(30))
        );
        assert!(state.can_buy(&btc, t0() + Duration::minutes(60), block));
        assert!(state.can_buy(&btc, t0() + Duration::minutes(61), block));
    }

    #[test]
    fn assets_are_independent() {
        let mut state = BuyBlockState::new();
        state.record_buy(&Symbol::from("BTCUSDT"), t0());
        assert!(state.can_buy(&Symbol::from("ETHUSDT"), t0(), Duration::minutes(60)));
    }

    #[test]
    fn timestamps_never_move_backwards() {
        let btc = Symbol::from("BTCUSDT");
        let mut state = BuyBlockState::new();
        state.record_buy(&btc, t0());
        state.record_buy(&btc, t0() - Duration::minutes(5));
        assert_eq!(state.last_buy(&btc), Some(t0()));
    }
}

// In crates/engine/src/cycle.rs

use crate::Engine;
use chrono::{DateTime, Utc};
use core_types::{Execution, PositionInfo, Symbol};
use execution::size_market_buy;
use risk::{Action, Decision, PositionExposure};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, info, warn};

/// The external call an asset failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureStage {
    Candles,
    Positions,
    Prices,
    Metadata,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FailureStage::Candles => "candles",
            FailureStage::Positions => "positions",
            FailureStage::Prices => "prices",
            FailureStage::Metadata => "metadata",
        };
        f.write_str(stage)
    }
}

/// What happened to one asset in one cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetOutcome {
    /// The decision was not to buy.
    Skipped { decision: Decision },
    Bought { decision: Decision, execution: Execution },
    /// A buy was decided but no fill came back. The buy block is left untouched.
    OrderFailed { decision: Decision, reason: String },
    /// The asset could not be evaluated at all.
    Failed {
        symbol: Symbol,
        stage: FailureStage,
        error: String,
    },
}

impl AssetOutcome {
    fn failed(symbol: &Symbol, stage: FailureStage, error: impl ToString) -> Self {
        AssetOutcome::Failed {
            symbol: symbol.clone(),
            stage,
            error: error.to_string(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        match self {
            AssetOutcome::Skipped { decision }
            | AssetOutcome::Bought { decision, .. }
            | AssetOutcome::OrderFailed { decision, .. } => &decision.symbol,
            AssetOutcome::Failed { symbol, .. } => symbol,
        }
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            AssetOutcome::Skipped { decision }
            | AssetOutcome::Bought { decision, .. }
            | AssetOutcome::OrderFailed { decision, .. } => Some(decision),
            AssetOutcome::Failed { .. } => None,
        }
    }

    pub fn is_bought(&self) -> bool {
        matches!(self, AssetOutcome::Bought { .. })
    }
}

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CycleSummary {
    /// Assets whose price was inside the buy range.
    pub buy_signals: usize,
    /// Buys attempted.
    pub actions_taken: usize,
    pub successful: usize,
    /// Failed orders plus assets that could not be evaluated.
    pub failures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub at: DateTime<Utc>,
    pub outcomes: Vec<AssetOutcome>,
}

impl CycleReport {
    pub fn summary(&self) -> CycleSummary {
        let mut summary = CycleSummary::default();
        for outcome in &self.outcomes {
            if outcome.decision().is_some_and(|d| d.signal.in_range) {
                summary.buy_signals += 1;
            }
            match outcome {
                AssetOutcome::Skipped { .. } => {}
                AssetOutcome::Bought { .. } => {
                    summary.actions_taken += 1;
                    summary.successful += 1;
                }
                AssetOutcome::OrderFailed { .. } => {
                    summary.actions_taken += 1;
                    summary.failures += 1;
                }
                AssetOutcome::Failed { .. } => summary.failures += 1,
            }
        }
        summary
    }

    pub fn outcome(&self, symbol: &Symbol) -> Option<&AssetOutcome> {
        self.outcomes.iter().find(|o| o.symbol() == symbol)
    }
}

/// Positions and mid prices read once per cycle and shared by every asset.
#[derive(Debug, Clone, Default)]
pub(crate) struct AccountSnapshot {
    pub positions: HashMap<Symbol, PositionInfo>,
    pub mid_prices: HashMap<Symbol, Decimal>,
}

impl AccountSnapshot {
    /// `|signed_size| * mid_price` of `symbol`; no position means no exposure.
    pub fn exposure(&self, symbol: &Symbol) -> Result<PositionExposure, String> {
        let Some(position) = self.positions.get(symbol).filter(|p| p.is_open()) else {
            return Ok(PositionExposure::default());
        };
        let mid = self
            .mid_prices
            .get(symbol)
            .ok_or_else(|| format!("no mid price for open position in {symbol}"))?;
        Ok(PositionExposure {
            has_open_position: true,
            current_value_usd: position.signed_size.abs() * mid,
        })
    }
}

impl Engine {
    /// Evaluates every asset once and buys where the gates allow it.
    ///
    /// Never fails as a whole: an asset whose data cannot be fetched is reported
    /// as `Failed` and the remaining assets are still processed.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        self.cycles += 1;
        let cycle = self.cycles;
        info!(cycle, assets = self.symbols.len(), "Starting rolling-low trading cycle");

        let snapshot = self.account_snapshot().await;
        let mut outcomes = Vec::with_capacity(self.symbols.len());
        for symbol in self.symbols.clone() {
            let outcome = match &snapshot {
                Ok(snapshot) => self.process_asset(&symbol, snapshot, now).await,
                Err((stage, e)) => AssetOutcome::failed(&symbol, *stage, e),
            };
            log_outcome(&outcome);
            outcomes.push(outcome);
        }

        let report = CycleReport {
            cycle,
            at: now,
            outcomes,
        };
        let summary = report.summary();
        info!(
            cycle,
            buy_signals = summary.buy_signals,
            actions_taken = summary.actions_taken,
            successful = summary.successful,
            failures = summary.failures,
            "Trading cycle completed"
        );
        report
    }

    pub(crate) async fn account_snapshot(&self) -> Result<AccountSnapshot, (FailureStage, String)> {
        let positions = self
            .executor
            .open_positions()
            .await
            .map_err(|e| (FailureStage::Positions, e.to_string()))?;
        let mid_prices = self
            .source
            .mid_prices()
            .await
            .map_err(|e| (FailureStage::Prices, e.to_string()))?;
        Ok(AccountSnapshot {
            positions,
            mid_prices,
        })
    }

    async fn process_asset(
        &mut self,
        symbol: &Symbol,
        snapshot: &AccountSnapshot,
        now: DateTime<Utc>,
    ) -> AssetOutcome {
        let series = match self.source.candles(symbol, &self.interval, self.candle_limit).await {
            Ok(series) => series,
            Err(e) => return AssetOutcome::failed(symbol, FailureStage::Candles, e),
        };
        let Some(analysis) = self.signal.analyze(&series) else {
            return AssetOutcome::failed(symbol, FailureStage::Candles, "no candles returned");
        };
        debug!(
            symbol = %symbol,
            signal = %analysis.signal_type,
            strength = %analysis.strength,
            volatility_pct = analysis.volatility_pct,
            buy_opportunities = analysis.buy_opportunities,
            "Window analyzed"
        );
        let signal = analysis.latest;
        let exposure = match snapshot.exposure(symbol) {
            Ok(exposure) => exposure,
            Err(e) => return AssetOutcome::failed(symbol, FailureStage::Prices, e),
        };

        let decision = self.risk.decide(symbol, &signal, &exposure, &self.blocks, now);
        let Action::Buy { notional_usd } = decision.action else {
            return AssetOutcome::Skipped { decision };
        };

        let price = snapshot.mid_prices.get(symbol).copied().unwrap_or(signal.close);
        let size_decimals = match self.size_decimals_for(symbol).await {
            Ok(Some(decimals)) => decimals,
            Ok(None) => {
                return AssetOutcome::OrderFailed {
                    decision,
                    reason: format!("Could not find size decimals for {symbol}"),
                };
            }
            Err(e) => return AssetOutcome::failed(symbol, FailureStage::Metadata, e),
        };
        let order = match size_market_buy(symbol, notional_usd, price, size_decimals) {
            Ok(order) => order,
            Err(e) => {
                return AssetOutcome::OrderFailed {
                    decision,
                    reason: e.to_string(),
                };
            }
        };

        info!(
            symbol = %symbol,
            price = %price,
            window_low = %signal.window_low,
            distance_pct = %signal.distance_pct.round_dp(3),
            strength = %analysis.strength,
            current_value = %exposure.current_value_usd.round_dp(2),
            remaining_capacity = %decision.gate.remaining_capacity_usd.round_dp(2),
            quantity = %order.quantity,
            "Executing market buy"
        );
        match self.executor.execute(&order).await {
            Ok(execution) => {
                self.blocks.record_buy(symbol, now);
                AssetOutcome::Bought {
                    decision,
                    execution,
                }
            }
            Err(e) => AssetOutcome::OrderFailed {
                decision,
                reason: e.to_string(),
            },
        }
    }

    /// Size decimals are fetched once and refreshed only when an unknown symbol shows up.
    async fn size_decimals_for(&mut self, symbol: &Symbol) -> api_client::Result<Option<u32>> {
        if !self.size_decimals.contains_key(symbol) {
            self.size_decimals = self.source.size_decimals().await?;
            debug!(symbols = self.size_decimals.len(), "Refreshed size decimals");
        }
        Ok(self.size_decimals.get(symbol).copied())
    }
}

fn log_outcome(outcome: &AssetOutcome) {
    match outcome {
        AssetOutcome::Skipped { decision } => {
            info!(symbol = %decision.symbol, "{}", decision);
            if decision.signal.in_range {
                info!(
                    symbol = %decision.symbol,
                    price = %decision.signal.close,
                    window_low = %decision.signal.window_low,
                    "Price inside buy range"
                );
            }
        }
        AssetOutcome::Bought { execution, .. } => info!(
            symbol = %execution.symbol,
            price = %execution.price,
            quantity = %execution.quantity,
            fee = %execution.fee.round_dp(6),
            "Market buy executed successfully"
        ),
        AssetOutcome::OrderFailed { decision, reason } => {
            warn!(symbol = %decision.symbol, reason = %reason, "Market buy failed")
        }
        AssetOutcome::Failed {
            symbol,
            stage,
            error,
        } => error!(symbol = %symbol, stage = %stage, error = %error, "Asset evaluation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(symbol: &str, size: Decimal) -> (Symbol, PositionInfo) {
        let symbol = Symbol::from(symbol);
        (
            symbol.clone(),
            PositionInfo {
                symbol,
                signed_size: size,
                entry_price: Some(dec!(100)),
            },
        )
    }

    #[test]
    fn exposure_is_absolute_size_times_mid() {
        let snapshot = AccountSnapshot {
            positions: [position("BTCUSDT", dec!(-0.5))].into_iter().collect(),
            mid_prices: [(Symbol::from("BTCUSDT"), dec!(200))].into_iter().collect(),
        };
        let exposure = snapshot.exposure(&Symbol::from("BTCUSDT")).unwrap();
        assert!(exposure.has_open_position);
        assert_eq!(exposure.current_value_usd, dec!(100));

        let flat = snapshot.exposure(&Symbol::from("ETHUSDT")).unwrap();
        assert_eq!(flat, PositionExposure::default());
    }

    #[test]
    fn open_position_without_price_is_an_error() {
        let snapshot = AccountSnapshot {
            positions: [position("BTCUSDT", dec!(1))].into_iter().collect(),
            mid_prices: HashMap::new(),
        };
        assert!(snapshot.exposure(&Symbol::from("BTCUSDT")).is_err());
    }

    #[test]
    fn failures_count_in_summary() {
        let report = CycleReport {
            cycle: 1,
            at: Utc::now(),
            outcomes: vec![
                AssetOutcome::failed(&Symbol::from("BTCUSDT"), FailureStage::Candles, "timeout"),
                AssetOutcome::failed(&Symbol::from("ETHUSDT"), FailureStage::Prices, "timeout"),
            ],
        };
        assert_eq!(
            report.summary(),
            CycleSummary {
                buy_signals: 0,
                actions_taken: 0,
                successful: 0,
                failures: 2,
            }
        );
        assert!(report.outcome(&Symbol::from("ETHUSDT")).is_some());
    }
}

// In crates/engine/src/status.rs

use crate::Engine;
use crate::{Error, Result};
use crate::cycle::AccountSnapshot;
use chrono::{DateTime, Utc};
use core_types::Symbol;
use risk::GateStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use strategies::WindowAnalysis;
use tracing::{info, warn};

/// Gates of one asset, independent of any signal.
#[derive(Debug, Clone, Serialize)]
pub struct AssetStatus {
    pub symbol: Symbol,
    pub has_position: bool,
    pub gate: GateStatus,
}

impl AssetStatus {
    fn position_line(&self) -> String {
        let gate = &self.gate;
        if gate.current_value_usd > Decimal::ZERO {
            let state = if gate.can_buy_capacity { "CAN BUY" } else { "LIMIT REACHED" };
            format!(
                "${:.2}/${:.2} | Remaining: ${:.2} ({:.1} trades) | {}",
                gate.current_value_usd,
                gate.max_position_value_usd,
                gate.remaining_capacity_usd,
                gate.remaining_trades,
                state
            )
        } else {
            format!(
                "No position | Can buy: ${:.2} ({:.1} trades) | CAN BUY",
                gate.max_position_value_usd, gate.remaining_trades
            )
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = if self.gate.can_buy_time { "TIME OK" } else { "TIME BLOCKED" };
        let overall = if self.gate.ready() { "READY" } else { "BLOCKED" };
        write!(
            f,
            "{}: {} | Time: {} | Overall: {}",
            self.symbol,
            self.position_line(),
            time,
            overall
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioStatus {
    pub at: DateTime<Utc>,
    pub account_value: Option<Decimal>,
    pub assets: Vec<AssetStatus>,
    /// Assets whose exposure could not be valued, with the reason.
    pub unavailable: Vec<(Symbol, String)>,
}

/// The window analysis of one asset, or why it could not be built.
#[derive(Debug, Clone, Serialize)]
pub struct AssetAnalysis {
    pub symbol: Symbol,
    pub analysis: Option<WindowAnalysis>,
    pub error: Option<String>,
}

impl fmt::Display for AssetAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(a) = &self.analysis else {
            return write!(f, "{}: unavailable - {}", self.symbol, self.error.as_deref().unwrap_or("unknown"));
        };
        write!(
            f,
            "{}: {} ({}) | Price: ${:.4} | Low: ${:.4} | Range top: ${:.4} | Distance: {:.3}% | Volatility: {:.2}% | Opportunities: {}/{}",
            self.symbol,
            a.signal_type,
            a.strength,
            a.latest.close,
            a.latest.window_low,
            a.latest.buy_range_upper,
            a.latest.distance_pct,
            a.volatility_pct,
            a.buy_opportunities,
            a.bars
        )
    }
}

impl Engine {
    /// Fetches the window of every traded asset and summarizes it. Nothing is bought.
    pub async fn analyze_assets(&self) -> Vec<AssetAnalysis> {
        let mut analyses = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            let result = self
                .source
                .candles(symbol, &self.interval, self.candle_limit)
                .await
                .map_err(Error::from)
                .and_then(|series| {
                    self.signal
                        .analyze(&series)
                        .ok_or_else(|| Error::NoCandles(symbol.to_string()))
                });
            let entry = match result {
                Ok(analysis) => AssetAnalysis {
                    symbol: symbol.clone(),
                    analysis: Some(analysis),
                    error: None,
                },
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "Window analysis failed");
                    AssetAnalysis {
                        symbol: symbol.clone(),
                        analysis: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            analyses.push(entry);
        }
        analyses
    }

    /// Capacity and time gates of every traded asset.
    pub async fn portfolio_status(&self, now: DateTime<Utc>) -> Result<PortfolioStatus> {
        let positions = self.executor.open_positions().await?;
        let mid_prices = self.source.mid_prices().await?;
        let snapshot = AccountSnapshot {
            positions,
            mid_prices,
        };

        let account_value = match self.source.account_value().await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Could not read account value");
                None
            }
        };

        let mut assets = Vec::with_capacity(self.symbols.len());
        let mut unavailable = Vec::new();
        for symbol in &self.symbols {
            match snapshot.exposure(symbol) {
                Ok(exposure) => assets.push(AssetStatus {
                    symbol: symbol.clone(),
                    has_position: exposure.has_open_position,
                    gate: self.risk.gate_status(symbol, &exposure, &self.blocks, now),
                }),
                Err(reason) => unavailable.push((symbol.clone(), reason)),
            }
        }

        Ok(PortfolioStatus {
            at: now,
            account_value,
            assets,
            unavailable,
        })
    }

    /// Logs the portfolio status; a failure to read it is logged, never raised.
    pub async fn log_portfolio_status(&self, now: DateTime<Utc>) {
        match self.portfolio_status(now).await {
            Ok(status) => log_status(&status),
            Err(e) => warn!(error = %e, "Error getting portfolio status"),
        }
    }
}

pub fn log_status(status: &PortfolioStatus) {
    info!("PORTFOLIO STATUS");
    if let Some(value) = status.account_value {
        info!(account_value = %value.round_dp(2), "Account value");
    }
    for asset in &status.assets {
        info!(symbol = %asset.symbol, "{}", asset);
        if let Some(message) = asset.gate.time_block_message() {
            info!(symbol = %asset.symbol, "{}", message);
        }
    }
    for (symbol, reason) in &status.unavailable {
        warn!(symbol = %symbol, reason = %reason, "Asset status unavailable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gate(current: Decimal, can_buy_time: bool) -> GateStatus {
        let remaining = dec!(140) - current;
        GateStatus {
            current_value_usd: current,
            max_position_value_usd: dec!(140),
            remaining_capacity_usd: remaining,
            remaining_trades: remaining / dec!(20),
            can_buy_capacity: remaining >= dec!(20),
            can_buy_time,
            time_block_remaining_secs: (!can_buy_time).then_some(600),
            last_buy: None,
        }
    }

    fn status(current: Decimal, can_buy_time: bool) -> AssetStatus {
        AssetStatus {
            symbol: Symbol::from("BTCUSDT"),
            has_position: current > Decimal::ZERO,
            gate: gate(current, can_buy_time),
        }
    }

    #[test]
    fn flat_asset_shows_full_capacity() {
        assert_eq!(
            status(dec!(0), true).to_string(),
            "BTCUSDT: No position | Can buy: $140.00 (7.0 trades) | CAN BUY | Time: TIME OK | Overall: READY"
        );
    }

    #[test]
    fn full_asset_shows_limit_and_time_block() {
        assert_eq!(
            status(dec!(140), false).to_string(),
            "BTCUSDT: $140.00/$140.00 | Remaining: $0.00 (0.0 trades) | LIMIT REACHED | Time: TIME BLOCKED | Overall: BLOCKED"
        );
    }
}

// In crates/engine/src/lib.rs

pub mod cycle;
pub mod error;
pub mod sources;
pub mod status;

use api_client::MAX_KLINES_PER_REQUEST;
use app_config::Settings;
use chrono::Utc;
use core_types::Symbol;
use execution::Executor;
use risk::{BuyBlockState, LiveDecisionEngine, RiskManager};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use strategies::RollingLowSignal;
use tokio::time::MissedTickBehavior;

pub use cycle::{AssetOutcome, CycleReport, CycleSummary, FailureStage};
pub use error::{Error, Result};
pub use sources::MarketDataSource;
pub use status::{AssetAnalysis, AssetStatus, PortfolioStatus, log_status};

/// The live accumulation loop over a fixed list of assets.
///
/// Assets are processed one after another within a cycle. The only state carried
/// between cycles is the buy-block map and the cached exchange metadata.
pub struct Engine {
    symbols: Vec<Symbol>,
    interval: String,
    candle_limit: u16,
    signal: RollingLowSignal,
    risk: Box<dyn RiskManager>,
    executor: Box<dyn Executor>,
    source: Box<dyn MarketDataSource>,
    blocks: BuyBlockState,
    size_decimals: HashMap<Symbol, u32>,
    cycles: u64,
}

impl Engine {
    pub fn new(
        symbols: Vec<Symbol>,
        interval: impl Into<String>,
        signal: RollingLowSignal,
        risk: Box<dyn RiskManager>,
        executor: Box<dyn Executor>,
        source: Box<dyn MarketDataSource>,
    ) -> Result<Self> {
        if symbols.is_empty() {
            return Err(Error::NoAssets);
        }
        // The whole window has to come back from a single klines request.
        let candle_limit = u16::try_from(signal.window_size())
            .ok()
            .filter(|limit| *limit <= MAX_KLINES_PER_REQUEST)
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "window_size {} exceeds the {} bars one request can return",
                    signal.window_size(),
                    MAX_KLINES_PER_REQUEST
                ))
            })?;

        Ok(Self {
            symbols,
            interval: interval.into(),
            candle_limit,
            signal,
            risk,
            executor,
            source,
            blocks: BuyBlockState::new(),
            size_decimals: HashMap::new(),
            cycles: 0,
        })
    }

    /// Builds the signal and the decision engine from validated settings.
    pub fn from_settings(
        settings: &Settings,
        symbols: Vec<Symbol>,
        executor: Box<dyn Executor>,
        source: Box<dyn MarketDataSource>,
    ) -> Result<Self> {
        let signal = RollingLowSignal::from_settings(&settings.signal)?;
        let risk = LiveDecisionEngine::new(&settings.live.gate())?;
        Self::new(
            symbols,
            settings.signal.interval.clone(),
            signal,
            Box::new(risk),
            executor,
            source,
        )
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn blocks(&self) -> &BuyBlockState {
        &self.blocks
    }

    /// Cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Runs a cycle every `cycle_interval` until `shutdown` resolves, logging the
    /// portfolio status on the first cycle and every `status_every` cycles after it.
    ///
    /// `shutdown` is only observed between cycles, so a cycle in flight always
    /// completes. Returns the number of cycles run.
    pub async fn run<F>(&mut self, cycle_interval: Duration, status_every: u64, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            assets = self.symbols.len(),
            interval = %self.interval,
            window = self.signal.window_size(),
            range_pct = %self.signal.range_pct(),
            risk = self.risk.name(),
            executor = self.executor.name(),
            cycle_secs = cycle_interval.as_secs(),
            "Starting buy-only accumulation loop"
        );

        let mut ticker = tokio::time::interval(cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        let started_with = self.cycles;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!(cycles = self.cycles - started_with, "Trading loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let now = Utc::now();
                    if status_due(self.cycles + 1, status_every) {
                        self.log_portfolio_status(now).await;
                    }
                    self.run_cycle(now).await;
                    tracing::info!(next_in_secs = cycle_interval.as_secs(), "Waiting for next cycle");
                }
            }
        }
        self.cycles - started_with
    }
}

/// Cycle numbers start at 1; the status is due on 1, 1 + every, 1 + 2 * every, ...
fn status_due(cycle: u64, every: u64) -> bool {
    every > 0 && (cycle.saturating_sub(1)) % every == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_due_on_first_and_every_nth_cycle() {
        let due: Vec<u64> = (1..=25).filter(|c| status_due(*c, 10)).collect();
        assert_eq!(due, vec![1, 11, 21]);
        assert!(!status_due(1, 0));
    }
}

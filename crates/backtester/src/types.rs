// In crates/backtester/src/types.rs

use crate::{Error, Result};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Settings for the single-position take-profit / stop-loss backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTripSettings {
    /// USD staked on every entry (and the starting capital of the run).
    pub position_size_usd: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    /// Stake the realized equity instead of the fixed size.
    #[serde(default)]
    pub reinvest_proceeds: bool,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for RoundTripSettings {
    fn default() -> Self {
        Self {
            position_size_usd: 1000.0,
            take_profit_pct: 5.0,
            stop_loss_pct: 3.0,
            reinvest_proceeds: false,
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

impl RoundTripSettings {
    pub fn validate(&self) -> Result<()> {
        positive("position_size_usd", self.position_size_usd)?;
        positive("take_profit_pct", self.take_profit_pct)?;
        positive("stop_loss_pct", self.stop_loss_pct)?;
        interval("check_interval_secs", self.check_interval_secs)
    }
}

/// Settings for the buy-only accumulation backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulationSettings {
    pub initial_capital: f64,
    pub max_buy_amount: f64,
    pub max_buys_per_day: u32,
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
}

impl Default for AccumulationSettings {
    fn default() -> Self {
        Self {
            initial_capital: 100.0,
            max_buy_amount: 10.0,
            max_buys_per_day: 10,
            check_interval_secs: default_check_interval_secs(),
        }
    }
}

impl AccumulationSettings {
    pub fn validate(&self) -> Result<()> {
        positive("initial_capital", self.initial_capital)?;
        positive("max_buy_amount", self.max_buy_amount)?;
        if self.max_buys_per_day == 0 {
            return Err(Error::InvalidSettings(
                "max_buys_per_day must be at least 1".to_string(),
            ));
        }
        interval("check_interval_secs", self.check_interval_secs)
    }
}

/// Candidate range widths tried by the sweep, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSettings {
    #[serde(default = "default_candidates")]
    pub range_candidates: Vec<f64>,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            range_candidates: default_candidates(),
        }
    }
}

impl SweepSettings {
    pub fn validate(&self) -> Result<()> {
        if self.range_candidates.is_empty() {
            return Err(Error::InvalidSettings(
                "range_candidates must not be empty".to_string(),
            ));
        }
        for &candidate in &self.range_candidates {
            if !candidate.is_finite() || candidate < 0.0 {
                return Err(Error::InvalidSettings(format!(
                    "range candidate {candidate} must be a finite, non-negative percentage"
                )));
            }
        }
        Ok(())
    }
}

fn default_check_interval_secs() -> u64 {
    60
}

/// 0.05 % to 0.50 % in 0.05 steps.
fn default_candidates() -> Vec<f64> {
    (1..=10).map(|i| f64::from(i) * 0.05).collect()
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidSettings(format!(
            "{name} must be a positive number (got {value})"
        )))
    }
}

fn interval(name: &str, secs: u64) -> Result<()> {
    if secs == 0 {
        return Err(Error::InvalidSettings(format!("{name} must be at least 1")));
    }
    Ok(())
}

/// Converts a validated configuration value to a decimal.
pub(crate) fn to_decimal(name: &str, value: f64) -> Result<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| Error::InvalidSettings(format!("{name} ({value}) is not representable")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates_step_by_five_hundredths() {
        let candidates = default_candidates();
        assert_eq!(candidates.len(), 10);
        assert!((candidates[0] - 0.05).abs() < 1e-12);
        assert!((candidates[9] - 0.50).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_sizes() {
        let mut settings = RoundTripSettings::default();
        settings.position_size_usd = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = AccumulationSettings::default();
        settings.max_buys_per_day = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_negative_candidates() {
        let settings = SweepSettings {
            range_candidates: vec![0.1, -0.2],
        };
        assert!(settings.validate().is_err());
    }
}

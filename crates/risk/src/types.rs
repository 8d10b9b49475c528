// In crates/risk/src/types.rs

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Position sizing and pacing rules for the live accumulation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyGateSettings {
    /// USD value of every buy.
    pub position_value_usd: f64,
    /// Per-asset ceiling on the total position value.
    pub max_position_value_usd: f64,
    /// Minimum time between two buys of the same asset.
    #[serde(default = "default_buy_block_minutes")]
    pub buy_block_minutes: u64,
}

fn default_buy_block_minutes() -> u64 {
    60
}

impl Default for BuyGateSettings {
    fn default() -> Self {
        Self {
            position_value_usd: 20.0,
            max_position_value_usd: 140.0,
            buy_block_minutes: default_buy_block_minutes(),
        }
    }
}

impl BuyGateSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("position_value_usd", self.position_value_usd),
            ("max_position_value_usd", self.max_position_value_usd),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidParameters(format!(
                    "{name} must be a positive number (got {value})"
                )));
            }
        }
        if self.max_position_value_usd < self.position_value_usd {
            return Err(Error::InvalidParameters(format!(
                "max_position_value_usd ({}) is smaller than position_value_usd ({})",
                self.max_position_value_usd, self.position_value_usd
            )));
        }
        if i64::try_from(self.buy_block_minutes).is_err() {
            return Err(Error::InvalidParameters(
                "buy_block_minutes is out of range".to_string(),
            ));
        }
        Ok(())
    }
}

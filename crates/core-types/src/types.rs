// In crates/core-types/src/types.rs

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tradable asset identifier, e.g. "BTCUSDT".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Symbol(value.to_string())
    }
}

/// A market buy ready to be handed to an executor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    /// Base-asset quantity, already rounded to the asset's size decimals.
    pub quantity: Decimal,
    /// The USD value the order was sized from.
    pub notional_usd: Decimal,
    /// The price the quantity was derived from.
    pub reference_price: Decimal,
}

/// The confirmed result of an executed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Execution {
    pub symbol: Symbol,
    pub price: Decimal,
    pub quantity: Decimal,
    pub fee: Decimal,
    pub source_request: OrderRequest,
}

/// An open position as reported by the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub symbol: Symbol,
    /// Positive for long, negative for short.
    pub signed_size: Decimal,
    pub entry_price: Option<Decimal>,
}

impl PositionInfo {
    pub fn is_open(&self) -> bool {
        !self.signed_size.is_zero()
    }
}

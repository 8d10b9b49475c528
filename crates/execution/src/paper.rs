// In crates/execution/src/paper.rs

use crate::{Error, Executor, Result};
use app_config::PaperSettings;
use async_trait::async_trait;
use core_types::{Execution, OrderRequest, PositionInfo, Symbol};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Simulated fills at the reference price plus slippage, with positions kept in
/// memory so capacity checks behave as they would live.
#[derive(Debug, Clone)]
pub struct PaperExecutor {
    taker_fee: Decimal,
    slippage: Decimal,
    positions: HashMap<Symbol, PositionInfo>,
}

impl PaperExecutor {
    pub fn new(settings: &PaperSettings) -> Result<Self> {
        let fraction = |name: &str, value: f64| {
            Decimal::from_f64(value).ok_or_else(|| Error::Rejected {
                reason: format!("paper {name} ({value}) is not representable"),
            })
        };
        Ok(Self {
            taker_fee: fraction("taker_fee", settings.taker_fee)?,
            slippage: fraction("slippage_percent", settings.slippage_percent)?,
            positions: HashMap::new(),
        })
    }
}

#[async_trait]
impl Executor for PaperExecutor {
    fn name(&self) -> &'static str {
        "PaperExecutor"
    }

    async fn execute(&mut self, order: &OrderRequest) -> Result<Execution> {
        if order.quantity <= Decimal::ZERO || order.reference_price <= Decimal::ZERO {
            return Err(Error::ExecutionFailed {
                reason: format!(
                    "Invalid paper order: quantity {} at {}",
                    order.quantity, order.reference_price
                ),
            });
        }

        // A buy fills above the reference price.
        let execution_price = order.reference_price * (dec!(1) + self.slippage);
        let fee = order.quantity * execution_price * self.taker_fee;

        let position = self
            .positions
            .entry(order.symbol.clone())
            .or_insert_with(|| PositionInfo {
                symbol: order.symbol.clone(),
                signed_size: Decimal::ZERO,
                entry_price: None,
            });
        let new_size = position.signed_size + order.quantity;
        let previous_cost = position.entry_price.unwrap_or(Decimal::ZERO) * position.signed_size;
        position.entry_price = Some((previous_cost + execution_price * order.quantity) / new_size);
        position.signed_size = new_size;

        tracing::info!(
            symbol = %order.symbol,
            price = %execution_price,
            quantity = %order.quantity,
            fee = %fee.round_dp(6),
            position = %new_size,
            "Paper order filled"
        );

        Ok(Execution {
            symbol: order.symbol.clone(),
            price: execution_price,
            quantity: order.quantity,
            fee,
            source_request: order.clone(),
        })
    }

    async fn open_positions(&self) -> Result<HashMap<Symbol, PositionInfo>> {
        Ok(self
            .positions
            .iter()
            .filter(|(_, p)| p.is_open())
            .map(|(s, p)| (s.clone(), p.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(quantity: Decimal, price: Decimal) -> OrderRequest {
        OrderRequest {
            symbol: Symbol::from("BTCUSDT"),
            quantity,
            notional_usd: quantity * price,
            reference_price: price,
        }
    }

    #[tokio::test]
    async fn fills_with_slippage_and_fee() {
        let mut executor = PaperExecutor::new(&PaperSettings {
            taker_fee: 0.001,
            slippage_percent: 0.01,
        })
        .unwrap();
        let execution = executor.execute(&order(dec!(2), dec!(100))).await.unwrap();
        assert_eq!(execution.price, dec!(101));
        assert_eq!(execution.fee, dec!(0.202));
    }

    #[tokio::test]
    async fn accumulates_position_with_average_entry() {
        let mut executor = PaperExecutor::new(&PaperSettings {
            taker_fee: 0.0,
            slippage_percent: 0.0,
        })
        .unwrap();
        executor.execute(&order(dec!(1), dec!(100))).await.unwrap();
        executor.execute(&order(dec!(1), dec!(200))).await.unwrap();

        let positions = executor.open_positions().await.unwrap();
        let btc = &positions[&Symbol::from("BTCUSDT")];
        assert_eq!(btc.signed_size, dec!(2));
        assert_eq!(btc.entry_price, Some(dec!(150)));
    }

    #[tokio::test]
    async fn rejects_empty_orders() {
        let mut executor = PaperExecutor::new(&PaperSettings::default()).unwrap();
        assert!(executor.execute(&order(dec!(0), dec!(100))).await.is_err());
        assert!(executor.open_positions().await.unwrap().is_empty());
    }
}

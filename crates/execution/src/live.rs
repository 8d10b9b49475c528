// In crates/execution/src/live.rs

use crate::{Error, Executor, Result};
use api_client::ApiClient;
use async_trait::async_trait;
use core_types::{Execution, OrderRequest, PositionInfo, Symbol};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

/// Taker fee used to estimate the fee of a fill; the order response does not carry it.
const ESTIMATED_TAKER_FEE: Decimal = dec!(0.0004);

/// An executor that places real market orders on Binance.
#[derive(Debug, Clone)]
pub struct LiveExecutor {
    api_client: ApiClient,
}

impl LiveExecutor {
    pub fn new(api_client: ApiClient) -> Self {
        Self { api_client }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    fn name(&self) -> &'static str {
        "LiveExecutor"
    }

    async fn execute(&mut self, order_request: &OrderRequest) -> Result<Execution> {
        tracing::info!(
            symbol = %order_request.symbol,
            quantity = %order_request.quantity,
            notional = %order_request.notional_usd,
            "Placing live market buy"
        );

        let order_response = self
            .api_client
            .place_market_buy(&order_request.symbol, order_request.quantity)
            .await
            .map_err(|e| {
                tracing::error!(symbol = %order_request.symbol, error = %e, "Failed to place market order");
                Error::ExecutionFailed {
                    reason: format!("Failed to place order: {}", e),
                }
            })?;

        if order_response.executed_qty <= Decimal::ZERO {
            return Err(Error::ExecutionFailed {
                reason: format!(
                    "Order {} was not filled (status {})",
                    order_response.order_id, order_response.status
                ),
            });
        }
        tracing::info!(
            order_id = order_response.order_id,
            avg_price = %order_response.avg_price,
            executed_qty = %order_response.executed_qty,
            "Market order filled"
        );

        // The exchange fill is the source of truth for price and quantity.
        let price = if order_response.avg_price > Decimal::ZERO {
            order_response.avg_price
        } else {
            order_request.reference_price
        };
        Ok(Execution {
            symbol: order_request.symbol.clone(),
            price,
            quantity: order_response.executed_qty,
            fee: order_response.cum_quote * ESTIMATED_TAKER_FEE,
            source_request: order_request.clone(),
        })
    }

    async fn open_positions(&self) -> Result<HashMap<Symbol, PositionInfo>> {
        Ok(self.api_client.get_positions().await?)
    }
}

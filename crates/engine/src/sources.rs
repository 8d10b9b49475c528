// In crates/engine/src/sources.rs

use api_client::{ApiClient, Result};
use async_trait::async_trait;
use core_types::{CandleSeries, Symbol};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Everything the live cycle reads from the market, apart from positions.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// The most recent `limit` bars of `symbol`, oldest first.
    async fn candles(&self, symbol: &Symbol, interval: &str, limit: u16) -> Result<CandleSeries>;

    async fn mid_prices(&self) -> Result<HashMap<Symbol, Decimal>>;

    /// Quantity decimals per symbol.
    async fn size_decimals(&self) -> Result<HashMap<Symbol, u32>>;

    /// Total account value, when the source can see an account.
    async fn account_value(&self) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

#[async_trait]
impl MarketDataSource for ApiClient {
    async fn candles(&self, symbol: &Symbol, interval: &str, limit: u16) -> Result<CandleSeries> {
        self.fetch_candles(symbol, interval, limit).await
    }

    async fn mid_prices(&self) -> Result<HashMap<Symbol, Decimal>> {
        self.get_mid_prices().await
    }

    async fn size_decimals(&self) -> Result<HashMap<Symbol, u32>> {
        self.get_size_decimals().await
    }

    async fn account_value(&self) -> Result<Option<Decimal>> {
        if self.api_key.is_empty() || self.secret_key.is_empty() {
            return Ok(None);
        }
        let account = self.get_account_state().await?;
        Ok(Some(account.total_margin_balance))
    }
}

// In crates/execution/src/lib.rs

use async_trait::async_trait;
use core_types::{Execution, OrderRequest, PositionInfo, Symbol};
use std::collections::HashMap;

pub mod error;
pub mod live;
pub mod paper;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use live::LiveExecutor;
pub use paper::PaperExecutor;
pub use types::size_market_buy;

/// The universal interface for an execution handler.
///
/// An `Executor` takes a sized `OrderRequest` and submits it to a target, which
/// could be the live exchange or a paper simulation. It also reports the account's
/// open positions, since those are what the orders change.
#[async_trait]
pub trait Executor: Send + Sync {
    /// The name of the executor (e.g., "LiveExecutor", "PaperExecutor").
    fn name(&self) -> &'static str;

    /// Submits a market buy and waits for the fill.
    ///
    /// An `Err` means nothing was bought.
    async fn execute(&mut self, order_request: &OrderRequest) -> Result<Execution>;

    /// Open positions keyed by symbol.
    async fn open_positions(&self) -> Result<HashMap<Symbol, PositionInfo>>;
}

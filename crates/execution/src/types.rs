// In crates/execution/src/types.rs

use crate::{Error, Result};
use core_types::{OrderRequest, Symbol};
use rust_decimal::{Decimal, RoundingStrategy};

/// Sizes a market buy worth `notional_usd` at `price`, rounding the quantity
/// half-to-even to `size_decimals`.
///
/// A quantity that rounds to zero is rejected here, before any exchange call.
pub fn size_market_buy(
    symbol: &Symbol,
    notional_usd: Decimal,
    price: Decimal,
    size_decimals: u32,
) -> Result<OrderRequest> {
    if price <= Decimal::ZERO {
        return Err(Error::Rejected {
            reason: format!("no usable price for {symbol} (got {price})"),
        });
    }
    let quantity = (notional_usd / price)
        .round_dp_with_strategy(size_decimals, RoundingStrategy::MidpointNearestEven);
    if quantity <= Decimal::ZERO {
        return Err(Error::Rejected {
            reason: format!(
                "${notional_usd} at ${price} rounds to zero with {size_decimals} size decimals"
            ),
        });
    }
    Ok(OrderRequest {
        symbol: symbol.clone(),
        quantity,
        notional_usd,
        reference_price: price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_to_even() {
        let btc = Symbol::from("BTCUSDT");
        // 20 / 8000 = 0.0025 -> 0.002
        let order = size_market_buy(&btc, dec!(20), dec!(8000), 3).unwrap();
        assert_eq!(order.quantity, dec!(0.002));
        // 35 / 10000 = 0.0035 -> 0.004
        let order = size_market_buy(&btc, dec!(35), dec!(10000), 3).unwrap();
        assert_eq!(order.quantity, dec!(0.004));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = size_market_buy(&Symbol::from("BTCUSDT"), dec!(20), dec!(60000), 3).unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
    }

    #[test]
    fn missing_price_is_rejected() {
        let err = size_market_buy(&Symbol::from("BTCUSDT"), dec!(20), dec!(0), 3).unwrap_err();
        assert!(matches!(err, Error::Rejected { .. }));
    }
}

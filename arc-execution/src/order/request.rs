use super::state::{OrderType, TimeInForce};
use arc_instrument::{Side, Symbol};
use rust_decimal::Decimal;

/// Parameters for placing a new order. Validated by the exchange client against the
/// symbol's precision/minimum-amount rules before being sent over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub client_order_id: Option<super::id::ClientOrderId>,
}

impl OrderRequest {
    pub fn limit(symbol: Symbol, side: Side, quantity: Decimal, price: Decimal) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            time_in_force: TimeInForce::GoodTilCancel,
            client_order_id: None,
        }
    }

    pub fn market(symbol: Symbol, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
            time_in_force: TimeInForce::ImmediateOrCancel,
            client_order_id: None,
        }
    }

    /// Validate against the symbol's exchange-reported precision/minimum amounts.
    pub fn validate(&self, info: &arc_instrument::SymbolInfo) -> Result<(), String> {
        if self.quantity < info.min_base_amount {
            return Err(format!(
                "quantity {} below minimum {} for {}",
                self.quantity, info.min_base_amount, self.symbol
            ));
        }
        if let Some(price) = self.price {
            let notional = price * self.quantity;
            if notional < info.min_quote_amount {
                return Err(format!(
                    "notional {notional} below minimum {} for {}",
                    info.min_quote_amount, self.symbol
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arc_instrument::SymbolInfo;
    use rust_decimal_macros::dec;

    fn info() -> SymbolInfo {
        SymbolInfo {
            symbol: Symbol::spot("btc", "usdt"),
            base_precision: 6,
            quote_precision: 2,
            min_base_amount: dec!(0.001),
            min_quote_amount: dec!(10),
            maker_fee: dec!(0.001),
            taker_fee: dec!(0.002),
            active: true,
        }
    }

    #[test]
    fn test_validate_rejects_below_minimum_base_amount() {
        let request = OrderRequest::limit(
            Symbol::spot("btc", "usdt"),
            arc_instrument::Side::Buy,
            dec!(0.0001),
            dec!(50000),
        );
        assert!(request.validate(&info()).is_err());
    }

    #[test]
    fn test_validate_accepts_sufficient_amount() {
        let request = OrderRequest::limit(
            Symbol::spot("btc", "usdt"),
            arc_instrument::Side::Buy,
            dec!(0.01),
            dec!(50000),
        );
        assert!(request.validate(&info()).is_ok());
    }
}

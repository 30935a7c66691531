//! Order book that records resting pool orders and executes fills
//! against them on demand.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{Address, Amount, Coins, Dec, Denom, MarketId, OrderId, OrderSide, Rounding};
use crate::error::AmmError;
use crate::math::CheckedArithmetic;
use crate::traits::{BankKeeper, MatchingEngine, PoolOrderFill};

/// An order resting on an [`InMemoryOrderBook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingOrder {
    /// Order id.
    pub id: OrderId,
    /// Account the order was placed for.
    pub orderer: Address,
    /// Market.
    pub market_id: MarketId,
    /// Side.
    pub side: OrderSide,
    /// Limit price.
    pub price: Dec,
    /// Quantity still open.
    pub open_quantity: Amount,
}

/// A [`MatchingEngine`] without matching: orders rest until a test or
/// simulation fills them explicitly with [`InMemoryOrderBook::fill`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderBook {
    last_order_id: u64,
    orders: BTreeMap<OrderId, RestingOrder>,
}

impl InMemoryOrderBook {
    /// Resting orders of a market, best price first on each side: buys by
    /// descending price, then sells by ascending price.
    #[must_use]
    pub fn resting_orders(&self, market_id: MarketId) -> Vec<RestingOrder> {
        let (mut buys, mut sells): (Vec<_>, Vec<_>) = self
            .orders
            .values()
            .filter(|o| o.market_id == market_id)
            .cloned()
            .partition(|o| o.side.is_buy());
        buys.sort_by(|a, b| b.price.cmp(&a.price));
        sells.sort_by(|a, b| a.price.cmp(&b.price));
        buys.extend(sells);
        buys
    }

    /// Looks up a resting order.
    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<&RestingOrder> {
        self.orders.get(&id)
    }

    /// Executes `quantity` of a resting order against `taker`, moving the
    /// coins through `bank`, and returns the pool's fill report.
    ///
    /// The quote leg is `quantity × price` rounded down.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the order is not resting.
    /// - [`AmmError::InvalidAmount`] if `quantity` is zero or exceeds the
    ///   open quantity.
    /// - Propagates transfer errors from `bank`.
    pub fn fill<B: BankKeeper>(
        &mut self,
        bank: &mut B,
        taker: &Address,
        order_id: OrderId,
        quantity: Amount,
        base: &Denom,
        quote: &Denom,
    ) -> Result<PoolOrderFill, AmmError> {
        let order = self
            .orders
            .get_mut(&order_id)
            .ok_or(AmmError::NotFound("order not resting"))?;
        if quantity.is_zero() || quantity > order.open_quantity {
            return Err(AmmError::InvalidAmount("fill quantity out of bounds"));
        }
        let quote_amount = Amount::new(order.price.mul_int_to_int(quantity.get(), Rounding::Down)?);
        let base_coins = Coins::single(base.clone(), quantity);
        let quote_coins = Coins::single(quote.clone(), quote_amount);
        let (paid, received) = match order.side {
            OrderSide::Buy => {
                bank.transfer(&order.orderer, taker, &quote_coins)?;
                bank.transfer(taker, &order.orderer, &base_coins)?;
                (quote_amount, quantity)
            }
            OrderSide::Sell => {
                bank.transfer(&order.orderer, taker, &base_coins)?;
                bank.transfer(taker, &order.orderer, &quote_coins)?;
                (quantity, quote_amount)
            }
        };
        order.open_quantity = order.open_quantity.safe_sub(&quantity)?;
        let fill = PoolOrderFill {
            side: order.side,
            price: order.price,
            filled_quantity: quantity,
            open_quantity: order.open_quantity,
            paid,
            received,
        };
        if order.open_quantity.is_zero() {
            self.orders.remove(&order_id);
        }
        debug!(order_id = %order_id, side = %fill.side, price = %fill.price, quantity = %quantity, "pool order filled");
        Ok(fill)
    }
}

impl MatchingEngine for InMemoryOrderBook {
    fn place_limit_order(
        &mut self,
        orderer: &Address,
        market_id: MarketId,
        side: OrderSide,
        price: Dec,
        quantity: Amount,
    ) -> Result<OrderId, AmmError> {
        if quantity.is_zero() {
            return Err(AmmError::InvalidAmount("order quantity must be positive"));
        }
        self.last_order_id += 1;
        let id = OrderId::new(self.last_order_id);
        self.orders.insert(
            id,
            RestingOrder {
                id,
                orderer: orderer.clone(),
                market_id,
                side,
                price,
                open_quantity: quantity,
            },
        );
        Ok(id)
    }

    fn cancel_order(
        &mut self,
        orderer: &Address,
        _market_id: MarketId,
        order_id: OrderId,
    ) -> Result<(), AmmError> {
        match self.orders.get(&order_id) {
            Some(order) if &order.orderer != orderer => {
                Err(AmmError::Unauthorized("order belongs to another account"))
            }
            Some(_) => {
                self.orders.remove(&order_id);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

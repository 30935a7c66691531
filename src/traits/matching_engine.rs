//! Order-book matching engine contract.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Amount, Dec, MarketId, OrderId, OrderSide};
use crate::error::AmmError;

/// The exchange's matching engine, as seen by the pools.
///
/// Orders are placed on behalf of a pool's reserve account.  The engine
/// settles matched trades against that account itself and reports each
/// matched pool order back as a [`PoolOrderFill`].
pub trait MatchingEngine {
    /// Places a limit order.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the AMM propagates them unchanged.
    fn place_limit_order(
        &mut self,
        orderer: &Address,
        market_id: MarketId,
        side: OrderSide,
        price: Dec,
        quantity: Amount,
    ) -> Result<OrderId, AmmError>;

    /// Cancels a previously placed order.  Cancelling an order that is no
    /// longer resting (filled or already cancelled) is not an error.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the AMM propagates them unchanged.
    fn cancel_order(
        &mut self,
        orderer: &Address,
        market_id: MarketId,
        order_id: OrderId,
    ) -> Result<(), AmmError>;
}

/// Execution report of one pool order.
///
/// For a buy the pool **paid** `denom1` and **received** `denom0`
/// (`received == filled_quantity`); for a sell it paid `denom0` and
/// received `denom1` (`paid == filled_quantity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOrderFill {
    /// Side of the pool's order.
    pub side: OrderSide,
    /// Order price.
    pub price: Dec,
    /// Base quantity executed.
    pub filled_quantity: Amount,
    /// Base quantity left unexecuted.
    pub open_quantity: Amount,
    /// Amount the pool paid out.
    pub paid: Amount,
    /// Amount the pool received.
    pub received: Amount,
}

impl PoolOrderFill {
    /// Returns `true` if nothing of the order is left open.
    #[must_use]
    pub const fn is_fully_executed(&self) -> bool {
        self.open_quantity.is_zero()
    }
}

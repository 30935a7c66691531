//! Fundamental domain value types.
//!
//! Integer quantities ([`Amount`], [`Liquidity`]), the fixed-point
//! [`Dec`], the decimal [`Tick`] grid, denominations and addresses,
//! record identifiers, coin collections and growth accumulators.  All
//! types are newtypes with validated constructors where an invariant
//! exists.

mod amount;
mod coins;
mod dec;
mod denom;
mod ids;
mod liquidity;
mod quantity;
mod rounding;
mod side;
mod tick;

pub use amount::Amount;
pub use coins::{Coin, CoinPair, Coins, DecCoin, DecCoins, DecPair};
pub use dec::{Dec, DEC_PRECISION};
pub use denom::{Address, Denom};
pub use ids::{MarketId, OrderId, PlanId, PoolId, PositionId};
pub use liquidity::Liquidity;
pub use rounding::Rounding;
pub use side::OrderSide;
pub use tick::Tick;

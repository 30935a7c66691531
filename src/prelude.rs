//! Convenience re-exports for common types and traits.
//!
//! ```rust
//! use tidal_amm::prelude::*;
//! ```

pub use crate::config::{OrderLimits, Params};
pub use crate::domain::{
    Address, Amount, Coin, CoinPair, Coins, Dec, Denom, Liquidity, MarketId, OrderId, OrderSide, PlanId, PoolId,
    PositionId, Rounding, Tick,
};
pub use crate::engine::{
    AddLiquidityResult, AllocationReport, Amm, OrderRequest, PageRequest, PlanRequest, PoolOrder,
    RemoveLiquidityResult, SettlementReport,
};
pub use crate::error::{AmmError, Result};
pub use crate::math::CheckedArithmetic;
pub use crate::memory::{InMemoryLedger, InMemoryOrderBook};
pub use crate::state::{FarmingPlan, Pool, PoolState, Position, RewardAllocation};
pub use crate::store::Genesis;
pub use crate::traits::{BankKeeper, MatchingEngine, PoolOrderFill};

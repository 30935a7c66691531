//! Pool parameters and running pool state.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Dec, DecCoins, DecPair, Denom, Liquidity, MarketId, PoolId, Tick};

/// Static parameters of a liquidity pool.
///
/// `denom0` is the market's base denomination and `denom1` its quote, so
/// pool prices are quoted as `denom1` per `denom0`.  Only `tick_spacing`
/// can change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool id.
    pub id: PoolId,
    /// The order-book market the pool provides liquidity to.
    pub market_id: MarketId,
    /// Base denomination.
    pub denom0: Denom,
    /// Quote denomination.
    pub denom1: Denom,
    /// Ticks usable as position bounds and order prices are multiples
    /// of this.
    pub tick_spacing: u32,
    /// Module account holding the pool's reserve.
    pub reserve_address: Address,
}

impl Pool {
    /// Returns `true` if `tick` is a multiple of the tick spacing.
    #[must_use]
    pub const fn is_valid_tick(&self, tick: Tick) -> bool {
        tick.is_aligned(self.tick_spacing)
    }
}

/// Mutable running state of a pool.
///
/// `current_liquidity` is the liquidity of every position whose range
/// contains the current price; it always equals the sum of `net_liquidity`
/// over initialized ticks at or below `current_tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Greatest tick whose square-root price is ≤ `current_sqrt_price`.
    pub current_tick: Tick,
    /// Current square-root price.
    pub current_sqrt_price: Dec,
    /// Active liquidity.
    pub current_liquidity: Liquidity,
    /// Liquidity of every position in the pool, active or not.
    pub total_liquidity: Liquidity,
    /// Trading fees earned per unit of liquidity since creation.
    pub fee_growth_global: DecPair,
    /// Farming rewards earned per unit of liquidity since creation.
    pub farming_rewards_growth_global: DecCoins,
}

impl PoolState {
    /// Fresh state at a starting price.
    #[must_use]
    pub fn new(current_tick: Tick, current_sqrt_price: Dec) -> Self {
        Self {
            current_tick,
            current_sqrt_price,
            current_liquidity: Liquidity::ZERO,
            total_liquidity: Liquidity::ZERO,
            fee_growth_global: DecPair::ZERO,
            farming_rewards_growth_global: DecCoins::new(),
        }
    }

    /// Returns `true` if `[lower, upper)` contains the current tick.
    #[must_use]
    pub fn is_in_range(&self, lower: Tick, upper: Tick) -> bool {
        lower <= self.current_tick && self.current_tick < upper
    }
}

//! Read surface.

use serde::{Deserialize, Serialize};

use super::Amm;
use crate::domain::{Address, CoinPair, Coins, MarketId, PlanId, PoolId, PositionId, Rounding};
use crate::error::{AmmError, Result};
use crate::math::{amounts_for_liquidity, sqrt_price_at_tick};
use crate::state::{FarmingPlan, Pool, PoolState, Position};
use crate::traits::BankKeeper;

/// Default page size.
const DEFAULT_LIMIT: usize = 100;

/// Offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Items to skip.
    pub offset: usize,
    /// Maximum items to return.
    pub limit: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Page starting at `offset` with at most `limit` items.
    #[must_use]
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    fn apply<'a, T: Clone + 'a>(&self, items: impl Iterator<Item = &'a T>) -> Vec<T> {
        items.skip(self.offset).take(self.limit).cloned().collect()
    }
}

impl<B: BankKeeper> Amm<B> {
    /// Pools ordered by id.
    #[must_use]
    pub fn pools(&self, page: PageRequest) -> Vec<Pool> {
        page.apply(self.store.pools())
    }

    /// A pool by id.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the pool does not exist.
    pub fn pool(&self, pool_id: PoolId) -> Result<Pool> {
        self.store.get_pool(pool_id).cloned()
    }

    /// The pool of a market.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the market has no pool.
    pub fn pool_by_market(&self, market_id: MarketId) -> Result<Pool> {
        self.store
            .pool_by_market(market_id)
            .cloned()
            .ok_or(AmmError::NotFound("market has no pool"))
    }

    /// Running state of a pool.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the pool does not exist.
    pub fn pool_state(&self, pool_id: PoolId) -> Result<PoolState> {
        self.store.get_pool(pool_id)?;
        self.store.pool_state(pool_id).cloned()
    }

    /// A position by id.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the position does not exist.
    pub fn position(&self, position_id: PositionId) -> Result<Position> {
        self.store.get_position(position_id).cloned()
    }

    /// Positions of an owner ordered by id.
    #[must_use]
    pub fn positions_by_owner(&self, owner: &Address, page: PageRequest) -> Vec<Position> {
        page.apply(self.store.positions_by_owner(owner))
    }

    /// Positions in a pool ordered by id.
    #[must_use]
    pub fn positions_by_pool(&self, pool_id: PoolId, page: PageRequest) -> Vec<Position> {
        page.apply(self.store.positions_by_pool(pool_id))
    }

    /// Positions of an owner in one pool ordered by id.
    #[must_use]
    pub fn positions_by_owner_and_pool(&self, owner: &Address, pool_id: PoolId, page: PageRequest) -> Vec<Position> {
        page.apply(self.store.positions_by_owner(owner).filter(|p| p.pool_id == pool_id))
    }

    /// Coins underlying a position at the current price, rounded down.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the position does not exist.
    pub fn position_assets(&self, position_id: PositionId) -> Result<Coins> {
        let position = self.store.get_position(position_id)?;
        let pool = self.store.get_pool(position.pool_id)?;
        let state = self.store.pool_state(position.pool_id)?;
        let (amount0, amount1) = amounts_for_liquidity(
            state.current_sqrt_price,
            sqrt_price_at_tick(position.lower_tick)?,
            sqrt_price_at_tick(position.upper_tick)?,
            position.liquidity,
            Rounding::Down,
        )?;
        Ok(CoinPair::new(amount0, amount1).to_coins(&pool.denom0, &pool.denom1))
    }

    /// Fees and farming rewards a position could collect now.
    ///
    /// Settles the position on a scratch copy of the state, which is
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the position does not exist.
    pub fn collectible(&self, position_id: PositionId) -> Result<Coins> {
        self.simulate(|scratch| {
            let mut position = scratch.store.get_position(position_id)?.clone();
            if !position.liquidity.is_zero() {
                (position, _) = scratch.modify_position(
                    position.pool_id,
                    &position.owner.clone(),
                    position.lower_tick,
                    position.upper_tick,
                    0,
                )?;
            }
            let pool = scratch.store.get_pool(position.pool_id)?;
            let mut owed = position.owed_fee.to_coins(&pool.denom0, &pool.denom1);
            owed.add(&position.owed_farming_rewards)?;
            Ok(owed)
        })
    }

    /// Farming plans ordered by id.
    #[must_use]
    pub fn farming_plans(&self, page: PageRequest) -> Vec<FarmingPlan> {
        page.apply(self.store.plans())
    }

    /// A farming plan by id.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the plan does not exist.
    pub fn farming_plan(&self, plan_id: PlanId) -> Result<FarmingPlan> {
        self.store
            .plan(plan_id)
            .cloned()
            .ok_or(AmmError::NotFound("farming plan not found"))
    }
}

//! Liquidity positions.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, CoinPair, Coins, DecCoins, DecPair, Liquidity, PoolId, PositionId, Tick};

/// A liquidity provider's stake in `[lower_tick, upper_tick)` of a pool.
///
/// Unique per `(pool, owner, lower_tick, upper_tick)`.  The `last_*`
/// checkpoints hold the inside growth seen at the previous settlement;
/// the difference to the current inside growth times `liquidity` is what
/// the position earned in between.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Position id.
    pub id: PositionId,
    /// Pool the position belongs to.
    pub pool_id: PoolId,
    /// Owner account.
    pub owner: Address,
    /// Inclusive lower bound.
    pub lower_tick: Tick,
    /// Exclusive upper bound.
    pub upper_tick: Tick,
    /// Liquidity provided.
    pub liquidity: Liquidity,
    /// Fee growth inside the range at the last settlement.
    pub last_fee_growth_inside: DecPair,
    /// Fees settled but not yet collected.
    pub owed_fee: CoinPair,
    /// Farming growth inside the range at the last settlement.
    pub last_farming_rewards_growth_inside: DecCoins,
    /// Farming rewards settled but not yet collected.
    pub owed_farming_rewards: Coins,
}

impl Position {
    /// Empty position with no liquidity and no owed balances.
    #[must_use]
    pub fn new(id: PositionId, pool_id: PoolId, owner: Address, lower_tick: Tick, upper_tick: Tick) -> Self {
        Self {
            id,
            pool_id,
            owner,
            lower_tick,
            upper_tick,
            liquidity: Liquidity::ZERO,
            last_fee_growth_inside: DecPair::ZERO,
            owed_fee: CoinPair::ZERO,
            last_farming_rewards_growth_inside: DecCoins::new(),
            owed_farming_rewards: Coins::new(),
        }
    }

    /// Returns `true` if the position holds nothing: no liquidity and no
    /// owed balances.  Such a position is deleted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.liquidity.is_zero() && self.owed_fee.is_zero() && self.owed_farming_rewards.is_empty()
    }
}

//! Farming plans.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Coins, PlanId, PoolId};
use crate::error::AmmError;

/// Maximum length of a plan description.
const MAX_DESCRIPTION_LEN: usize = 200;

/// Rewards a plan pays to one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAllocation {
    /// Target pool.
    pub pool_id: PoolId,
    /// Rewards distributed per day, pro-rated over elapsed time.
    pub rewards_per_day: Coins,
}

/// A schedule of farming rewards paid from a source account into pools.
///
/// Private plans are created by any account, which then funds the plan's
/// derived source address; public plans are created by governance and
/// draw from an arbitrary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmingPlan {
    /// Plan id.
    pub id: PlanId,
    /// Free-form description.
    pub description: String,
    /// Account rewards are paid from.
    pub source_address: Address,
    /// Account that receives the source's remaining balance when a
    /// private plan is terminated.
    pub termination_address: Address,
    /// Per-pool reward rates.
    pub reward_allocations: Vec<RewardAllocation>,
    /// Inclusive start, in seconds.
    pub start_time: u64,
    /// Exclusive end, in seconds.
    pub end_time: u64,
    /// Created by an account rather than governance.
    pub is_private: bool,
    /// Set once the plan has ended or was terminated early.
    pub is_terminated: bool,
}

impl FarmingPlan {
    /// Source account derived for a private plan.
    #[must_use]
    pub fn derive_source_address(id: PlanId) -> Address {
        Address::new(format!("amm/farming/{}", id.get()))
    }

    /// Returns `true` if the plan pays rewards at `now`.
    #[must_use]
    pub const fn is_active_at(&self, now: u64) -> bool {
        !self.is_terminated && self.start_time <= now && now < self.end_time
    }

    /// Validates the plan's own fields.
    ///
    /// # Errors
    ///
    /// - [`AmmError::InvalidConfiguration`] for an over-long description,
    ///   an empty or duplicated allocation list or an empty time window.
    /// - [`AmmError::InvalidAmount`] if an allocation pays nothing.
    pub fn validate(&self) -> Result<(), AmmError> {
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(AmmError::InvalidConfiguration("plan description too long"));
        }
        if self.reward_allocations.is_empty() {
            return Err(AmmError::InvalidConfiguration("plan has no reward allocations"));
        }
        let mut pools: Vec<PoolId> = self.reward_allocations.iter().map(|a| a.pool_id).collect();
        pools.sort_unstable();
        pools.dedup();
        if pools.len() != self.reward_allocations.len() {
            return Err(AmmError::InvalidConfiguration("duplicate pool in reward allocations"));
        }
        if self.reward_allocations.iter().any(|a| a.rewards_per_day.is_empty()) {
            return Err(AmmError::InvalidAmount("reward allocation pays nothing"));
        }
        if self.start_time >= self.end_time {
            return Err(AmmError::InvalidConfiguration("plan end time must be after start time"));
        }
        Ok(())
    }
}

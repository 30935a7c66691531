//! Whole-state snapshot for export and import.
//!
//! Maps keyed by tuples are flattened into record lists so the snapshot
//! round-trips through JSON.  Secondary indexes are not exported; they are
//! rebuilt on import.

use serde::{Deserialize, Serialize};

use super::Store;
use crate::config::Params;
use crate::domain::{OrderId, PoolId, Tick};
use crate::error::{AmmError, Result};
use crate::state::{FarmingPlan, Pool, PoolState, Position, TickInfo};

/// A pool together with its running state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRecord {
    /// Static parameters.
    pub pool: Pool,
    /// Running state.
    pub state: PoolState,
}

/// An initialized tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Owning pool.
    pub pool_id: PoolId,
    /// Tick index.
    pub tick: Tick,
    /// Tick state.
    pub info: TickInfo,
}

/// Orders resting on the matching engine for one pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedOrders {
    /// Owning pool.
    pub pool_id: PoolId,
    /// Order ids in posting order.
    pub order_ids: Vec<OrderId>,
}

/// Serializable snapshot of a [`Store`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genesis {
    /// Governance parameters.
    pub params: Params,
    /// Last allocated pool id.
    pub last_pool_id: u64,
    /// Last allocated position id.
    pub last_position_id: u64,
    /// Last allocated plan id.
    pub last_plan_id: u64,
    /// Live private farming plans.
    pub num_private_farming_plans: u32,
    /// Time of the previous farming allocation.
    pub last_farming_time: Option<u64>,
    /// Pools with their states.
    pub pools: Vec<PoolRecord>,
    /// Initialized ticks.
    pub ticks: Vec<TickRecord>,
    /// Positions.
    pub positions: Vec<Position>,
    /// Farming plans.
    pub plans: Vec<FarmingPlan>,
    /// Posted order ids.
    pub posted_orders: Vec<PostedOrders>,
}

impl Default for Genesis {
    fn default() -> Self {
        Store::default().export_genesis()
    }
}

impl Store {
    /// Exports the complete state.
    #[must_use]
    pub fn export_genesis(&self) -> Genesis {
        Genesis {
            params: self.params.clone(),
            last_pool_id: self.last_pool_id,
            last_position_id: self.last_position_id,
            last_plan_id: self.last_plan_id,
            num_private_farming_plans: self.num_private_farming_plans,
            last_farming_time: self.last_farming_time,
            pools: self
                .pools
                .values()
                .filter_map(|pool| {
                    self.pool_states.get(&pool.id).map(|state| PoolRecord {
                        pool: pool.clone(),
                        state: state.clone(),
                    })
                })
                .collect(),
            ticks: self
                .ticks
                .iter()
                .map(|((pool_id, tick), info)| TickRecord {
                    pool_id: *pool_id,
                    tick: *tick,
                    info: info.clone(),
                })
                .collect(),
            positions: self.positions.values().cloned().collect(),
            plans: self.plans.values().cloned().collect(),
            posted_orders: self
                .posted_orders
                .iter()
                .map(|(pool_id, ids)| PostedOrders {
                    pool_id: *pool_id,
                    order_ids: ids.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a store, indexes included, from a snapshot and validates
    /// it.
    ///
    /// # Errors
    ///
    /// - [`AmmError::InvalidConfiguration`] if the parameters are invalid.
    /// - [`AmmError::AlreadyExists`] on duplicate ids, markets or position
    ///   keys.
    /// - [`AmmError::NotFound`] if a record references a missing pool.
    /// - [`AmmError::Invariant`] if counters lag behind ids or a pool's
    ///   liquidity bookkeeping is inconsistent.
    pub fn import_genesis(genesis: Genesis) -> Result<Self> {
        genesis.params.validate()?;
        let mut store = Self::new(genesis.params);
        store.last_pool_id = genesis.last_pool_id;
        store.last_position_id = genesis.last_position_id;
        store.last_plan_id = genesis.last_plan_id;
        store.num_private_farming_plans = genesis.num_private_farming_plans;
        store.last_farming_time = genesis.last_farming_time;

        for PoolRecord { pool, state } in genesis.pools {
            if pool.id.get() == 0 || pool.id.get() > store.last_pool_id {
                return Err(AmmError::Invariant("pool id beyond counter"));
            }
            if store.pools.contains_key(&pool.id) || store.pool_by_market.contains_key(&pool.market_id) {
                return Err(AmmError::AlreadyExists("duplicate pool or market"));
            }
            if pool.denom0 == pool.denom1 {
                return Err(AmmError::InvalidDenom("pool denominations must differ"));
            }
            store.pool_states.insert(pool.id, state);
            store.set_pool(pool);
        }

        for TickRecord { pool_id, tick, info } in genesis.ticks {
            store.get_pool(pool_id)?;
            store.set_tick_info(pool_id, tick, info);
        }

        for position in genesis.positions {
            let pool = store.get_pool(position.pool_id)?;
            if position.id.get() == 0 || position.id.get() > store.last_position_id {
                return Err(AmmError::Invariant("position id beyond counter"));
            }
            if position.lower_tick >= position.upper_tick
                || !pool.is_valid_tick(position.lower_tick)
                || !pool.is_valid_tick(position.upper_tick)
            {
                return Err(AmmError::InvalidTickRange("invalid position range"));
            }
            if store.positions.contains_key(&position.id)
                || store
                    .position_by_key(position.pool_id, &position.owner, position.lower_tick, position.upper_tick)
                    .is_some()
            {
                return Err(AmmError::AlreadyExists("duplicate position"));
            }
            store.set_position(position);
        }

        let mut private_live = 0u32;
        for plan in genesis.plans {
            if plan.id.get() == 0 || plan.id.get() > store.last_plan_id {
                return Err(AmmError::Invariant("plan id beyond counter"));
            }
            if store.plans.contains_key(&plan.id) {
                return Err(AmmError::AlreadyExists("duplicate plan"));
            }
            plan.validate()?;
            for allocation in &plan.reward_allocations {
                store.get_pool(allocation.pool_id)?;
            }
            if plan.is_private && !plan.is_terminated {
                private_live += 1;
            }
            store.set_plan(plan);
        }
        if private_live != store.num_private_farming_plans {
            return Err(AmmError::Invariant("private plan count mismatch"));
        }

        for PostedOrders { pool_id, order_ids } in genesis.posted_orders {
            store.get_pool(pool_id)?;
            store.set_posted_orders(pool_id, order_ids);
        }

        let pool_ids: Vec<PoolId> = store.pools.keys().copied().collect();
        for id in pool_ids {
            store.check_pool_invariants(id)?;
        }
        Ok(store)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn empty_round_trip() {
        let g = Genesis::default();
        let Ok(store) = Store::import_genesis(g.clone()) else {
            panic!("import");
        };
        assert_eq!(store.export_genesis(), g);
    }

    #[test]
    fn invalid_params_rejected() {
        let mut g = Genesis::default();
        g.params.allowed_tick_spacings.clear();
        assert!(matches!(
            Store::import_genesis(g),
            Err(AmmError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn private_plan_count_checked() {
        let mut g = Genesis::default();
        g.num_private_farming_plans = 1;
        assert!(matches!(Store::import_genesis(g), Err(AmmError::Invariant(_))));
    }
}

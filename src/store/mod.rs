//! Indexed in-memory state store.
//!
//! [`Store`] keeps every record kind in ordered maps together with the
//! secondary indexes the engine queries by:
//!
//! | Primary | Key |
//! |---------|-----|
//! | pools | [`PoolId`] |
//! | pool states | [`PoolId`] |
//! | ticks | `(PoolId, Tick)` |
//! | positions | [`PositionId`] |
//! | farming plans | [`PlanId`] |
//!
//! | Index | Maps |
//! |-------|------|
//! | pool by market | [`MarketId`] → [`PoolId`] |
//! | position by key | `(pool, owner, lower, upper)` → [`PositionId`] |
//! | positions by owner | `(owner, id)` set |
//! | positions by pool | `(pool, id)` set |
//!
//! Indexes are maintained by [`Store::set_pool`], [`Store::set_position`]
//! and [`Store::delete_position`]; no other method touches them.  The
//! tick map is sparse: only initialized ticks are stored, and range scans
//! start from an arbitrary tick in either direction.
//!
//! The store also holds the governance [`Params`], the id counters and the
//! previous farming time, so a clone of the store is a complete scratch
//! copy of the state.

mod genesis;

pub use genesis::{Genesis, PoolRecord, PostedOrders, TickRecord};

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::config::Params;
use crate::domain::{Address, Liquidity, MarketId, OrderId, PlanId, PoolId, PositionId, Tick};
use crate::error::{AmmError, Result};
use crate::math::CheckedArithmetic;
use crate::state::{FarmingPlan, Pool, PoolState, Position, TickInfo};

/// Position uniqueness key: `(pool, owner, lower, upper)`.
type PositionKey = (PoolId, Address, Tick, Tick);

/// In-memory state store.  See the [module docs](self).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    params: Params,
    last_pool_id: u64,
    last_position_id: u64,
    last_plan_id: u64,
    num_private_farming_plans: u32,
    last_farming_time: Option<u64>,

    pools: BTreeMap<PoolId, Pool>,
    pool_states: BTreeMap<PoolId, PoolState>,
    ticks: BTreeMap<(PoolId, Tick), TickInfo>,
    positions: BTreeMap<PositionId, Position>,
    plans: BTreeMap<PlanId, FarmingPlan>,
    posted_orders: BTreeMap<PoolId, Vec<OrderId>>,

    pool_by_market: BTreeMap<MarketId, PoolId>,
    position_by_key: BTreeMap<PositionKey, PositionId>,
    positions_by_owner: BTreeSet<(Address, PositionId)>,
    positions_by_pool: BTreeSet<(PoolId, PositionId)>,
}

impl Store {
    /// Empty store with the given parameters.
    #[must_use]
    pub fn new(params: Params) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    // -- Params & counters --------------------------------------------------

    /// Governance parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces the governance parameters.
    pub fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Allocates the next pool id.
    pub fn next_pool_id(&mut self) -> PoolId {
        self.last_pool_id += 1;
        PoolId::new(self.last_pool_id)
    }

    /// Allocates the next position id.
    pub fn next_position_id(&mut self) -> PositionId {
        self.last_position_id += 1;
        PositionId::new(self.last_position_id)
    }

    /// Allocates the next plan id.
    pub fn next_plan_id(&mut self) -> PlanId {
        self.last_plan_id += 1;
        PlanId::new(self.last_plan_id)
    }

    /// Number of live private farming plans.
    #[must_use]
    pub const fn num_private_farming_plans(&self) -> u32 {
        self.num_private_farming_plans
    }

    /// Sets the number of live private farming plans.
    pub fn set_num_private_farming_plans(&mut self, n: u32) {
        self.num_private_farming_plans = n;
    }

    /// Time of the previous farming allocation, if any.
    #[must_use]
    pub const fn last_farming_time(&self) -> Option<u64> {
        self.last_farming_time
    }

    /// Records the time of a farming allocation.
    pub fn set_last_farming_time(&mut self, t: u64) {
        self.last_farming_time = Some(t);
    }

    // -- Pools --------------------------------------------------------------

    /// Looks up a pool.
    #[must_use]
    pub fn pool(&self, id: PoolId) -> Option<&Pool> {
        self.pools.get(&id)
    }

    /// Looks up a pool, failing with [`AmmError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the pool does not exist.
    pub fn get_pool(&self, id: PoolId) -> Result<&Pool> {
        self.pool(id).ok_or(AmmError::NotFound("pool not found"))
    }

    /// Looks up the pool of a market.
    #[must_use]
    pub fn pool_by_market(&self, market_id: MarketId) -> Option<&Pool> {
        self.pool_by_market.get(&market_id).and_then(|id| self.pools.get(id))
    }

    /// Iterates pools in id order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    /// Inserts or replaces a pool and its market index entry.
    pub fn set_pool(&mut self, pool: Pool) {
        self.pool_by_market.insert(pool.market_id, pool.id);
        self.pools.insert(pool.id, pool);
    }

    /// Looks up a pool's running state.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Invariant`] if a pool has no state record.
    pub fn pool_state(&self, id: PoolId) -> Result<&PoolState> {
        self.pool_states
            .get(&id)
            .ok_or(AmmError::Invariant("pool state missing"))
    }

    /// Inserts or replaces a pool's running state.
    pub fn set_pool_state(&mut self, id: PoolId, state: PoolState) {
        self.pool_states.insert(id, state);
    }

    // -- Ticks --------------------------------------------------------------

    /// Looks up an initialized tick.
    #[must_use]
    pub fn tick_info(&self, pool_id: PoolId, tick: Tick) -> Option<&TickInfo> {
        self.ticks.get(&(pool_id, tick))
    }

    /// Inserts or replaces a tick record.
    pub fn set_tick_info(&mut self, pool_id: PoolId, tick: Tick, info: TickInfo) {
        self.ticks.insert((pool_id, tick), info);
    }

    /// Deletes a tick record.
    pub fn delete_tick_info(&mut self, pool_id: PoolId, tick: Tick) {
        self.ticks.remove(&(pool_id, tick));
    }

    /// Initialized ticks of a pool at or below (`inclusive`) or strictly
    /// below `tick`, in descending order.
    pub fn ticks_below(
        &self,
        pool_id: PoolId,
        tick: Tick,
        inclusive: bool,
    ) -> impl Iterator<Item = (Tick, &TickInfo)> {
        let end = if inclusive {
            Bound::Included((pool_id, tick))
        } else {
            Bound::Excluded((pool_id, tick))
        };
        self.ticks
            .range((Bound::Included((pool_id, Tick::MIN)), end))
            .rev()
            .map(|((_, t), info)| (*t, info))
    }

    /// Initialized ticks of a pool at or above (`inclusive`) or strictly
    /// above `tick`, in ascending order.
    pub fn ticks_above(
        &self,
        pool_id: PoolId,
        tick: Tick,
        inclusive: bool,
    ) -> impl Iterator<Item = (Tick, &TickInfo)> {
        let start = if inclusive {
            Bound::Included((pool_id, tick))
        } else {
            Bound::Excluded((pool_id, tick))
        };
        self.ticks
            .range((start, Bound::Included((pool_id, Tick::MAX))))
            .map(|((_, t), info)| (*t, info))
    }

    /// All initialized ticks of a pool in ascending order.
    pub fn pool_ticks(&self, pool_id: PoolId) -> impl Iterator<Item = (Tick, &TickInfo)> {
        self.ticks_above(pool_id, Tick::MIN, true)
    }

    // -- Positions ----------------------------------------------------------

    /// Looks up a position.
    #[must_use]
    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// Looks up a position, failing with [`AmmError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::NotFound`] if the position does not exist.
    pub fn get_position(&self, id: PositionId) -> Result<&Position> {
        self.position(id).ok_or(AmmError::NotFound("position not found"))
    }

    /// Looks up a position by its uniqueness key.
    #[must_use]
    pub fn position_by_key(
        &self,
        pool_id: PoolId,
        owner: &Address,
        lower: Tick,
        upper: Tick,
    ) -> Option<&Position> {
        self.position_by_key
            .get(&(pool_id, owner.clone(), lower, upper))
            .and_then(|id| self.positions.get(id))
    }

    /// Iterates all positions in id order.
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Positions of an owner in id order.
    pub fn positions_by_owner<'a>(&'a self, owner: &'a Address) -> impl Iterator<Item = &'a Position> {
        self.positions_by_owner
            .range((owner.clone(), PositionId::new(0))..)
            .take_while(move |(o, _)| o == owner)
            .filter_map(|(_, id)| self.positions.get(id))
    }

    /// Positions in a pool in id order.
    pub fn positions_by_pool(&self, pool_id: PoolId) -> impl Iterator<Item = &Position> {
        self.positions_by_pool
            .range((pool_id, PositionId::new(0))..=(pool_id, PositionId::new(u64::MAX)))
            .filter_map(|(_, id)| self.positions.get(id))
    }

    /// Inserts or replaces a position and its index entries.
    pub fn set_position(&mut self, position: Position) {
        let key = (
            position.pool_id,
            position.owner.clone(),
            position.lower_tick,
            position.upper_tick,
        );
        self.position_by_key.insert(key, position.id);
        self.positions_by_owner.insert((position.owner.clone(), position.id));
        self.positions_by_pool.insert((position.pool_id, position.id));
        self.positions.insert(position.id, position);
    }

    /// Deletes a position and its index entries.
    pub fn delete_position(&mut self, id: PositionId) {
        if let Some(position) = self.positions.remove(&id) {
            self.position_by_key.remove(&(
                position.pool_id,
                position.owner.clone(),
                position.lower_tick,
                position.upper_tick,
            ));
            self.positions_by_owner.remove(&(position.owner, id));
            self.positions_by_pool.remove(&(position.pool_id, id));
        }
    }

    // -- Farming plans ------------------------------------------------------

    /// Looks up a farming plan.
    #[must_use]
    pub fn plan(&self, id: PlanId) -> Option<&FarmingPlan> {
        self.plans.get(&id)
    }

    /// Iterates farming plans in id order.
    pub fn plans(&self) -> impl Iterator<Item = &FarmingPlan> {
        self.plans.values()
    }

    /// Inserts or replaces a farming plan.
    pub fn set_plan(&mut self, plan: FarmingPlan) {
        self.plans.insert(plan.id, plan);
    }

    // -- Posted orders ------------------------------------------------------

    /// Orders currently resting on the matching engine for a pool.
    #[must_use]
    pub fn posted_orders(&self, pool_id: PoolId) -> &[OrderId] {
        self.posted_orders
            .get(&pool_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replaces the posted orders of a pool.
    pub fn set_posted_orders(&mut self, pool_id: PoolId, orders: Vec<OrderId>) {
        if orders.is_empty() {
            self.posted_orders.remove(&pool_id);
        } else {
            self.posted_orders.insert(pool_id, orders);
        }
    }

    // -- Invariants ---------------------------------------------------------

    /// Checks the structural invariants of one pool:
    ///
    /// - every tick has `gross ≥ |net|`, non-zero gross and is aligned;
    /// - no tick's outside growth exceeds global growth;
    /// - active liquidity equals Σ net liquidity over ticks ≤ current tick;
    /// - total liquidity equals Σ position liquidity;
    /// - Σ net liquidity over all ticks is zero.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Invariant`] naming the first violated rule.
    pub fn check_pool_invariants(&self, pool_id: PoolId) -> Result<()> {
        let pool = self.get_pool(pool_id)?;
        let state = self.pool_state(pool_id)?;
        let mut active: i128 = 0;
        let mut net_total: i128 = 0;
        for (tick, info) in self.pool_ticks(pool_id) {
            if !info.is_consistent() || info.gross_liquidity.is_zero() {
                return Err(AmmError::Invariant("tick liquidity inconsistent"));
            }
            if !pool.is_valid_tick(tick) {
                return Err(AmmError::Invariant("initialized tick not aligned to spacing"));
            }
            if !info.fee_growth_outside.is_all_lte(&state.fee_growth_global)
                || !info
                    .farming_rewards_growth_outside
                    .is_all_lte(&state.farming_rewards_growth_global)
            {
                return Err(AmmError::Invariant("tick outside growth exceeds global growth"));
            }
            net_total = net_total
                .checked_add(info.net_liquidity)
                .ok_or(AmmError::Overflow("net liquidity sum overflow"))?;
            if tick <= state.current_tick {
                active = net_total;
            }
        }
        if net_total != 0 {
            return Err(AmmError::Invariant("net liquidity does not sum to zero"));
        }
        if state.current_liquidity.to_delta() != Some(active) {
            return Err(AmmError::Invariant("active liquidity mismatch"));
        }
        let total = Liquidity::safe_sum(self.positions_by_pool(pool_id).map(|p| &p.liquidity))?;
        if state.total_liquidity != total {
            return Err(AmmError::Invariant("total liquidity mismatch"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Dec, DecPair, Denom, Liquidity};

    fn tick(v: i32) -> Tick {
        let Ok(t) = Tick::new(v) else {
            panic!("valid tick");
        };
        t
    }

    fn info(gross: u128) -> TickInfo {
        TickInfo {
            gross_liquidity: Liquidity::new(gross),
            ..TickInfo::default()
        }
    }

    fn pool(id: u64, market: u64) -> Pool {
        let (Ok(d0), Ok(d1)) = (Denom::new("ucre"), Denom::new("uusd")) else {
            panic!("valid denoms");
        };
        Pool {
            id: PoolId::new(id),
            market_id: MarketId::new(market),
            denom0: d0,
            denom1: d1,
            tick_spacing: 10,
            reserve_address: Address::pool_reserve(PoolId::new(id)),
        }
    }

    // -- Counters -----------------------------------------------------------

    #[test]
    fn counters_start_at_one() {
        let mut s = Store::default();
        assert_eq!(s.next_pool_id(), PoolId::new(1));
        assert_eq!(s.next_pool_id(), PoolId::new(2));
        assert_eq!(s.next_position_id(), PositionId::new(1));
        assert_eq!(s.next_plan_id(), PlanId::new(1));
    }

    // -- Ticks --------------------------------------------------------------

    #[test]
    fn tick_range_scans() {
        let mut s = Store::default();
        let p = PoolId::new(1);
        for t in [-20, 0, 10, 30] {
            s.set_tick_info(p, tick(t), info(1));
        }
        s.set_tick_info(PoolId::new(2), tick(5), info(1));

        let below: Vec<i32> = s.ticks_below(p, tick(10), true).map(|(t, _)| t.get()).collect();
        assert_eq!(below, vec![10, 0, -20]);
        let below_ex: Vec<i32> = s.ticks_below(p, tick(10), false).map(|(t, _)| t.get()).collect();
        assert_eq!(below_ex, vec![0, -20]);
        let above: Vec<i32> = s.ticks_above(p, tick(0), false).map(|(t, _)| t.get()).collect();
        assert_eq!(above, vec![10, 30]);
        let above_in: Vec<i32> = s.ticks_above(p, tick(0), true).map(|(t, _)| t.get()).collect();
        assert_eq!(above_in, vec![0, 10, 30]);
    }

    #[test]
    fn deleted_ticks_never_appear() {
        let mut s = Store::default();
        let p = PoolId::new(1);
        s.set_tick_info(p, tick(0), info(1));
        s.set_tick_info(p, tick(10), info(1));
        s.delete_tick_info(p, tick(0));
        assert_eq!(s.pool_ticks(p).count(), 1);
        assert!(s.tick_info(p, tick(0)).is_none());
    }

    #[test]
    fn scans_at_grid_edges_are_empty() {
        let s = Store::default();
        assert_eq!(s.ticks_below(PoolId::new(1), Tick::MIN, false).count(), 0);
        assert_eq!(s.ticks_above(PoolId::new(1), Tick::MAX, false).count(), 0);
    }

    // -- Positions ----------------------------------------------------------

    #[test]
    fn position_indexes_follow_primary_records() {
        let mut s = Store::default();
        let alice = Address::new("alice");
        let bob = Address::new("bob");
        let p1 = Position::new(PositionId::new(1), PoolId::new(1), alice.clone(), tick(0), tick(10));
        let p2 = Position::new(PositionId::new(2), PoolId::new(2), alice.clone(), tick(0), tick(10));
        let p3 = Position::new(PositionId::new(3), PoolId::new(1), bob.clone(), tick(0), tick(10));
        s.set_position(p1);
        s.set_position(p2);
        s.set_position(p3);

        assert_eq!(s.positions_by_owner(&alice).count(), 2);
        assert_eq!(s.positions_by_pool(PoolId::new(1)).count(), 2);
        assert!(s.position_by_key(PoolId::new(1), &bob, tick(0), tick(10)).is_some());

        s.delete_position(PositionId::new(1));
        assert_eq!(s.positions_by_owner(&alice).count(), 1);
        assert_eq!(s.positions_by_pool(PoolId::new(1)).count(), 1);
        assert!(s.position_by_key(PoolId::new(1), &alice, tick(0), tick(10)).is_none());
    }

    // -- Pools --------------------------------------------------------------

    #[test]
    fn market_index() {
        let mut s = Store::default();
        s.set_pool(pool(1, 7));
        assert_eq!(s.pool_by_market(MarketId::new(7)).map(|p| p.id), Some(PoolId::new(1)));
        assert!(s.pool_by_market(MarketId::new(8)).is_none());
        assert!(matches!(s.get_pool(PoolId::new(2)), Err(AmmError::NotFound(_))));
    }

    #[test]
    fn invariant_check_detects_active_liquidity_drift() {
        let mut s = Store::default();
        let id = PoolId::new(1);
        s.set_pool(pool(1, 1));
        let mut state = PoolState::new(tick(0), Dec::ONE);
        s.set_tick_info(
            id,
            tick(-10),
            TickInfo {
                gross_liquidity: Liquidity::new(5),
                net_liquidity: 5,
                ..TickInfo::default()
            },
        );
        s.set_tick_info(
            id,
            tick(10),
            TickInfo {
                gross_liquidity: Liquidity::new(5),
                net_liquidity: -5,
                ..TickInfo::default()
            },
        );
        let mut position = Position::new(PositionId::new(1), id, Address::new("a"), tick(-10), tick(10));
        position.liquidity = Liquidity::new(5);
        s.set_position(position);
        state.total_liquidity = Liquidity::new(5);
        state.current_liquidity = Liquidity::new(5);
        s.set_pool_state(id, state.clone());
        assert_eq!(s.check_pool_invariants(id), Ok(()));

        state.current_liquidity = Liquidity::new(4);
        s.set_pool_state(id, state);
        assert!(matches!(s.check_pool_invariants(id), Err(AmmError::Invariant(_))));
    }

    #[test]
    fn invariant_check_bounds_outside_growth_by_global() {
        let mut s = Store::default();
        let id = PoolId::new(1);
        s.set_pool(pool(1, 1));
        let mut state = PoolState::new(tick(0), Dec::ONE);
        let Ok(ucre) = Denom::new("ucre") else {
            panic!("denom");
        };
        let mut below = TickInfo {
            gross_liquidity: Liquidity::new(5),
            net_liquidity: 5,
            ..TickInfo::default()
        };
        below.fee_growth_outside = DecPair::new(Dec::ONE, Dec::ZERO);
        s.set_tick_info(id, tick(-10), below.clone());
        s.set_tick_info(
            id,
            tick(10),
            TickInfo {
                gross_liquidity: Liquidity::new(5),
                net_liquidity: -5,
                ..TickInfo::default()
            },
        );
        let mut position = Position::new(PositionId::new(1), id, Address::new("a"), tick(-10), tick(10));
        position.liquidity = Liquidity::new(5);
        s.set_position(position);
        state.total_liquidity = Liquidity::new(5);
        state.current_liquidity = Liquidity::new(5);
        s.set_pool_state(id, state.clone());
        assert_eq!(
            s.check_pool_invariants(id),
            Err(AmmError::Invariant("tick outside growth exceeds global growth"))
        );

        state.fee_growth_global = DecPair::new(Dec::from_int(2), Dec::ZERO);
        s.set_pool_state(id, state.clone());
        assert_eq!(s.check_pool_invariants(id), Ok(()));

        below.farming_rewards_growth_outside.set(ucre.clone(), Dec::ONE);
        s.set_tick_info(id, tick(-10), below);
        assert!(matches!(s.check_pool_invariants(id), Err(AmmError::Invariant(_))));
        state.farming_rewards_growth_global.set(ucre, Dec::ONE);
        s.set_pool_state(id, state);
        assert_eq!(s.check_pool_invariants(id), Ok(()));
    }
}

//! Farming plans and per-cycle reward allocation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::Amm;
use crate::config::SECONDS_PER_DAY;
use crate::domain::{Address, Amount, Coins, Dec, PlanId, PoolId, Rounding};
use crate::error::{AmmError, Result};
use crate::state::{FarmingPlan, RewardAllocation};
use crate::traits::BankKeeper;

/// Fields of a new farming plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Free-form description.
    pub description: String,
    /// Receives the source's remaining balance on termination.
    pub termination_address: Address,
    /// Per-pool reward rates.
    pub reward_allocations: Vec<RewardAllocation>,
    /// Inclusive start, in seconds.
    pub start_time: u64,
    /// Exclusive end, in seconds.
    pub end_time: u64,
}

/// Outcome of one [`Amm::allocate_farming_rewards`] cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    /// Seconds the cycle pays for, after capping.
    pub elapsed: u64,
    /// Rewards moved into each pool's growth.
    pub allocated: BTreeMap<PoolId, Coins>,
    /// Sources skipped because they could not cover their total.
    pub skipped_sources: Vec<Address>,
    /// Plans terminated because their window ended.
    pub terminated_plans: Vec<PlanId>,
}

impl<B: BankKeeper> Amm<B> {
    /// Creates a private farming plan funded through a derived source
    /// address.
    ///
    /// The creator pays the private plan creation fee.  Every reward
    /// denomination must exist on the ledger and every target pool must
    /// exist.
    ///
    /// # Errors
    ///
    /// - [`AmmError::InvalidConfiguration`] if the private plan limit is
    ///   reached or the plan is malformed.
    /// - [`AmmError::NotFound`] if a target pool does not exist.
    /// - [`AmmError::InvalidDenom`] if a reward denomination has no supply.
    /// - [`AmmError::InsufficientFunds`] if the creator cannot pay the fee.
    pub fn create_private_farming_plan(&mut self, creator: &Address, request: PlanRequest) -> Result<FarmingPlan> {
        self.transact(|amm| {
            let params = amm.store.params();
            if amm.store.num_private_farming_plans() >= params.max_num_private_farming_plans {
                return Err(AmmError::InvalidConfiguration("too many private farming plans"));
            }
            let fee = params.private_farming_plan_creation_fee.clone();
            let fee_collector = params.fee_collector.clone();
            if !fee.is_empty() {
                amm.bank.transfer(creator, &fee_collector, &fee)?;
            }
            let id = amm.store.next_plan_id();
            let plan = amm.insert_plan(id, request, FarmingPlan::derive_source_address(id), true)?;
            let count = amm.store.num_private_farming_plans() + 1;
            amm.store.set_num_private_farming_plans(count);
            info!(plan_id = %id, creator = %creator, source = %plan.source_address, "private farming plan created");
            Ok(plan)
        })
    }

    /// Creates a public farming plan paid from `source_address`.
    ///
    /// # Errors
    ///
    /// Same as [`Amm::create_private_farming_plan`], without the fee and
    /// the plan limit.
    pub fn create_public_farming_plan(&mut self, request: PlanRequest, source_address: Address) -> Result<FarmingPlan> {
        self.transact(|amm| {
            let id = amm.store.next_plan_id();
            let plan = amm.insert_plan(id, request, source_address, false)?;
            info!(plan_id = %id, source = %plan.source_address, "public farming plan created");
            Ok(plan)
        })
    }

    fn insert_plan(&mut self, id: PlanId, request: PlanRequest, source_address: Address, is_private: bool) -> Result<FarmingPlan> {
        let plan = FarmingPlan {
            id,
            description: request.description,
            source_address,
            termination_address: request.termination_address,
            reward_allocations: request.reward_allocations,
            start_time: request.start_time,
            end_time: request.end_time,
            is_private,
            is_terminated: false,
        };
        plan.validate()?;
        for allocation in &plan.reward_allocations {
            self.store.get_pool(allocation.pool_id)?;
            if allocation.rewards_per_day.denoms().any(|d| !self.bank.has_supply(d)) {
                return Err(AmmError::InvalidDenom("reward denomination has no supply"));
            }
        }
        self.store.set_plan(plan.clone());
        Ok(plan)
    }

    /// Terminates a plan before or after its end.
    ///
    /// Only the plan's termination address may terminate it.  A private
    /// plan's remaining source balance is swept to the termination
    /// address.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the plan does not exist.
    /// - [`AmmError::Unauthorized`] if `sender` is not the termination
    ///   address.
    /// - [`AmmError::InvalidConfiguration`] if the plan is already
    ///   terminated.
    pub fn terminate_farming_plan(&mut self, sender: &Address, plan_id: PlanId) -> Result<()> {
        self.transact(|amm| {
            let plan = amm
                .store
                .plan(plan_id)
                .ok_or(AmmError::NotFound("farming plan not found"))?;
            if &plan.termination_address != sender {
                return Err(AmmError::Unauthorized("only the termination address may terminate the plan"));
            }
            amm.execute_terminate_plan(plan_id)
        })
    }

    fn execute_terminate_plan(&mut self, plan_id: PlanId) -> Result<()> {
        let mut plan = self
            .store
            .plan(plan_id)
            .cloned()
            .ok_or(AmmError::NotFound("farming plan not found"))?;
        if plan.is_terminated {
            return Err(AmmError::InvalidConfiguration("farming plan already terminated"));
        }
        plan.is_terminated = true;
        if plan.is_private {
            let denoms: Vec<_> = plan
                .reward_allocations
                .iter()
                .flat_map(|a| a.rewards_per_day.denoms().cloned())
                .collect();
            let remaining = self.bank.spendable_coins(&plan.source_address, &denoms);
            if !remaining.is_empty() {
                self.bank
                    .transfer(&plan.source_address, &plan.termination_address, &remaining)?;
            }
            let count = self.store.num_private_farming_plans().saturating_sub(1);
            self.store.set_num_private_farming_plans(count);
        }
        info!(plan_id = %plan_id, private = plan.is_private, "farming plan terminated");
        self.store.set_plan(plan);
        Ok(())
    }

    /// Pays farming rewards for the time elapsed since the previous call.
    ///
    /// Elapsed time is capped at [`Params::max_farming_block_time`]; the
    /// first call only records `now`.  Rewards of every active plan are
    /// pro-rated per day and truncated, and summed per source.  A source
    /// that cannot cover its whole total for the cycle pays nothing;
    /// covered sources pay into the rewards pool and each target pool's
    /// farming growth rises by reward over active liquidity.  Pools with
    /// no active liquidity accrue nothing.  Plans whose window has ended
    /// are terminated afterwards.
    ///
    /// [`Params::max_farming_block_time`]: crate::config::Params::max_farming_block_time
    ///
    /// # Errors
    ///
    /// - [`AmmError::InvalidConfiguration`] if `now` is earlier than the
    ///   previous allocation.
    /// - Propagates arithmetic errors.
    pub fn allocate_farming_rewards(&mut self, now: u64) -> Result<AllocationReport> {
        self.transact(|amm| amm.execute_allocate_farming_rewards(now))
    }

    fn execute_allocate_farming_rewards(&mut self, now: u64) -> Result<AllocationReport> {
        let previous = self.store.last_farming_time();
        if previous.is_some_and(|t| now < t) {
            return Err(AmmError::InvalidConfiguration("allocation time went backwards"));
        }
        self.store.set_last_farming_time(now);
        let mut report = AllocationReport::default();

        if let Some(previous) = previous {
            report.elapsed = (now - previous).min(self.store.params().max_farming_block_time);
        }
        if report.elapsed > 0 {
            self.distribute(now, &mut report)?;
        }

        let ended: Vec<PlanId> = self
            .store
            .plans()
            .filter(|p| !p.is_terminated && p.end_time <= now)
            .map(|p| p.id)
            .collect();
        for plan_id in ended {
            self.execute_terminate_plan(plan_id)?;
            report.terminated_plans.push(plan_id);
        }
        Ok(report)
    }

    fn distribute(&mut self, now: u64, report: &mut AllocationReport) -> Result<()> {
        // source -> (total, [(pool, rewards)])
        let mut by_source: BTreeMap<Address, (Coins, Vec<(PoolId, Coins)>)> = BTreeMap::new();
        for plan in self.store.plans().filter(|p| p.is_active_at(now)) {
            for allocation in &plan.reward_allocations {
                if self.store.pool_state(allocation.pool_id)?.current_liquidity.is_zero() {
                    continue;
                }
                let rewards = prorate(&allocation.rewards_per_day, report.elapsed)?;
                if rewards.is_empty() {
                    continue;
                }
                let entry = by_source.entry(plan.source_address.clone()).or_default();
                entry.0.add(&rewards)?;
                entry.1.push((allocation.pool_id, rewards));
            }
        }

        let rewards_pool = self.store.params().rewards_pool.clone();
        for (source, (total, shares)) in by_source {
            let balance = self.bank.spendable_coins(&source, total.denoms());
            if !total.is_all_lte(&balance) {
                warn!(source = %source, owed = ?total, balance = ?balance, "farming source underfunded; skipped");
                report.skipped_sources.push(source);
                continue;
            }
            self.bank.transfer(&source, &rewards_pool, &total)?;
            for (pool_id, rewards) in shares {
                let mut state = self.store.pool_state(pool_id)?.clone();
                let liquidity = state.current_liquidity.get();
                for (denom, amount) in rewards.iter() {
                    let growth = Dec::from_ratio(amount.get(), liquidity, Rounding::Down)?;
                    state.farming_rewards_growth_global.add_amount(denom, growth)?;
                }
                self.store.set_pool_state(pool_id, state);
                report.allocated.entry(pool_id).or_default().add(&rewards)?;
            }
            debug!(source = %source, paid = ?total, "farming rewards allocated");
        }
        Ok(())
    }
}

/// `rewards_per_day × elapsed / 1 day`, truncated per denomination.
fn prorate(rewards_per_day: &Coins, elapsed: u64) -> Result<Coins> {
    let mut out = Coins::new();
    for (denom, amount) in rewards_per_day.iter() {
        let scaled = amount
            .get()
            .checked_mul(u128::from(elapsed))
            .ok_or(AmmError::Overflow("reward rate overflow"))?
            / u128::from(SECONDS_PER_DAY);
        out.set_amount(denom.clone(), Amount::new(scaled));
    }
    Ok(out)
}

//! Position lifecycle: adding and removing liquidity, settling and
//! collecting owed fees and farming rewards.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::tick::{growth_inside, update_tick};
use super::Amm;
use crate::domain::{Address, Amount, CoinPair, Coins, Liquidity, PoolId, PositionId, Rounding, Tick};
use crate::error::{AmmError, Result};
use crate::math::{amounts_for_liquidity, liquidity_for_amounts, sqrt_price_at_tick, CheckedArithmetic};
use crate::state::{Pool, Position};
use crate::traits::BankKeeper;

/// Outcome of [`Amm::add_liquidity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityResult {
    /// The position after the deposit.
    pub position: Position,
    /// Liquidity minted.
    pub liquidity: Liquidity,
    /// Coins moved from the depositor into the reserve.
    pub amount: Coins,
}

/// Outcome of [`Amm::remove_liquidity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityResult {
    /// The position after the withdrawal (already deleted from the store
    /// when it ended up empty).
    pub position: Position,
    /// Coins paid out of the reserve.
    pub amount: Coins,
    /// Owed fees and rewards collected because the position reached zero
    /// liquidity.
    pub collected: Coins,
}

impl<B: BankKeeper> Amm<B> {
    /// Adds liquidity over `[lower_tick, upper_tick)`.
    ///
    /// Mints the largest liquidity the desired amounts can back at the
    /// current price and transfers the amounts it actually needs, never
    /// more than desired, from `sender` into the pool reserve.  The
    /// `(pool, sender, range)` position is created on first use.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the pool does not exist.
    /// - [`AmmError::InvalidTickRange`] if `lower_tick >= upper_tick`.
    /// - [`AmmError::InvalidTick`] if a bound is not a multiple of the tick
    ///   spacing.
    /// - [`AmmError::InvalidAmount`] if both desired amounts are zero.
    /// - [`AmmError::InsufficientFunds`] if no liquidity can be minted or
    ///   `sender` cannot pay.
    pub fn add_liquidity(
        &mut self,
        sender: &Address,
        pool_id: PoolId,
        lower_tick: Tick,
        upper_tick: Tick,
        desired0: Amount,
        desired1: Amount,
    ) -> Result<AddLiquidityResult> {
        self.transact(|amm| amm.execute_add_liquidity(sender, pool_id, lower_tick, upper_tick, desired0, desired1))
    }

    fn execute_add_liquidity(
        &mut self,
        sender: &Address,
        pool_id: PoolId,
        lower_tick: Tick,
        upper_tick: Tick,
        desired0: Amount,
        desired1: Amount,
    ) -> Result<AddLiquidityResult> {
        let pool = self.store.get_pool(pool_id)?.clone();
        validate_range(&pool, lower_tick, upper_tick)?;
        if desired0.is_zero() && desired1.is_zero() {
            return Err(AmmError::InvalidAmount("desired amounts must not both be zero"));
        }
        let state = self.store.pool_state(pool_id)?;
        let liquidity = liquidity_for_amounts(
            state.current_sqrt_price,
            sqrt_price_at_tick(lower_tick)?,
            sqrt_price_at_tick(upper_tick)?,
            desired0,
            desired1,
        )?;
        if liquidity.is_zero() {
            return Err(AmmError::InsufficientFunds("desired amounts mint no liquidity"));
        }
        let delta = liquidity
            .to_delta()
            .ok_or(AmmError::Overflow("liquidity exceeds signed range"))?;
        let (position, amount) = self.modify_position(pool_id, sender, lower_tick, upper_tick, delta)?;
        if amount.amount0 > desired0 || amount.amount1 > desired1 {
            return Err(AmmError::Invariant("deposit exceeds desired amounts"));
        }
        let coins = amount.to_coins(&pool.denom0, &pool.denom1);
        self.bank.transfer(sender, &pool.reserve_address, &coins)?;
        info!(
            pool_id = %pool_id,
            position_id = %position.id,
            owner = %sender,
            lower = %lower_tick,
            upper = %upper_tick,
            liquidity = %liquidity,
            amount0 = %amount.amount0,
            amount1 = %amount.amount1,
            "liquidity added"
        );
        Ok(AddLiquidityResult {
            position,
            liquidity,
            amount: coins,
        })
    }

    /// Removes `liquidity` from a position and pays the underlying amounts
    /// to its owner.
    ///
    /// The payout is capped at the reserve's spendable balance.  When the
    /// pool's last liquidity is removed the whole remaining reserve is
    /// paid out instead, so rounding dust does not linger.  A position
    /// left with zero liquidity has its owed balances collected in the
    /// same operation.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the position does not exist.
    /// - [`AmmError::Unauthorized`] if `sender` does not own it.
    /// - [`AmmError::InvalidAmount`] if `liquidity` is zero.
    /// - [`AmmError::InsufficientLiquidity`] if the position holds less
    ///   than `liquidity`.
    pub fn remove_liquidity(
        &mut self,
        sender: &Address,
        position_id: PositionId,
        liquidity: Liquidity,
    ) -> Result<RemoveLiquidityResult> {
        self.transact(|amm| amm.execute_remove_liquidity(sender, position_id, liquidity))
    }

    fn execute_remove_liquidity(
        &mut self,
        sender: &Address,
        position_id: PositionId,
        liquidity: Liquidity,
    ) -> Result<RemoveLiquidityResult> {
        let position = self.owned_position(sender, position_id)?;
        if liquidity.is_zero() {
            return Err(AmmError::InvalidAmount("liquidity to remove must be positive"));
        }
        if liquidity > position.liquidity {
            return Err(AmmError::InsufficientLiquidity("position holds less liquidity"));
        }
        let pool = self.store.get_pool(position.pool_id)?.clone();
        let delta = liquidity
            .to_delta()
            .ok_or(AmmError::Overflow("liquidity exceeds signed range"))?;
        let (mut position, amount) = self.modify_position(
            pool.id,
            sender,
            position.lower_tick,
            position.upper_tick,
            -delta,
        )?;

        let reserve = self
            .bank
            .spendable_coins(&pool.reserve_address, [&pool.denom0, &pool.denom1]);
        let pool_drained = self.store.pool_state(pool.id)?.total_liquidity.is_zero();
        let payout = if pool_drained {
            reserve
        } else {
            amount.to_coins(&pool.denom0, &pool.denom1).min(&reserve)
        };
        self.bank.transfer(&pool.reserve_address, sender, &payout)?;
        info!(
            pool_id = %pool.id,
            position_id = %position_id,
            owner = %sender,
            liquidity = %liquidity,
            amount0 = %payout.amount_of(&pool.denom0),
            amount1 = %payout.amount_of(&pool.denom1),
            swept = pool_drained,
            "liquidity removed"
        );

        let collected = if position.liquidity.is_zero() {
            let collected = self.execute_collect(sender, position_id, None)?;
            position.owed_fee = CoinPair::ZERO;
            position.owed_farming_rewards = Coins::new();
            collected
        } else {
            Coins::new()
        };
        Ok(RemoveLiquidityResult {
            position,
            amount: payout,
            collected,
        })
    }

    /// Collects a position's owed fees and farming rewards, up to
    /// `max_amount` per denomination when given.
    ///
    /// Owed balances are settled first, then paid from the rewards pool
    /// account.  A position with no liquidity and nothing left owed is
    /// deleted.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the position does not exist.
    /// - [`AmmError::Unauthorized`] if `sender` does not own it.
    /// - [`AmmError::InsufficientFunds`] if the rewards pool cannot pay,
    ///   which indicates broken accounting.
    pub fn collect(&mut self, sender: &Address, position_id: PositionId, max_amount: Option<&Coins>) -> Result<Coins> {
        self.transact(|amm| amm.execute_collect(sender, position_id, max_amount))
    }

    fn execute_collect(&mut self, sender: &Address, position_id: PositionId, max_amount: Option<&Coins>) -> Result<Coins> {
        let mut position = self.owned_position(sender, position_id)?;
        if !position.liquidity.is_zero() {
            (position, _) = self.modify_position(position.pool_id, sender, position.lower_tick, position.upper_tick, 0)?;
        }
        let pool = self.store.get_pool(position.pool_id)?.clone();
        let mut owed = position.owed_fee.to_coins(&pool.denom0, &pool.denom1);
        owed.add(&position.owed_farming_rewards)?;
        let pay = max_amount.map_or_else(|| owed.clone(), |max| owed.min(max));

        if !pay.is_empty() {
            let rewards_pool = self.store.params().rewards_pool.clone();
            self.bank.transfer(&rewards_pool, sender, &pay)?;
            deduct_owed(&mut position, &pool, &pay)?;
            info!(position_id = %position_id, owner = %sender, collected = ?pay, "owed balances collected");
        }

        if position.is_empty() {
            self.store.delete_position(position_id);
            debug!(position_id = %position_id, "empty position deleted");
        } else {
            self.store.set_position(position);
        }
        Ok(pay)
    }

    /// Applies a signed liquidity delta to the `(pool, owner, range)`
    /// position, settling its owed balances first.
    ///
    /// 1. looks up the position, creating it for a positive delta;
    /// 2. updates both boundary ticks when the delta is non-zero;
    /// 3. computes inside growth for the range;
    /// 4. settles owed balances at the pre-delta liquidity;
    /// 5. applies the delta to the position, the pool's total liquidity
    ///    and, for a range containing the current tick, active liquidity;
    /// 6. deletes boundary ticks that flipped to uninitialized.
    ///
    /// Returns the updated position and the amounts backing `|delta|`,
    /// rounded up for deposits and down for withdrawals.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the position does not exist and `delta`
    ///   is not positive.
    /// - [`AmmError::Invariant`] if settling a position with neither
    ///   liquidity nor delta, or if growth bookkeeping is inconsistent.
    /// - [`AmmError::InsufficientLiquidity`] if the delta would make the
    ///   position negative.
    pub(crate) fn modify_position(
        &mut self,
        pool_id: PoolId,
        owner: &Address,
        lower_tick: Tick,
        upper_tick: Tick,
        delta: i128,
    ) -> Result<(Position, CoinPair)> {
        let mut position = match self.store.position_by_key(pool_id, owner, lower_tick, upper_tick) {
            Some(p) => p.clone(),
            None if delta > 0 => {
                let id = self.store.next_position_id();
                Position::new(id, pool_id, owner.clone(), lower_tick, upper_tick)
            }
            None => return Err(AmmError::NotFound("position not found")),
        };
        if position.liquidity.is_zero() && delta == 0 {
            return Err(AmmError::Invariant("settling a position without liquidity"));
        }
        let mut state = self.store.pool_state(pool_id)?.clone();

        let (flipped_lower, flipped_upper) = if delta == 0 {
            (false, false)
        } else {
            (
                update_tick(&mut self.store, pool_id, lower_tick, &state, delta, false)?,
                update_tick(&mut self.store, pool_id, upper_tick, &state, delta, true)?,
            )
        };

        let (fee_inside, farming_inside) = growth_inside(&self.store, pool_id, lower_tick, upper_tick, &state)?;
        if !position.liquidity.is_zero() {
            let fee_delta = fee_inside.wrapping_sub(&position.last_fee_growth_inside);
            if !fee_delta.is_all_lte(&state.fee_growth_global) {
                return Err(AmmError::Invariant("fee growth delta exceeds global growth"));
            }
            let farming_delta = farming_inside.wrapping_sub(&position.last_farming_rewards_growth_inside);
            if !farming_delta.is_all_lte(&state.farming_rewards_growth_global) {
                return Err(AmmError::Invariant("farming growth delta exceeds global growth"));
            }
            let liquidity = position.liquidity.get();
            position.owed_fee = position.owed_fee.checked_add(&fee_delta.owed_for(liquidity)?)?;
            position
                .owed_farming_rewards
                .add(&farming_delta.owed_for(liquidity)?)?;
        }
        position.last_fee_growth_inside = fee_inside;
        position.last_farming_rewards_growth_inside = farming_inside;

        let mut amount = CoinPair::ZERO;
        if delta != 0 {
            position.liquidity = position
                .liquidity
                .checked_apply(delta)
                .ok_or(AmmError::InsufficientLiquidity("position holds less liquidity"))?;
            state.total_liquidity = state
                .total_liquidity
                .checked_apply(delta)
                .ok_or(AmmError::Invariant("pool total liquidity out of range"))?;
            if state.is_in_range(lower_tick, upper_tick) {
                state.current_liquidity = state
                    .current_liquidity
                    .checked_apply(delta)
                    .ok_or(AmmError::Invariant("active liquidity out of range"))?;
            }
            if delta < 0 {
                if flipped_lower {
                    self.store.delete_tick_info(pool_id, lower_tick);
                }
                if flipped_upper {
                    self.store.delete_tick_info(pool_id, upper_tick);
                }
            }
            let rounding = if delta > 0 { Rounding::Up } else { Rounding::Down };
            let (amount0, amount1) = amounts_for_liquidity(
                state.current_sqrt_price,
                sqrt_price_at_tick(lower_tick)?,
                sqrt_price_at_tick(upper_tick)?,
                Liquidity::new(delta.unsigned_abs()),
                rounding,
            )?;
            amount = CoinPair::new(amount0, amount1);
        }

        self.store.set_pool_state(pool_id, state);
        self.store.set_position(position.clone());
        Ok((position, amount))
    }

    /// Looks up a position and checks its owner.
    pub(crate) fn owned_position(&self, sender: &Address, position_id: PositionId) -> Result<Position> {
        let position = self.store.get_position(position_id)?;
        if &position.owner != sender {
            return Err(AmmError::Unauthorized("position belongs to another account"));
        }
        Ok(position.clone())
    }
}

fn validate_range(pool: &Pool, lower_tick: Tick, upper_tick: Tick) -> Result<()> {
    if lower_tick >= upper_tick {
        return Err(AmmError::InvalidTickRange("lower tick must be below upper tick"));
    }
    if !pool.is_valid_tick(lower_tick) || !pool.is_valid_tick(upper_tick) {
        return Err(AmmError::InvalidTick("tick must be a multiple of the tick spacing"));
    }
    Ok(())
}

/// Subtracts collected coins from owed balances, fees first.
fn deduct_owed(position: &mut Position, pool: &Pool, paid: &Coins) -> Result<()> {
    for (denom, amount) in paid.iter() {
        let mut left = *amount;
        let fee_slot = if denom == &pool.denom0 {
            Some(&mut position.owed_fee.amount0)
        } else if denom == &pool.denom1 {
            Some(&mut position.owed_fee.amount1)
        } else {
            None
        };
        if let Some(slot) = fee_slot {
            let take = left.min(*slot);
            *slot = slot.safe_sub(&take)?;
            left = left.safe_sub(&take)?;
        }
        if !left.is_zero() {
            let remaining = Coins::single(denom.clone(), left);
            position.owed_farming_rewards = position
                .owed_farming_rewards
                .checked_sub(&remaining)
                .ok_or(AmmError::Invariant("collected more than owed"))?;
        }
    }
    Ok(())
}

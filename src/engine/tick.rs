//! Tick bookkeeping: liquidity updates, crossings and inside growth.
//!
//! Growth "outside" a tick is the growth on the side of the tick away
//! from the current price.  When a tick is initialized it assumes all
//! growth so far happened below it if the price is at or above the tick,
//! and none otherwise.  Crossing flips the snapshot to `global − outside`.
//! Inside growth of a range is `global − below − above`, computed in
//! modular arithmetic: it can wrap for a freshly initialized range, but
//! the difference between two inside snapshots of one range never does.

use tracing::trace;

use crate::domain::{DecCoins, DecPair, PoolId, Tick};
use crate::error::{AmmError, Result};
use crate::state::{PoolState, TickInfo};
use crate::store::Store;

/// Applies a liquidity delta to one boundary tick of a range and returns
/// whether the tick flipped between initialized and uninitialized.
///
/// The record is kept even when its gross liquidity drops to zero; the
/// caller deletes flipped-off ticks once it no longer needs their
/// snapshots.
pub(crate) fn update_tick(
    store: &mut Store,
    pool_id: PoolId,
    tick: Tick,
    state: &PoolState,
    liquidity_delta: i128,
    is_upper: bool,
) -> Result<bool> {
    let mut info = store.tick_info(pool_id, tick).cloned().unwrap_or_default();
    let gross_before = info.gross_liquidity;
    let gross_after = gross_before
        .checked_apply(liquidity_delta)
        .ok_or(AmmError::Invariant("tick gross liquidity out of range"))?;
    let flipped = gross_after.is_zero() != gross_before.is_zero();

    if gross_before.is_zero() && tick <= state.current_tick {
        info.fee_growth_outside = state.fee_growth_global;
        info.farming_rewards_growth_outside = state.farming_rewards_growth_global.clone();
    }
    info.gross_liquidity = gross_after;
    info.net_liquidity = if is_upper {
        info.net_liquidity.checked_sub(liquidity_delta)
    } else {
        info.net_liquidity.checked_add(liquidity_delta)
    }
    .ok_or(AmmError::Overflow("tick net liquidity overflow"))?;

    if !info.is_consistent() {
        return Err(AmmError::Invariant("tick net liquidity exceeds gross"));
    }
    trace!(pool_id = %pool_id, tick = %tick, gross = %gross_after, net = info.net_liquidity, flipped, "tick updated");
    store.set_tick_info(pool_id, tick, info);
    Ok(flipped)
}

/// Flips a tick's outside growth as the price crosses it and returns its
/// net liquidity.
///
/// # Errors
///
/// Returns [`AmmError::Invariant`] if the tick is not initialized or an
/// outside snapshot exceeds global growth.
pub(crate) fn cross_tick(store: &mut Store, pool_id: PoolId, tick: Tick, state: &PoolState) -> Result<i128> {
    let mut info = store
        .tick_info(pool_id, tick)
        .cloned()
        .ok_or(AmmError::Invariant("crossed tick is not initialized"))?;
    info.fee_growth_outside = state.fee_growth_global.checked_sub(&info.fee_growth_outside)?;
    info.farming_rewards_growth_outside = state
        .farming_rewards_growth_global
        .checked_sub(&info.farming_rewards_growth_outside)?;
    let net = info.net_liquidity;
    store.set_tick_info(pool_id, tick, info);
    trace!(pool_id = %pool_id, tick = %tick, net, "tick crossed");
    Ok(net)
}

/// Inside growth of `[lower, upper)` as `(fees, farming rewards)`.
///
/// # Errors
///
/// Returns [`AmmError::Invariant`] if either boundary tick is missing or
/// an outside snapshot exceeds global growth.
pub(crate) fn growth_inside(
    store: &Store,
    pool_id: PoolId,
    lower: Tick,
    upper: Tick,
    state: &PoolState,
) -> Result<(DecPair, DecCoins)> {
    let lower_info = boundary(store, pool_id, lower)?;
    let upper_info = boundary(store, pool_id, upper)?;
    let global_fee = &state.fee_growth_global;
    let global_farming = &state.farming_rewards_growth_global;

    let (fee_below, farming_below) = if state.current_tick >= lower {
        (lower_info.fee_growth_outside, lower_info.farming_rewards_growth_outside.clone())
    } else {
        (
            global_fee.checked_sub(&lower_info.fee_growth_outside)?,
            global_farming.checked_sub(&lower_info.farming_rewards_growth_outside)?,
        )
    };
    let (fee_above, farming_above) = if state.current_tick < upper {
        (upper_info.fee_growth_outside, upper_info.farming_rewards_growth_outside.clone())
    } else {
        (
            global_fee.checked_sub(&upper_info.fee_growth_outside)?,
            global_farming.checked_sub(&upper_info.farming_rewards_growth_outside)?,
        )
    };

    Ok((
        global_fee.wrapping_sub(&fee_below).wrapping_sub(&fee_above),
        global_farming.wrapping_sub(&farming_below).wrapping_sub(&farming_above),
    ))
}

fn boundary(store: &Store, pool_id: PoolId, tick: Tick) -> Result<&TickInfo> {
    store
        .tick_info(pool_id, tick)
        .ok_or(AmmError::Invariant("range boundary tick is not initialized"))
}

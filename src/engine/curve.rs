//! Walking the liquidity curve across initialized ticks.
//!
//! Order generation and fill settlement both move a pool's price along
//! the curve segment by segment, where segment boundaries are the
//! initialized ticks in the way.  Both go through [`span`] so that the
//! amounts an order is sized with are exactly the amounts its fill is
//! settled against.
//!
//! Crossing rules:
//!
//! - moving down to tick `t`, every initialized `k` with `t < k <= from`
//!   is crossed, so landing exactly on a tick price does not cross it;
//! - moving up to tick `t`, every initialized `k` with `from < k <= t` is
//!   crossed.

use primitive_types::U256;

use crate::domain::{Amount, Dec, Liquidity, OrderSide, PoolId, Rounding, Tick};
use crate::error::{AmmError, Result};
use crate::math::{amount0_delta, amount1_delta, next_sqrt_price_from_output, sqrt_price_at_tick, tick_at_sqrt_price};
use crate::state::PoolState;
use crate::store::Store;

/// A point on the curve with the liquidity active just past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub sqrt_price: Dec,
    pub tick: Tick,
    pub liquidity: Liquidity,
}

impl Cursor {
    pub(crate) fn of(state: &PoolState) -> Self {
        Self {
            sqrt_price: state.current_sqrt_price,
            tick: state.current_tick,
            liquidity: state.current_liquidity,
        }
    }
}

/// Result of moving along the curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span {
    /// What the pool receives, summed per segment and rounded up.
    pub input: Amount,
    /// What the pool pays, summed per segment and rounded down.
    pub output: Amount,
    /// Where the move ends.
    pub end: Cursor,
    /// Initialized ticks crossed, in crossing order.
    pub crossed: Vec<Tick>,
}

/// An initialized tick between two curve points.
#[derive(Debug, Clone, Copy)]
struct Boundary {
    tick: Tick,
    sqrt_price: Dec,
    net_liquidity: i128,
}

/// Moves from `from` to `to_sqrt_price` on `side`: a pool buying base
/// moves the price down, a pool selling base moves it up.
///
/// # Errors
///
/// - [`AmmError::Invariant`] if the target lies on the wrong side of
///   `from` or crossing drives liquidity negative.
/// - Propagates math errors.
pub(crate) fn span(store: &Store, pool_id: PoolId, side: OrderSide, from: &Cursor, to_sqrt_price: Dec) -> Result<Span> {
    check_direction(side, from.sqrt_price, to_sqrt_price)?;
    let to_tick = tick_at_sqrt_price(to_sqrt_price)?;
    let mut out = Span {
        input: Amount::ZERO,
        output: Amount::ZERO,
        end: *from,
        crossed: Vec::new(),
    };
    for boundary in boundaries(store, pool_id, side, from.tick, to_tick)? {
        accumulate(&mut out, side, boundary.sqrt_price)?;
        out.end.liquidity = cross(out.end.liquidity, boundary.net_liquidity, side)?;
        out.crossed.push(boundary.tick);
    }
    accumulate(&mut out, side, to_sqrt_price)?;
    out.end.tick = to_tick;
    Ok(out)
}

/// Square-root price reached from `from` once the pool has paid `output`,
/// never moving past `bound_sqrt_price`.
///
/// Within a segment the price is solved with
/// [`next_sqrt_price_from_output`], which never overshoots the exact
/// solution.
///
/// # Errors
///
/// Same as [`span`].
pub(crate) fn solve_output(
    store: &Store,
    pool_id: PoolId,
    side: OrderSide,
    from: &Cursor,
    bound_sqrt_price: Dec,
    output: Amount,
) -> Result<Dec> {
    check_direction(side, from.sqrt_price, bound_sqrt_price)?;
    let bound_tick = tick_at_sqrt_price(bound_sqrt_price)?;
    let mut sqrt_price = from.sqrt_price;
    let mut liquidity = from.liquidity;
    let mut remaining = output;

    let stops = boundaries(store, pool_id, side, from.tick, bound_tick)?
        .into_iter()
        .map(|b| (b.sqrt_price, Some(b.net_liquidity)))
        .chain(std::iter::once((bound_sqrt_price, None)));
    for (stop, net) in stops {
        let capacity = segment_output(side, sqrt_price, stop, liquidity)?;
        if remaining <= capacity {
            let solved = next_sqrt_price_from_output(sqrt_price, liquidity, remaining, side)?;
            return Ok(nearer(side, solved, stop));
        }
        remaining = remaining
            .checked_sub(&capacity)
            .ok_or(AmmError::Underflow("segment output exceeds remaining"))?;
        sqrt_price = stop;
        if let Some(net) = net {
            liquidity = cross(liquidity, net, side)?;
        }
    }
    Ok(bound_sqrt_price)
}

/// Square-root price reached from `from` once the pool has received
/// `input`, never moving past `bound_sqrt_price`.
///
/// The result is the furthest price whose [`span`] input is at most
/// `input`, segment roundings included, so settling a move to it never
/// needs more than was received.
///
/// # Errors
///
/// Same as [`span`].
pub(crate) fn solve_input(
    store: &Store,
    pool_id: PoolId,
    side: OrderSide,
    from: &Cursor,
    bound_sqrt_price: Dec,
    input: Amount,
) -> Result<Dec> {
    check_direction(side, from.sqrt_price, bound_sqrt_price)?;
    let bound_tick = tick_at_sqrt_price(bound_sqrt_price)?;
    let mut sqrt_price = from.sqrt_price;
    let mut liquidity = from.liquidity;
    let mut remaining = input;

    let stops = boundaries(store, pool_id, side, from.tick, bound_tick)?
        .into_iter()
        .map(|b| (b.sqrt_price, Some(b.net_liquidity)))
        .chain(std::iter::once((bound_sqrt_price, None)));
    for (stop, net) in stops {
        let capacity = segment_input(side, sqrt_price, stop, liquidity)?;
        if remaining < capacity {
            return segment_reach(side, sqrt_price, stop, liquidity, remaining);
        }
        remaining = remaining
            .checked_sub(&capacity)
            .ok_or(AmmError::Underflow("segment input exceeds remaining"))?;
        sqrt_price = stop;
        if let Some(net) = net {
            liquidity = cross(liquidity, net, side)?;
        }
    }
    Ok(bound_sqrt_price)
}

/// Furthest price in `[start, stop)` whose segment input fits `budget`.
///
/// `segment_input(start, stop)` must exceed `budget`.  Bisects on the raw
/// distance from `start`, where the input is monotone.
fn segment_reach(side: OrderSide, start: Dec, stop: Dec, liquidity: Liquidity, budget: Amount) -> Result<Dec> {
    let (s, t) = (start.raw(), stop.raw());
    let at = |offset: U256| match side {
        OrderSide::Buy => Dec::from_raw(s - offset),
        OrderSide::Sell => Dec::from_raw(s + offset),
    };
    let mut lo = U256::zero();
    let mut hi = if s > t { s - t } else { t - s };
    while hi - lo > U256::one() {
        let mid = lo + (hi - lo) / U256::from(2u8);
        if segment_input(side, start, at(mid), liquidity)? <= budget {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(at(lo))
}

/// Of two prices on the `side` of a common start, the one closer to it.
pub(crate) fn nearer(side: OrderSide, a: Dec, b: Dec) -> Dec {
    match side {
        OrderSide::Buy => a.max(b),
        OrderSide::Sell => a.min(b),
    }
}

/// Initialized ticks crossed moving from `from_tick` to `to_tick`.
fn boundaries(store: &Store, pool_id: PoolId, side: OrderSide, from_tick: Tick, to_tick: Tick) -> Result<Vec<Boundary>> {
    let ticks: Vec<(Tick, i128)> = match side {
        OrderSide::Buy => store
            .ticks_below(pool_id, from_tick, true)
            .take_while(|(k, _)| *k > to_tick)
            .map(|(k, info)| (k, info.net_liquidity))
            .collect(),
        OrderSide::Sell => store
            .ticks_above(pool_id, from_tick, false)
            .take_while(|(k, _)| *k <= to_tick)
            .map(|(k, info)| (k, info.net_liquidity))
            .collect(),
    };
    ticks
        .into_iter()
        .map(|(tick, net_liquidity)| {
            Ok(Boundary {
                tick,
                sqrt_price: sqrt_price_at_tick(tick)?,
                net_liquidity,
            })
        })
        .collect()
}

fn accumulate(span: &mut Span, side: OrderSide, to: Dec) -> Result<()> {
    let from = span.end.sqrt_price;
    let liquidity = span.end.liquidity;
    let input = segment_input(side, from, to, liquidity)?;
    let output = segment_output(side, from, to, liquidity)?;
    span.input = span
        .input
        .checked_add(&input)
        .ok_or(AmmError::Overflow("span input overflow"))?;
    span.output = span
        .output
        .checked_add(&output)
        .ok_or(AmmError::Overflow("span output overflow"))?;
    span.end.sqrt_price = to;
    Ok(())
}

fn segment_input(side: OrderSide, a: Dec, b: Dec, liquidity: Liquidity) -> Result<Amount> {
    if a == b || liquidity.is_zero() {
        return Ok(Amount::ZERO);
    }
    match side {
        OrderSide::Buy => amount0_delta(a, b, liquidity, Rounding::Up),
        OrderSide::Sell => amount1_delta(a, b, liquidity, Rounding::Up),
    }
}

fn segment_output(side: OrderSide, a: Dec, b: Dec, liquidity: Liquidity) -> Result<Amount> {
    if a == b || liquidity.is_zero() {
        return Ok(Amount::ZERO);
    }
    match side {
        OrderSide::Buy => amount1_delta(a, b, liquidity, Rounding::Down),
        OrderSide::Sell => amount0_delta(a, b, liquidity, Rounding::Down),
    }
}

/// Liquidity active after crossing a tick with `net` in the direction of
/// `side`.
pub(crate) fn cross(liquidity: Liquidity, net: i128, side: OrderSide) -> Result<Liquidity> {
    let delta = match side {
        OrderSide::Buy => net.checked_neg().ok_or(AmmError::Overflow("net liquidity overflow"))?,
        OrderSide::Sell => net,
    };
    liquidity
        .checked_apply(delta)
        .ok_or(AmmError::Invariant("crossing drives active liquidity negative"))
}

fn check_direction(side: OrderSide, from: Dec, to: Dec) -> Result<()> {
    let ok = match side {
        OrderSide::Buy => to <= from,
        OrderSide::Sell => to >= from,
    };
    if ok {
        Ok(())
    } else {
        Err(AmmError::Invariant("curve walk against the order side"))
    }
}

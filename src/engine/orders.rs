//! Projection of a pool's curve onto discrete limit orders.
//!
//! Buy orders sit below the current price and sell orders above it, each
//! at a tick price.  An order's quantity is what the curve yields moving
//! from the previous order's price to its own:
//!
//! - buy: the quote the curve releases, divided by the order price and
//!   rounded down;
//! - sell: the base the curve releases, rounded down.
//!
//! An order tick is only used if a full fill at that price pays the pool
//! at least what the curve expects as input, so settling it can never
//! produce a negative surplus.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::curve::{span, Cursor, Span};
use super::Amm;
use crate::domain::{Amount, Dec, OrderId, OrderSide, PoolId, Rounding, Tick};
use crate::error::{AmmError, Result};
use crate::math::{next_sqrt_price_from_output, price_at_tick, sqrt_price_at_tick, tick_at_sqrt_price};
use crate::state::Pool;
use crate::store::Store;
use crate::traits::{BankKeeper, MatchingEngine};

/// Bounds for one side of order generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Side of the pool's orders.
    pub side: OrderSide,
    /// Lowest buy price or highest sell price to quote.
    pub price_limit: Option<Dec>,
    /// Cap on the number of orders, on top of the configured cap.
    pub max_orders: Option<u32>,
}

impl OrderRequest {
    /// Unbounded request for `side`.
    #[must_use]
    pub const fn new(side: OrderSide) -> Self {
        Self {
            side,
            price_limit: None,
            max_orders: None,
        }
    }

    /// Stops at `price`.
    #[must_use]
    pub const fn with_price_limit(mut self, price: Dec) -> Self {
        self.price_limit = Some(price);
        self
    }

    /// Emits at most `n` orders.
    #[must_use]
    pub const fn with_max_orders(mut self, n: u32) -> Self {
        self.max_orders = Some(n);
        self
    }
}

/// A synthetic limit order of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolOrder {
    /// Side.
    pub side: OrderSide,
    /// Tick of the order price.
    pub tick: Tick,
    /// Order price, quote per base.
    pub price: Dec,
    /// Base quantity.
    pub quantity: Amount,
}

impl PoolOrder {
    /// Quote amount of a full fill, rounded down.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the product exceeds `u128`.
    pub fn quote_amount(&self) -> Result<Amount> {
        self.price
            .mul_int_to_int(self.quantity.get(), Rounding::Down)
            .map(Amount::new)
    }
}

/// A candidate order with the curve move that backs it.
struct Candidate {
    order: PoolOrder,
    quote: Amount,
    span: Span,
}

/// Per-side order sizing limits resolved from params and the request.
struct Limits {
    min_quantity: Amount,
    min_quote: Amount,
    price_limit: Option<Dec>,
}

impl<B: BankKeeper> Amm<B> {
    /// Orders a pool would post on one side at the current state.
    ///
    /// Generation stops when the reserve cannot back the next order, when
    /// the price limit or order cap is reached, or when no further valid
    /// order tick exists.  The result depends only on state: calling it
    /// twice without mutations in between returns the same orders.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the pool does not exist.
    /// - Propagates math errors, which indicate corrupted state.
    pub fn pool_orders(&self, pool_id: PoolId, request: &OrderRequest) -> Result<Vec<PoolOrder>> {
        let pool = self.store.get_pool(pool_id)?;
        let state = self.store.pool_state(pool_id)?;
        let params = self.store.params();
        let cap = request
            .max_orders
            .map_or(params.order_limits.max_orders_per_side, |n| {
                n.min(params.order_limits.max_orders_per_side)
            });
        let limits = Limits {
            min_quantity: params.order_limits.min_order_quantity,
            min_quote: params.order_limits.min_order_quote,
            price_limit: request.price_limit,
        };
        let budget_denom = match request.side {
            OrderSide::Buy => &pool.denom1,
            OrderSide::Sell => &pool.denom0,
        };
        let mut budget = self.bank.spendable_balance(&pool.reserve_address, budget_denom);

        let mut cursor = Cursor::of(state);
        let mut orders = Vec::new();
        while orders.len() < cap as usize {
            let Some(next) = next_order_tick(&self.store, pool, request.side, &cursor, &limits)? else {
                break;
            };
            let required = match request.side {
                OrderSide::Buy => next.quote,
                OrderSide::Sell => next.order.quantity,
            };
            let Some(left) = budget.checked_sub(&required) else {
                debug!(pool_id = %pool_id, side = %request.side, tick = %next.order.tick, "reserve exhausted");
                break;
            };
            budget = left;
            orders.push(next.order);
            cursor = next.span.end;
        }
        Ok(orders)
    }

    /// Cancels a pool's previously posted orders and posts freshly
    /// generated ones on both sides.
    ///
    /// Orders are placed on behalf of the pool reserve; their ids are
    /// recorded so the next call can cancel them.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the pool does not exist.
    /// - Propagates `engine` errors.  The engine is not rolled back with
    ///   the store, so a failing engine may be left with some orders
    ///   cancelled.
    pub fn post_pool_orders<M: MatchingEngine>(&mut self, engine: &mut M, pool_id: PoolId) -> Result<Vec<(OrderId, PoolOrder)>> {
        self.transact(|amm| {
            let pool = amm.store.get_pool(pool_id)?.clone();
            for &order_id in amm.store.posted_orders(pool_id) {
                engine.cancel_order(&pool.reserve_address, pool.market_id, order_id)?;
            }
            let mut posted = Vec::new();
            for side in [OrderSide::Buy, OrderSide::Sell] {
                for order in amm.pool_orders(pool_id, &OrderRequest::new(side))? {
                    let id = engine.place_limit_order(
                        &pool.reserve_address,
                        pool.market_id,
                        order.side,
                        order.price,
                        order.quantity,
                    )?;
                    posted.push((id, order));
                }
            }
            amm.store
                .set_posted_orders(pool_id, posted.iter().map(|(id, _)| *id).collect());
            info!(pool_id = %pool_id, orders = posted.len(), "pool orders posted");
            Ok(posted)
        })
    }
}

/// Finds the first spacing-aligned tick past `from` whose order meets the
/// minimum quantity and quote amount and settles with a non-negative
/// surplus.
///
/// Thin liquidity near `from` is coalesced: rather than testing every
/// aligned tick, the search jumps to where the shortfall would be covered
/// at the liquidity active at the current candidate, bounded by the next
/// initialized tick where that liquidity changes.
fn next_order_tick(store: &Store, pool: &Pool, side: OrderSide, from: &Cursor, limits: &Limits) -> Result<Option<Candidate>> {
    let spacing = pool.tick_spacing;
    let Some(mut tick) = first_candidate(side, from, spacing)? else {
        return Ok(None);
    };
    loop {
        let price = price_at_tick(tick)?;
        if limits
            .price_limit
            .is_some_and(|limit| beyond_limit(side, price, limit))
        {
            return Ok(None);
        }
        let sqrt_price = sqrt_price_at_tick(tick)?;
        let walked = span(store, pool.id, side, from, sqrt_price)?;
        let (quantity, quote) = order_size(side, &walked, price)?;
        let valid = match side {
            OrderSide::Buy => quantity >= walked.input,
            OrderSide::Sell => quote >= walked.input,
        };
        if valid && !quantity.is_zero() && quantity >= limits.min_quantity && quote >= limits.min_quote {
            return Ok(Some(Candidate {
                order: PoolOrder {
                    side,
                    tick,
                    price,
                    quantity,
                },
                quote,
                span: walked,
            }));
        }

        let Some(next) = jump(store, pool, side, &walked, price, quantity, limits)? else {
            return Ok(None);
        };
        tick = next;
    }
}

/// The nearest aligned tick strictly past `from`'s price.
fn first_candidate(side: OrderSide, from: &Cursor, spacing: u32) -> Result<Option<Tick>> {
    let candidate = match side {
        OrderSide::Buy => {
            let Ok(t) = from.tick.round_to_spacing(spacing, Rounding::Down) else {
                return Ok(None);
            };
            if sqrt_price_at_tick(t)? < from.sqrt_price {
                Some(t)
            } else {
                t.checked_sub(spacing_i32(spacing)?)
            }
        }
        OrderSide::Sell => from
            .tick
            .checked_add(1)
            .and_then(|t| t.round_to_spacing(spacing, Rounding::Up).ok()),
    };
    Ok(candidate.filter(|t| within_bounds(side, *t, spacing)))
}

/// Next candidate after `walked` fell short of the order limits.
fn jump(
    store: &Store,
    pool: &Pool,
    side: OrderSide,
    walked: &Span,
    price: Dec,
    quantity: Amount,
    limits: &Limits,
) -> Result<Option<Tick>> {
    let spacing = pool.tick_spacing;
    let step = spacing_i32(spacing)?;
    let here = walked.end.tick;
    let one_step = match side {
        OrderSide::Buy => here.checked_sub(step),
        OrderSide::Sell => here.checked_add(step),
    };
    let Some(one_step) = one_step.filter(|t| within_bounds(side, *t, spacing)) else {
        return Ok(None);
    };
    let next_initialized = match side {
        OrderSide::Buy => store.ticks_below(pool.id, here, true).next().map(|(t, _)| t),
        OrderSide::Sell => store.ticks_above(pool.id, here, false).next().map(|(t, _)| t),
    };

    if walked.end.liquidity.is_zero() {
        // Nothing to quote until liquidity resumes.
        return Ok(next_initialized.map(|t| farther(side, t, one_step)));
    }

    // Output still missing at the current candidate.
    let shortfall = match side {
        OrderSide::Buy => {
            let needed = price
                .mul_int_to_int(limits.min_quantity.get(), Rounding::Up)?
                .max(limits.min_quote.get());
            Amount::new(needed).saturating_sub(&walked.output)
        }
        OrderSide::Sell => {
            let for_quote = Dec::from_int(limits.min_quote.get())
                .div(&price, Rounding::Up)?
                .to_int(Rounding::Up)?;
            Amount::new(for_quote.max(limits.min_quantity.get())).saturating_sub(&quantity)
        }
    };
    if shortfall.is_zero() {
        return Ok(Some(one_step));
    }
    let estimate = match next_sqrt_price_from_output(walked.end.sqrt_price, walked.end.liquidity, shortfall, side) {
        Ok(sqrt_price) => {
            let rounding = match side {
                OrderSide::Buy => Rounding::Down,
                OrderSide::Sell => Rounding::Up,
            };
            tick_at_sqrt_price(sqrt_price)?
                .round_to_spacing(spacing, rounding)
                .ok()
                .filter(|t| within_bounds(side, *t, spacing))
        }
        Err(AmmError::InsufficientLiquidity(_)) => None,
        Err(e) => return Err(e),
    };
    let target = match (estimate, next_initialized) {
        (Some(e), Some(n)) => nearer(side, e, n),
        (Some(e), None) => e,
        (None, Some(n)) => n,
        (None, None) => return Ok(None),
    };
    Ok(Some(farther(side, target, one_step)))
}

fn order_size(side: OrderSide, walked: &Span, price: Dec) -> Result<(Amount, Amount)> {
    let quantity = match side {
        OrderSide::Buy => Amount::new(Dec::from_int(walked.output.get()).div(&price, Rounding::Down)?.to_int(Rounding::Down)?),
        OrderSide::Sell => walked.output,
    };
    let quote = Amount::new(price.mul_int_to_int(quantity.get(), Rounding::Down)?);
    Ok((quantity, quote))
}

fn beyond_limit(side: OrderSide, price: Dec, limit: Dec) -> bool {
    match side {
        OrderSide::Buy => price < limit,
        OrderSide::Sell => price > limit,
    }
}

fn within_bounds(side: OrderSide, tick: Tick, spacing: u32) -> bool {
    match side {
        OrderSide::Buy => Tick::min_aligned(spacing).is_ok_and(|min| tick >= min),
        OrderSide::Sell => Tick::max_aligned(spacing).is_ok_and(|max| tick <= max),
    }
}

/// The farther of two ticks in the direction of `side`.
fn farther(side: OrderSide, a: Tick, b: Tick) -> Tick {
    match side {
        OrderSide::Buy => a.min(b),
        OrderSide::Sell => a.max(b),
    }
}

/// The nearer of two ticks in the direction of `side`.
fn nearer(side: OrderSide, a: Tick, b: Tick) -> Tick {
    match side {
        OrderSide::Buy => a.max(b),
        OrderSide::Sell => a.min(b),
    }
}

fn spacing_i32(spacing: u32) -> Result<i32> {
    i32::try_from(spacing).map_err(|_| AmmError::InvalidConfiguration("tick spacing out of range"))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::domain::Address;
    use crate::memory::{InMemoryLedger, InMemoryOrderBook};

    fn funded_pool() -> (Amm<InMemoryLedger>, PoolId) {
        let (mut amm, pool_id) = amm_with_pool();
        let Ok(_) = amm.add_liquidity(
            &alice(),
            pool_id,
            tick(35_000),
            tick(45_000),
            Amount::new(10_000_000),
            Amount::new(50_000_000),
        ) else {
            panic!("liquidity");
        };
        let Ok(_) = amm.add_liquidity(
            &bob(),
            pool_id,
            tick(39_500),
            tick(40_500),
            Amount::new(5_000_000),
            Amount::new(25_000_000),
        ) else {
            panic!("liquidity");
        };
        (amm, pool_id)
    }

    fn orders(amm: &Amm<InMemoryLedger>, pool_id: PoolId, request: OrderRequest) -> Vec<PoolOrder> {
        let Ok(orders) = amm.pool_orders(pool_id, &request) else {
            panic!("orders");
        };
        orders
    }

    #[test]
    fn orders_straddle_the_price_and_move_away() {
        let (amm, pool_id) = funded_pool();
        let Ok(price) = amm.store().pool_state(pool_id).map(|s| s.current_sqrt_price) else {
            panic!("state");
        };
        let Ok(price) = price.mul(&price, Rounding::Down) else {
            panic!("price");
        };
        let buys = orders(&amm, pool_id, OrderRequest::new(OrderSide::Buy));
        let sells = orders(&amm, pool_id, OrderRequest::new(OrderSide::Sell));
        assert!(!buys.is_empty() && !sells.is_empty());
        assert!(buys.iter().all(|o| o.price < price && o.tick.is_aligned(10)));
        assert!(sells.iter().all(|o| o.price > price && o.tick.is_aligned(10)));
        assert!(buys.windows(2).all(|w| w[0].price > w[1].price));
        assert!(sells.windows(2).all(|w| w[0].price < w[1].price));
        assert!(buys.iter().chain(&sells).all(|o| !o.quantity.is_zero()));
    }

    #[test]
    fn generation_is_idempotent() {
        let (amm, pool_id) = funded_pool();
        let request = OrderRequest::new(OrderSide::Sell);
        assert_eq!(orders(&amm, pool_id, request), orders(&amm, pool_id, request));
    }

    #[test]
    fn caps_and_limits_are_respected() {
        let (amm, pool_id) = funded_pool();
        let capped = orders(&amm, pool_id, OrderRequest::new(OrderSide::Buy).with_max_orders(3));
        assert_eq!(capped.len(), 3);
        let limit = dec("4.9");
        let limited = orders(&amm, pool_id, OrderRequest::new(OrderSide::Buy).with_price_limit(limit));
        assert!(limited.iter().all(|o| o.price >= limit));
        let all = orders(&amm, pool_id, OrderRequest::new(OrderSide::Buy));
        assert_eq!(all.len(), amm.params().order_limits.max_orders_per_side as usize);
    }

    #[test]
    fn min_quote_coalesces_thin_levels() {
        let (mut amm, pool_id) = funded_pool();
        let fine = orders(&amm, pool_id, OrderRequest::new(OrderSide::Sell).with_max_orders(1));
        let mut params = amm.params().clone();
        params.order_limits.min_order_quote = Amount::new(2_000_000);
        let Ok(()) = amm.update_params(params) else {
            panic!("params");
        };
        let coarse = orders(&amm, pool_id, OrderRequest::new(OrderSide::Sell).with_max_orders(1));
        assert_eq!(coarse.len(), 1);
        assert!(coarse[0].tick > fine[0].tick);
        let Ok(quote) = coarse[0].quote_amount() else {
            panic!("quote");
        };
        assert!(quote >= Amount::new(2_000_000));
    }

    #[test]
    fn empty_pool_quotes_nothing() {
        let (amm, pool_id) = amm_with_pool();
        assert!(orders(&amm, pool_id, OrderRequest::new(OrderSide::Buy)).is_empty());
        assert!(orders(&amm, pool_id, OrderRequest::new(OrderSide::Sell)).is_empty());
    }

    #[test]
    fn reposting_cancels_previous_orders() {
        let (mut amm, pool_id) = funded_pool();
        let mut book = InMemoryOrderBook::default();
        let Ok(first) = amm.post_pool_orders(&mut book, pool_id) else {
            panic!("post");
        };
        let market = crate::domain::MarketId::new(1);
        assert_eq!(book.resting_orders(market).len(), first.len());
        let Ok(second) = amm.post_pool_orders(&mut book, pool_id) else {
            panic!("repost");
        };
        assert_eq!(book.resting_orders(market).len(), second.len());
        assert!(first.iter().all(|(id, _)| book.order(*id).is_none()));
        let reserve = Address::pool_reserve(pool_id);
        assert!(book.resting_orders(market).iter().all(|o| o.orderer == reserve));
    }
}

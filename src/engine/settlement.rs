//! Reconciling matching-engine fills of pool orders with pool state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::curve::{cross, nearer, solve_input, solve_output, span, Cursor};
use super::tick::cross_tick;
use super::Amm;
use crate::domain::{Amount, CoinPair, Dec, DecPair, OrderSide, PoolId, Rounding, Tick};
use crate::error::{AmmError, Result};
use crate::math::{price_at_tick, sqrt_price_at_tick, tick_at_price};
use crate::traits::{BankKeeper, PoolOrderFill};

/// Outcome of [`Amm::settle_pool_fills`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Pool settled.
    pub pool_id: PoolId,
    /// Number of fills applied.
    pub fills: usize,
    /// Initialized ticks crossed.
    pub crossed_ticks: usize,
    /// Surplus credited to fee growth and moved to the rewards pool.
    pub credited: CoinPair,
    /// Surplus left in the reserve because no liquidity was active.
    pub retained: CoinPair,
    /// Tick after the last fill.
    pub current_tick: Tick,
    /// Square-root price after the last fill.
    pub current_sqrt_price: Dec,
}

impl<B: BankKeeper> Amm<B> {
    /// Applies the fills of a pool's orders from one matching cycle.
    ///
    /// `fills` must be ordered by execution price moving away from the
    /// pool price.  For each fill the price moves to the order price when
    /// the order was fully executed.  A partial fill moves it to the nearer
    /// of the prices solved from the amount paid and from the amount
    /// received, so the curve never expects more than the pool received.
    /// Ticks on the way are crossed, and the
    /// difference between what the pool received and what the curve
    /// expected is credited to fee growth of the received denomination.
    /// The credited surplus is then moved from the reserve to the rewards
    /// pool, which pays it out on collect.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the pool does not exist.
    /// - [`AmmError::InvalidAmount`] for an empty fill.
    /// - [`AmmError::InvalidPrice`] if a fill price is not a tick price or
    ///   lies on the wrong side of the pool price.
    /// - [`AmmError::Invariant`] if the pool received less than the curve
    ///   expects.
    pub fn settle_pool_fills(&mut self, pool_id: PoolId, fills: &[PoolOrderFill]) -> Result<SettlementReport> {
        self.transact(|amm| amm.execute_settle_pool_fills(pool_id, fills))
    }

    fn execute_settle_pool_fills(&mut self, pool_id: PoolId, fills: &[PoolOrderFill]) -> Result<SettlementReport> {
        let pool = self.store.get_pool(pool_id)?.clone();
        let mut credited = CoinPair::ZERO;
        let mut retained = CoinPair::ZERO;
        let mut crossed_ticks = 0;

        for fill in fills {
            if fill.filled_quantity.is_zero() {
                return Err(AmmError::InvalidAmount("fill quantity must be positive"));
            }
            let order_tick = tick_at_price(fill.price)?;
            if price_at_tick(order_tick)? != fill.price {
                return Err(AmmError::InvalidPrice("fill price is not a tick price"));
            }
            let order_sqrt_price = sqrt_price_at_tick(order_tick)?;
            let mut state = self.store.pool_state(pool_id)?.clone();
            let from = Cursor::of(&state);
            let on_side = match fill.side {
                OrderSide::Buy => order_sqrt_price <= from.sqrt_price,
                OrderSide::Sell => order_sqrt_price >= from.sqrt_price,
            };
            if !on_side {
                return Err(AmmError::InvalidPrice("fill price on the wrong side of the pool price"));
            }

            let target = if fill.is_fully_executed() {
                order_sqrt_price
            } else {
                let by_paid = solve_output(&self.store, pool_id, fill.side, &from, order_sqrt_price, fill.paid)?;
                let by_received = solve_input(&self.store, pool_id, fill.side, &from, order_sqrt_price, fill.received)?;
                nearer(fill.side, by_paid, by_received)
            };
            let moved = span(&self.store, pool_id, fill.side, &from, target)?;
            for &tick in &moved.crossed {
                let net = cross_tick(&mut self.store, pool_id, tick, &state)?;
                state.current_liquidity = cross(state.current_liquidity, net, fill.side)?;
            }
            if state.current_liquidity != moved.end.liquidity {
                return Err(AmmError::Invariant("crossed liquidity disagrees with the curve walk"));
            }
            crossed_ticks += moved.crossed.len();
            state.current_sqrt_price = moved.end.sqrt_price;
            state.current_tick = moved.end.tick;

            let surplus = fill
                .received
                .checked_sub(&moved.input)
                .ok_or(AmmError::Invariant("fill paid the pool less than the curve expects"))?;
            debug!(
                pool_id = %pool_id,
                side = %fill.side,
                price = %fill.price,
                filled = %fill.filled_quantity,
                expected = %moved.input,
                received = %fill.received,
                surplus = %surplus,
                tick = %state.current_tick,
                "pool fill settled"
            );
            if !surplus.is_zero() {
                let slot = match fill.side {
                    OrderSide::Buy => CoinPair::new(surplus, Amount::ZERO),
                    OrderSide::Sell => CoinPair::new(Amount::ZERO, surplus),
                };
                if state.current_liquidity.is_zero() {
                    warn!(pool_id = %pool_id, surplus = %surplus, "no active liquidity; surplus kept in reserve");
                    retained = retained.checked_add(&slot)?;
                } else {
                    let growth = Dec::from_ratio(surplus.get(), state.current_liquidity.get(), Rounding::Down)?;
                    let growth = match fill.side {
                        OrderSide::Buy => DecPair::new(growth, Dec::ZERO),
                        OrderSide::Sell => DecPair::new(Dec::ZERO, growth),
                    };
                    state.fee_growth_global = state.fee_growth_global.checked_add(&growth)?;
                    credited = credited.checked_add(&slot)?;
                }
            }
            self.store.set_pool_state(pool_id, state);
        }

        if !credited.is_zero() {
            let rewards_pool = self.store.params().rewards_pool.clone();
            let coins = credited.to_coins(&pool.denom0, &pool.denom1);
            self.bank.transfer(&pool.reserve_address, &rewards_pool, &coins)?;
        }
        let state = self.store.pool_state(pool_id)?;
        info!(
            pool_id = %pool_id,
            fills = fills.len(),
            crossed_ticks,
            credited0 = %credited.amount0,
            credited1 = %credited.amount1,
            tick = %state.current_tick,
            "pool fills settled"
        );
        Ok(SettlementReport {
            pool_id,
            fills: fills.len(),
            crossed_ticks,
            credited,
            retained,
            current_tick: state.current_tick,
            current_sqrt_price: state.current_sqrt_price,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::super::test_support::*;
    use super::super::OrderRequest;
    use super::*;
    use crate::config::{OrderLimits, Params};
    use crate::domain::{Address, Coin, Coins, MarketId, OrderId};
    use crate::memory::{InMemoryLedger, InMemoryOrderBook};

    fn liquid_pool() -> (Amm<InMemoryLedger>, PoolId) {
        let (mut amm, pool_id) = amm_with_pool();
        for (who, lower, upper) in [(alice(), 35_000, 45_000), (bob(), 39_900, 40_100)] {
            let Ok(_) = amm.add_liquidity(
                &who,
                pool_id,
                tick(lower),
                tick(upper),
                Amount::new(10_000_000),
                Amount::new(50_000_000),
            ) else {
                panic!("liquidity");
            };
        }
        (amm, pool_id)
    }

    /// Adjacent ten-tick ranges around price 5 with an order minimum above
    /// what one range offers, so every order spans initialized ticks.
    fn stepped_pool() -> (Amm<InMemoryLedger>, PoolId) {
        let (mut amm, pool_id) = amm_with_pool();
        let params = Params {
            order_limits: OrderLimits {
                min_order_quantity: Amount::new(20_000),
                ..OrderLimits::default()
            },
            ..amm.params().clone()
        };
        let Ok(()) = amm.update_params(params) else {
            panic!("params");
        };
        for lower in (39_800..40_200).step_by(10) {
            let Ok(_) = amm.add_liquidity(
                &bob(),
                pool_id,
                tick(lower),
                tick(lower + 10),
                Amount::new(10_000),
                Amount::new(50_000),
            ) else {
                panic!("liquidity");
            };
        }
        (amm, pool_id)
    }

    /// Posts the pool's orders and fills the best `n` on `side` in full.
    fn fill_best(
        amm: &mut Amm<InMemoryLedger>,
        pool_id: PoolId,
        side: OrderSide,
        n: usize,
        partial_last: Option<u128>,
    ) -> Vec<PoolOrderFill> {
        let mut book = InMemoryOrderBook::default();
        let Ok(posted) = amm.post_pool_orders(&mut book, pool_id) else {
            panic!("post");
        };
        let ids: Vec<OrderId> = posted
            .iter()
            .filter(|(_, o)| o.side == side)
            .take(n)
            .map(|(id, _)| *id)
            .collect();
        let taker = Address::new("taker");
        let Ok(funds) = Coins::from_coins([
            Coin::new(denom("ucre"), Amount::new(1_000_000_000)),
            Coin::new(denom("uusd"), Amount::new(5_000_000_000)),
        ]) else {
            panic!("coins");
        };
        let Ok(()) = amm.bank_mut().mint(&taker, &funds) else {
            panic!("mint");
        };
        let mut fills = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            let Some(open) = book.order(*id).map(|o| o.open_quantity) else {
                panic!("resting order");
            };
            let quantity = match partial_last {
                Some(q) if i + 1 == ids.len() => Amount::new(q),
                _ => open,
            };
            let Ok(fill) = book.fill(amm.bank_mut(), &taker, *id, quantity, &denom("ucre"), &denom("uusd")) else {
                panic!("fill");
            };
            fills.push(fill);
        }
        fills
    }

    #[test]
    fn full_buy_fills_land_on_order_tick() {
        let (mut amm, pool_id) = liquid_pool();
        let Ok(buys) = amm.pool_orders(pool_id, &OrderRequest::new(OrderSide::Buy)) else {
            panic!("orders");
        };
        let fills = fill_best(&mut amm, pool_id, OrderSide::Buy, 3, None);
        let Ok(report) = amm.settle_pool_fills(pool_id, &fills) else {
            panic!("settle");
        };
        assert_eq!(report.fills, 3);
        assert_eq!(report.current_tick, buys[2].tick);
        assert_eq!(amm.store().check_pool_invariants(pool_id), Ok(()));
        assert!(report.retained.is_zero());
    }

    #[test]
    fn sell_fills_cross_ticks_and_credit_surplus() {
        let (mut amm, pool_id) = liquid_pool();
        // Enough sells to pass bob's upper tick at 40100.
        let fills = fill_best(&mut amm, pool_id, OrderSide::Sell, 15, None);
        let Ok(report) = amm.settle_pool_fills(pool_id, &fills) else {
            panic!("settle");
        };
        assert!(report.current_tick > tick(40_100));
        assert_eq!(report.crossed_ticks, 1);
        assert_eq!(amm.store().check_pool_invariants(pool_id), Ok(()));
        let Ok(state) = amm.store().pool_state(pool_id) else {
            panic!("state");
        };
        // Only alice's wide range is active now.
        let wide = amm.store().positions_by_owner(&alice()).map(|p| p.liquidity).next();
        assert_eq!(Some(state.current_liquidity), wide);
        let rewards_pool = amm.params().rewards_pool.clone();
        assert_eq!(
            amm.bank().spendable_balance(&rewards_pool, &denom("uusd")),
            report.credited.amount1
        );
    }

    #[test]
    fn partial_fill_stops_short_of_order_price() {
        let (mut amm, pool_id) = liquid_pool();
        let Ok(before) = amm.store().pool_state(pool_id).map(|s| s.current_sqrt_price) else {
            panic!("state");
        };
        let fills = fill_best(&mut amm, pool_id, OrderSide::Sell, 1, Some(10_000));
        assert!(!fills[0].is_fully_executed());
        let Ok(report) = amm.settle_pool_fills(pool_id, &fills) else {
            panic!("settle");
        };
        let Ok(order_sqrt) = crate::math::tick_at_price(fills[0].price).and_then(sqrt_price_at_tick) else {
            panic!("order price");
        };
        assert!(report.current_sqrt_price > before);
        assert!(report.current_sqrt_price < order_sqrt);
        assert_eq!(amm.store().check_pool_invariants(pool_id), Ok(()));
    }

    #[test]
    fn small_partial_fills_always_settle() {
        for (amm, pool_id) in [liquid_pool(), stepped_pool()] {
            for side in [OrderSide::Sell, OrderSide::Buy] {
                let Ok(orders) = amm.pool_orders(pool_id, &OrderRequest::new(side)) else {
                    panic!("orders");
                };
                let Some(best) = orders.first().map(|o| o.quantity.get()) else {
                    panic!("best order");
                };
                let quantities = (1..=40).chain([best / 3, best / 2, best - 1]);
                for q in quantities.filter(|q| (1..best).contains(q)) {
                    let mut trial = amm.clone();
                    let fills = fill_best(&mut trial, pool_id, side, 1, Some(q));
                    let settled = trial.settle_pool_fills(pool_id, &fills);
                    assert!(settled.is_ok(), "{side} fill of {q}: {settled:?}");
                    assert_eq!(trial.store().check_pool_invariants(pool_id), Ok(()));
                }
            }
        }
    }

    #[test]
    fn partial_fill_crosses_ticks_inside_one_order() {
        let (amm, pool_id) = stepped_pool();
        for side in [OrderSide::Sell, OrderSide::Buy] {
            let Ok(orders) = amm.pool_orders(pool_id, &OrderRequest::new(side)) else {
                panic!("orders");
            };
            let Some(best) = orders.first().map(|o| o.quantity.get()) else {
                panic!("best order");
            };
            let mut trial = amm.clone();
            let fills = fill_best(&mut trial, pool_id, side, 1, Some(best * 3 / 4));
            let Ok(report) = trial.settle_pool_fills(pool_id, &fills) else {
                panic!("settle {side}");
            };
            assert!(report.crossed_ticks >= 1, "{side} crossed {}", report.crossed_ticks);
            assert_eq!(trial.store().check_pool_invariants(pool_id), Ok(()));
        }
    }

    #[test]
    fn short_payment_is_an_invariant_violation() {
        let (mut amm, pool_id) = liquid_pool();
        let Ok(sells) = amm.pool_orders(pool_id, &OrderRequest::new(OrderSide::Sell)) else {
            panic!("orders");
        };
        let order = sells[0];
        let fill = PoolOrderFill {
            side: OrderSide::Sell,
            price: order.price,
            filled_quantity: order.quantity,
            open_quantity: Amount::ZERO,
            paid: order.quantity,
            received: Amount::new(1),
        };
        let before = amm.export_genesis();
        let r = amm.settle_pool_fills(pool_id, &[fill]);
        assert!(r.as_ref().is_err_and(AmmError::is_invariant_violation));
        assert_eq!(amm.export_genesis(), before);
    }

    #[test]
    fn bad_fill_prices_rejected() {
        let (mut amm, pool_id) = liquid_pool();
        let off_grid = PoolOrderFill {
            side: OrderSide::Buy,
            price: dec("4.99995"),
            filled_quantity: Amount::new(1),
            open_quantity: Amount::ZERO,
            paid: Amount::new(4),
            received: Amount::new(1),
        };
        assert!(matches!(
            amm.settle_pool_fills(pool_id, &[off_grid.clone()]),
            Err(AmmError::InvalidPrice(_))
        ));
        let wrong_side = PoolOrderFill {
            price: dec("5.1"),
            ..off_grid
        };
        assert!(matches!(
            amm.settle_pool_fills(pool_id, &[wrong_side]),
            Err(AmmError::InvalidPrice(_))
        ));
        assert!(amm.store().pool_by_market(MarketId::new(1)).is_some());
    }
}

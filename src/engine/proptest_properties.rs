//! Property-based tests using `proptest` for pool invariants.
//!
//! 1. **Liquidity conservation**: add then remove never pays out more
//!    than was deposited.
//! 2. **Structural invariants**: tick liquidity, active liquidity and
//!    total liquidity stay consistent across random adds and removes.
//! 3. **Reserve solvency**: the reserve covers every position's assets.
//! 4. **Settlement**: full and partial fills settle with a non-negative
//!    surplus, leave the invariants intact and keep the rewards pool able
//!    to pay every position's fees.
//! 5. **Growth**: fee and farming growth never decrease across random
//!    adds, removes, settlements and farming cycles.

use proptest::prelude::*;

use super::test_support::*;
use super::{Amm, OrderRequest, PageRequest, PlanRequest};
use crate::domain::{Address, Amount, Coin, Coins, Liquidity, OrderSide, PoolId, PositionId};
use crate::memory::{InMemoryLedger, InMemoryOrderBook};
use crate::state::RewardAllocation;
use crate::traits::BankKeeper;

// ---------------------------------------------------------------------------
// Custom strategies
// ---------------------------------------------------------------------------

/// Aligned `[lower, upper)` bounds around price 5 (tick 40 000), some of
/// them entirely on one side of the price.
fn range_strategy() -> impl Strategy<Value = (i32, i32)> {
    (3_000i32..5_000, 1i32..=600).prop_map(|(lower, width)| (lower * 10, (lower + width).min(5_200) * 10))
}

/// Desired deposit amounts.
fn amount_strategy() -> impl Strategy<Value = u128> {
    1_000u128..=50_000_000u128
}

#[derive(Debug, Clone)]
enum Op {
    Add { owner: bool, lower: i32, upper: i32, amount0: u128, amount1: u128 },
    Remove { index: usize, fraction: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), range_strategy(), amount_strategy(), amount_strategy()).prop_map(
            |(owner, (lower, upper), amount0, amount1)| Op::Add { owner, lower, upper, amount0, amount1 }
        ),
        (0usize..8, 1u8..=4).prop_map(|(index, fraction)| Op::Remove { index, fraction }),
    ]
}

/// Quantity taken from the last order filled: a few units, or a share in
/// thousandths of its open quantity.
#[derive(Debug, Clone, Copy)]
enum Cut {
    Units(u128),
    Permille(u128),
}

impl Cut {
    fn of(self, open: Amount) -> Amount {
        let quantity = match self {
            Self::Units(units) => units,
            Self::Permille(permille) => open.get() * permille / 1_000,
        };
        Amount::new(quantity.clamp(1, open.get()))
    }
}

fn cut_strategy() -> impl Strategy<Value = Cut> {
    prop_oneof![
        (1u128..=20).prop_map(Cut::Units),
        (1u128..=1_000).prop_map(Cut::Permille),
    ]
}

fn side_strategy() -> impl Strategy<Value = OrderSide> {
    prop_oneof![Just(OrderSide::Buy), Just(OrderSide::Sell)]
}

#[derive(Debug, Clone)]
enum Step {
    Liquidity(Op),
    Settle { side: OrderSide, n: usize, cut: Cut },
    Allocate { secs: u64 },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        op_strategy().prop_map(Step::Liquidity),
        (side_strategy(), 1usize..6, cut_strategy()).prop_map(|(side, n, cut)| Step::Settle { side, n, cut }),
        (1u64..=15).prop_map(|secs| Step::Allocate { secs }),
    ]
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn apply(amm: &mut Amm<InMemoryLedger>, pool_id: PoolId, op: &Op) {
    match *op {
        Op::Add { owner, lower, upper, amount0, amount1 } => {
            let who = if owner { alice() } else { bob() };
            // rejections (e.g. zero liquidity) are part of the input space
            let _ = amm.add_liquidity(&who, pool_id, tick(lower), tick(upper), Amount::new(amount0), Amount::new(amount1));
        }
        Op::Remove { index, fraction } => {
            let ids: Vec<PositionId> = amm.store().positions_by_pool(pool_id).map(|p| p.id).collect();
            let Some(id) = ids.get(index % ids.len().max(1)).copied() else {
                return;
            };
            let Ok(position) = amm.position(id) else {
                return;
            };
            let amount = position.liquidity.get() * u128::from(fraction) / 4;
            if amount > 0 {
                let _ = amm.remove_liquidity(&position.owner, id, Liquidity::new(amount));
            }
        }
    }
}

/// Reposts the pool's orders, fills the best `n` on `side` (the last one
/// by `cut`) and settles them.
fn settle_best(
    amm: &mut Amm<InMemoryLedger>,
    book: &mut InMemoryOrderBook,
    pool_id: PoolId,
    side: OrderSide,
    n: usize,
    cut: Cut,
) -> Result<(), TestCaseError> {
    let taker = Address::new("taker");
    let Ok(funds) = Coins::from_coins([
        Coin::new(denom("ucre"), Amount::new(1_000_000_000)),
        Coin::new(denom("uusd"), Amount::new(5_000_000_000)),
    ]) else {
        return Err(TestCaseError::fail("coins"));
    };
    let Ok(()) = amm.bank_mut().mint(&taker, &funds) else {
        return Err(TestCaseError::fail("mint"));
    };
    let Ok(posted) = amm.post_pool_orders(book, pool_id) else {
        return Err(TestCaseError::fail("post"));
    };
    let chosen: Vec<_> = posted.iter().filter(|(_, o)| o.side == side).take(n).collect();
    let mut fills = Vec::new();
    for (i, (id, order)) in chosen.iter().enumerate() {
        let quantity = if i + 1 == chosen.len() { cut.of(order.quantity) } else { order.quantity };
        let Ok(fill) = book.fill(amm.bank_mut(), &taker, *id, quantity, &denom("ucre"), &denom("uusd")) else {
            return Err(TestCaseError::fail("fill"));
        };
        fills.push(fill);
    }
    let settled = amm.settle_pool_fills(pool_id, &fills);
    prop_assert!(settled.is_ok(), "{} settlement of {:?} failed: {:?}", side, cut, settled);
    Ok(())
}

fn reserve_covers_positions(amm: &Amm<InMemoryLedger>, pool_id: PoolId) -> bool {
    let Ok(pool) = amm.pool(pool_id) else {
        return false;
    };
    let mut owed = Coins::new();
    for position in amm.store().positions_by_pool(pool_id) {
        let Ok(assets) = amm.position_assets(position.id) else {
            return false;
        };
        if owed.add(&assets).is_err() {
            return false;
        }
    }
    let reserve = amm.bank().spendable_coins(&pool.reserve_address, [&pool.denom0, &pool.denom1]);
    owed.is_all_lte(&reserve)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_add_then_remove_pays_at_most_deposit(
        (lower, upper) in range_strategy(),
        amount0 in amount_strategy(),
        amount1 in amount_strategy(),
    ) {
        let (mut amm, pool_id) = amm_with_pool();
        let Ok(added) = amm.add_liquidity(&alice(), pool_id, tick(lower), tick(upper), Amount::new(amount0), Amount::new(amount1)) else {
            return Ok(());
        };
        prop_assert!(added.amount.amount_of(&denom("ucre")) <= Amount::new(amount0));
        prop_assert!(added.amount.amount_of(&denom("uusd")) <= Amount::new(amount1));

        let Ok(removed) = amm.remove_liquidity(&alice(), added.position.id, added.liquidity) else {
            return Err(TestCaseError::fail("full removal failed"));
        };
        prop_assert!(removed.amount.is_all_lte(&added.amount));
        prop_assert!(amm.store().pool_ticks(pool_id).next().is_none());
    }

    #[test]
    fn prop_invariants_hold_under_random_operations(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let (mut amm, pool_id) = amm_with_pool();
        for op in &ops {
            apply(&mut amm, pool_id, op);
            prop_assert_eq!(amm.store().check_pool_invariants(pool_id), Ok(()));
            prop_assert!(reserve_covers_positions(&amm, pool_id));
        }
    }

    #[test]
    fn prop_settlement_preserves_invariants(
        ops in prop::collection::vec(op_strategy(), 1..8),
        sells in 0usize..12,
        buys in 0usize..12,
        sell_cut in cut_strategy(),
        buy_cut in cut_strategy(),
    ) {
        let (mut amm, pool_id) = amm_with_pool();
        for op in &ops {
            apply(&mut amm, pool_id, op);
        }
        let mut book = InMemoryOrderBook::default();
        for (side, n, cut) in [(OrderSide::Sell, sells, sell_cut), (OrderSide::Buy, buys, buy_cut)] {
            settle_best(&mut amm, &mut book, pool_id, side, n, cut)?;
            prop_assert_eq!(amm.store().check_pool_invariants(pool_id), Ok(()));
            prop_assert!(reserve_covers_positions(&amm, pool_id));
        }

        let mut fees = Coins::new();
        for position in amm.positions_by_pool(pool_id, PageRequest::default()) {
            let Ok(owed) = amm.collectible(position.id) else {
                return Err(TestCaseError::fail("collectible"));
            };
            prop_assert!(fees.add(&owed).is_ok());
        }
        let rewards_pool = amm.params().rewards_pool.clone();
        let held = amm.bank().spendable_coins(&rewards_pool, [&denom("ucre"), &denom("uusd")]);
        prop_assert!(fees.is_all_lte(&held));
    }

    #[test]
    fn prop_growth_never_decreases(steps in prop::collection::vec(step_strategy(), 1..20)) {
        let (mut amm, pool_id) = amm_with_pool();
        let plan = PlanRequest {
            description: "incentives".into(),
            termination_address: alice(),
            reward_allocations: vec![RewardAllocation {
                pool_id,
                rewards_per_day: Coins::single(denom("ucre"), Amount::new(86_400_000)),
            }],
            start_time: 0,
            end_time: 1_000_000,
        };
        let Ok(_) = amm.create_public_farming_plan(plan, alice()) else {
            return Err(TestCaseError::fail("plan"));
        };
        let mut book = InMemoryOrderBook::default();
        let mut now = 0;
        let Ok(mut before) = amm.pool_state(pool_id) else {
            return Err(TestCaseError::fail("state"));
        };
        for step in &steps {
            match *step {
                Step::Liquidity(ref op) => apply(&mut amm, pool_id, op),
                Step::Settle { side, n, cut } => settle_best(&mut amm, &mut book, pool_id, side, n, cut)?,
                Step::Allocate { secs } => {
                    now += secs;
                    let allocated = amm.allocate_farming_rewards(now);
                    prop_assert!(allocated.is_ok(), "allocation failed: {:?}", allocated);
                }
            }
            let Ok(after) = amm.pool_state(pool_id) else {
                return Err(TestCaseError::fail("state"));
            };
            prop_assert!(before.fee_growth_global.is_all_lte(&after.fee_growth_global));
            prop_assert!(before
                .farming_rewards_growth_global
                .is_all_lte(&after.farming_rewards_growth_global));
            prop_assert_eq!(amm.store().check_pool_invariants(pool_id), Ok(()));
            before = after;
        }
    }

    #[test]
    fn prop_order_generation_is_deterministic((lower, upper) in range_strategy(), amount in amount_strategy()) {
        let (mut amm, pool_id) = amm_with_pool();
        let _ = amm.add_liquidity(&alice(), pool_id, tick(lower), tick(upper), Amount::new(amount), Amount::new(amount * 5));
        for side in [OrderSide::Buy, OrderSide::Sell] {
            let request = OrderRequest::new(side);
            let first = amm.pool_orders(pool_id, &request);
            prop_assert!(first.is_ok());
            prop_assert_eq!(amm.pool_orders(pool_id, &request), first.clone());
            if let Ok(orders) = first {
                prop_assert!(orders.len() <= 20);
                prop_assert!(orders.iter().all(|o| !o.quantity.is_zero()));
            }
        }
    }
}

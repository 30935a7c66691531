//! One full processing cycle of a pool.
//!
//! Creates a pool, adds liquidity, posts the pool's synthetic orders to
//! an in-memory order book, fills a few of them, settles the fills, pays
//! a farming cycle and collects the position's fees and rewards.
//!
//! # Run
//!
//! ```bash
//! RUST_LOG=tidal_amm=debug cargo run --example cycle
//! ```

use tidal_amm::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tidal_amm=info")))
        .init();

    println!("=== Pool processing cycle ===\n");

    // ── 1. Ledger and AMM ───────────────────────────────────────────────
    let lp = Address::new("lp");
    let taker = Address::new("taker");
    let treasury = Address::new("treasury");
    let ucre = Denom::new("ucre")?;
    let uusd = Denom::new("uusd")?;
    let ledger: InMemoryLedger = [
        (lp.clone(), Coin::new(ucre.clone(), Amount::new(100_000_000))),
        (lp.clone(), Coin::new(uusd.clone(), Amount::new(500_000_000))),
        (taker.clone(), Coin::new(ucre.clone(), Amount::new(100_000_000))),
        (taker.clone(), Coin::new(uusd.clone(), Amount::new(500_000_000))),
        (treasury.clone(), Coin::new(ucre.clone(), Amount::new(10_000_000))),
    ]
    .into_iter()
    .collect();
    let mut amm = Amm::new(Params::default(), ledger)?;

    // ── 2. Pool at price 5 with tick spacing 10 ─────────────────────────
    let pool = amm.create_pool(&lp, MarketId::new(1), ucre.clone(), uusd.clone(), "5".parse()?, Some(10))?;
    println!("Pool {} created for market {}", pool.id, pool.market_id);

    // ── 3. Liquidity over [4.5, 5.5) ────────────────────────────────────
    let added = amm.add_liquidity(
        &lp,
        pool.id,
        Tick::new(35_000)?,
        Tick::new(45_000)?,
        Amount::new(10_000_000),
        Amount::new(50_000_000),
    )?;
    println!(
        "Position {}: liquidity {}, deposited {} ucre + {} uusd",
        added.position.id,
        added.liquidity,
        added.amount.amount_of(&ucre),
        added.amount.amount_of(&uusd)
    );

    // ── 4. Farming plan paid by the treasury ────────────────────────────
    let plan = amm.create_public_farming_plan(
        PlanRequest {
            description: "ucre incentives".into(),
            termination_address: treasury.clone(),
            reward_allocations: vec![RewardAllocation {
                pool_id: pool.id,
                rewards_per_day: Coins::single(ucre.clone(), Amount::new(8_640_000)),
            }],
            start_time: 0,
            end_time: 86_400,
        },
        treasury.clone(),
    )?;
    println!("Farming plan {} pays from {}", plan.id, plan.source_address);
    amm.allocate_farming_rewards(0)?;

    // ── 5. Post orders ──────────────────────────────────────────────────
    let mut book = InMemoryOrderBook::default();
    let posted = amm.post_pool_orders(&mut book, pool.id)?;
    println!("\nPosted {} orders; best of each side:", posted.len());
    for (id, order) in posted.iter().filter(|(_, o)| o.side == OrderSide::Buy).take(1) {
        println!("  buy  #{id}: {} @ {}", order.quantity, order.price);
    }
    for (id, order) in posted.iter().filter(|(_, o)| o.side == OrderSide::Sell).take(1) {
        println!("  sell #{id}: {} @ {}", order.quantity, order.price);
    }

    // ── 6. A taker lifts the three best asks ────────────────────────────
    let mut fills = Vec::new();
    for (id, order) in posted.iter().filter(|(_, o)| o.side == OrderSide::Sell).take(3) {
        fills.push(book.fill(amm.bank_mut(), &taker, *id, order.quantity, &ucre, &uusd)?);
    }
    let report = amm.settle_pool_fills(pool.id, &fills)?;
    println!(
        "\nSettled {} fills: tick {} -> surplus {} uusd credited",
        report.fills, report.current_tick, report.credited.amount1
    );

    // ── 7. Farming cycle ────────────────────────────────────────────────
    let allocation = amm.allocate_farming_rewards(6)?;
    println!("Farming paid for {}s: {:?}", allocation.elapsed, allocation.allocated);

    // ── 8. Collect ──────────────────────────────────────────────────────
    let collectible = amm.collectible(added.position.id)?;
    let collected = amm.collect(&lp, added.position.id, None)?;
    assert_eq!(collectible, collected);
    for (denom, amount) in collected.iter() {
        println!("Collected {amount} {denom}");
    }

    // ── 9. Reposting picks up the new price ─────────────────────────────
    let reposted = amm.post_pool_orders(&mut book, pool.id)?;
    println!("\nReposted {} orders", reposted.len());
    Ok(())
}

//! # Tidal AMM
//!
//! Concentrated-liquidity AMM core that lives next to an order-book
//! exchange.
//!
//! Liquidity providers deposit into price ranges bounded by discrete
//! ticks.  Instead of swapping against the curve directly, each pool
//! projects its liquidity onto a ladder of limit orders that an external
//! matching engine executes; the fills are then reconciled back into the
//! pool's price, active liquidity and fee growth.  Yield-farming plans pay
//! extra rewards into pools every cycle.
//!
//! # Quick Start
//!
//! ```rust
//! use tidal_amm::prelude::*;
//!
//! let alice = Address::new("alice");
//! let ucre = Denom::new("ucre").expect("valid denom");
//! let uusd = Denom::new("uusd").expect("valid denom");
//! let ledger: InMemoryLedger = [
//!     (alice.clone(), Coin::new(ucre.clone(), Amount::new(1_000_000))),
//!     (alice.clone(), Coin::new(uusd.clone(), Amount::new(5_000_000))),
//! ]
//! .into_iter()
//! .collect();
//!
//! let mut amm = Amm::new(Params::default(), ledger).expect("valid params");
//!
//! // 1. A pool for market 1 at price 5 uusd per ucre
//! let pool = amm
//!     .create_pool(&alice, MarketId::new(1), ucre, uusd, "5".parse().expect("price"), Some(10))
//!     .expect("pool created");
//!
//! // 2. Liquidity over [4.5, 5.5)
//! let added = amm
//!     .add_liquidity(
//!         &alice,
//!         pool.id,
//!         Tick::new(35_000).expect("tick"),
//!         Tick::new(45_000).expect("tick"),
//!         Amount::new(100_000),
//!         Amount::new(500_000),
//!     )
//!     .expect("liquidity added");
//! assert!(!added.liquidity.is_zero());
//!
//! // 3. The orders the pool would post on each side
//! let buys = amm.pool_orders(pool.id, &OrderRequest::new(OrderSide::Buy)).expect("orders");
//! assert!(!buys.is_empty());
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │      Host        │  drives the per-cycle flow, owns the matching engine
//! └────────┬─────────┘
//!          │ Amm::{add_liquidity, settle_pool_fills, post_pool_orders, …}
//!          ▼
//! ┌──────────────────┐
//! │     Engine       │  position lifecycle, orders, settlement, farming
//! └────────┬─────────┘
//!          │ BankKeeper + MatchingEngine traits
//!          ▼
//! ┌──────────────────┐
//! │  Store / State   │  pools, ticks, positions, plans, indexes
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Domain / Math   │  Dec, Tick, Amount, tick and liquidity math
//! └──────────────────┘
//! ```
//!
//! # Module Guide
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`domain`] | Value types: [`Dec`](domain::Dec), [`Tick`](domain::Tick), [`Amount`](domain::Amount), [`Coins`](domain::Coins), ids |
//! | [`math`]   | Tick ↔ price conversion, liquidity/amount formulas, checked arithmetic |
//! | [`state`]  | Records: [`Pool`](state::Pool), [`PoolState`](state::PoolState), [`TickInfo`](state::TickInfo), [`Position`](state::Position), [`FarmingPlan`](state::FarmingPlan) |
//! | [`store`]  | Keyed record store with ordered tick scans and genesis export/import |
//! | [`engine`] | [`Amm`](engine::Amm): every mutation and query |
//! | [`traits`] | External contracts: [`BankKeeper`](traits::BankKeeper), [`MatchingEngine`](traits::MatchingEngine) |
//! | [`memory`] | In-memory ledger and order book for tests and simulations |
//! | [`config`] | Governance [`Params`](config::Params) |
//! | [`error`]  | [`AmmError`](error::AmmError) unified error enum |
//! | [`prelude`] | Convenience re-exports |
//!
//! # Logging
//!
//! State transitions are reported through [`tracing`]; the crate never
//! installs a subscriber.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod math;
pub mod memory;
pub mod prelude;
pub mod state;
pub mod store;
pub mod traits;

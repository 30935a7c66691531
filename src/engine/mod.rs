//! The AMM engine.
//!
//! [`Amm`] owns the [`Store`] and a [`BankKeeper`] and exposes every
//! mutation and query of the AMM core:
//!
//! | Concern | Module | Entry points |
//! |---------|--------|--------------|
//! | Pools & governance | `pool` | [`Amm::create_pool`], [`Amm::update_pool_tick_spacing`], [`Amm::update_params`] |
//! | Position lifecycle | `liquidity` | [`Amm::add_liquidity`], [`Amm::remove_liquidity`], [`Amm::collect`] |
//! | Order generation | `orders` | [`Amm::pool_orders`], [`Amm::post_pool_orders`] |
//! | Trade settlement | `settlement` | [`Amm::settle_pool_fills`] |
//! | Farming | `farming` | [`Amm::create_private_farming_plan`], [`Amm::allocate_farming_rewards`] |
//! | Reads | `query` | [`Amm::pools`], [`Amm::positions_by_owner`], [`Amm::position_assets`], … |
//!
//! # Transactions
//!
//! Every public mutation runs through [`Amm::transact`]: the store and
//! the bank are cloned into a scratch copy, the operation runs on the
//! copy, and the copy replaces the live state only if the operation
//! returned `Ok`.  A failed operation therefore leaves no partial writes
//! behind, whichever step failed.
//!
//! # Cycle
//!
//! Per matching cycle a host calls, for each pool:
//!
//! 1. [`Amm::settle_pool_fills`] with the fills of the pool's orders;
//! 2. [`Amm::allocate_farming_rewards`] once for all pools;
//! 3. [`Amm::post_pool_orders`] to replace the pool's orders.

mod curve;
mod farming;
mod liquidity;
mod orders;
mod pool;
#[cfg(test)]
mod proptest_properties;
mod query;
mod settlement;
mod tick;

pub use farming::{AllocationReport, PlanRequest};
pub use liquidity::{AddLiquidityResult, RemoveLiquidityResult};
pub use orders::{OrderRequest, PoolOrder};
pub use query::PageRequest;
pub use settlement::SettlementReport;

use tracing::info;

use crate::config::Params;
use crate::error::Result;
use crate::store::{Genesis, Store};
use crate::traits::BankKeeper;

/// The AMM core.  See the [module docs](self).
///
/// # Examples
///
/// ```
/// use tidal_amm::config::Params;
/// use tidal_amm::domain::{Address, Denom, MarketId};
/// use tidal_amm::engine::Amm;
/// use tidal_amm::memory::InMemoryLedger;
///
/// let mut amm = Amm::new(Params::default(), InMemoryLedger::default()).expect("valid params");
/// let pool = amm
///     .create_pool(
///         &Address::new("creator"),
///         MarketId::new(1),
///         Denom::new("ucre").expect("valid denom"),
///         Denom::new("uusd").expect("valid denom"),
///         "5".parse().expect("valid price"),
///         Some(10),
///     )
///     .expect("pool created");
/// assert_eq!(pool.tick_spacing, 10);
/// ```
#[derive(Debug, Clone)]
pub struct Amm<B> {
    store: Store,
    bank: B,
}

impl<B: BankKeeper> Amm<B> {
    /// Creates an empty AMM.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::InvalidConfiguration`](crate::error::AmmError::InvalidConfiguration)
    /// if `params` is invalid.
    pub fn new(params: Params, bank: B) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store: Store::new(params),
            bank,
        })
    }

    /// Restores an AMM from an exported snapshot.
    ///
    /// # Errors
    ///
    /// Propagates [`Store::import_genesis`] validation errors.
    pub fn from_genesis(genesis: Genesis, bank: B) -> Result<Self> {
        let store = Store::import_genesis(genesis)?;
        info!(pools = store.pools().count(), "amm state imported");
        Ok(Self { store, bank })
    }

    /// Exports the complete AMM state.
    #[must_use]
    pub fn export_genesis(&self) -> Genesis {
        self.store.export_genesis()
    }

    /// Read access to the store.
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    /// Read access to the bank.
    #[must_use]
    pub const fn bank(&self) -> &B {
        &self.bank
    }

    /// Mutable access to the bank, for hosts that move funds outside the
    /// AMM (deposits, faucets, matching-engine settlement).
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Governance parameters.
    #[must_use]
    pub const fn params(&self) -> &Params {
        self.store.params()
    }

    /// Runs `op` on a scratch copy of the state and commits it only if
    /// `op` succeeds.
    ///
    /// # Errors
    ///
    /// Returns whatever `op` returns; the live state is untouched in that
    /// case.
    pub fn transact<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mut scratch = self.clone();
        let out = op(&mut scratch)?;
        *self = scratch;
        Ok(out)
    }

    /// Runs `op` on a scratch copy of the state and always discards it.
    ///
    /// # Errors
    ///
    /// Returns whatever `op` returns.
    pub fn simulate<T>(&self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mut scratch = self.clone();
        op(&mut scratch)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the engine's unit tests.
    #![allow(clippy::panic)]

    use super::Amm;
    use crate::config::Params;
    use crate::domain::{Address, Amount, Coin, Dec, Denom, MarketId, PoolId, Tick};
    use crate::memory::InMemoryLedger;

    pub(crate) fn denom(s: &str) -> Denom {
        let Ok(d) = Denom::new(s) else {
            panic!("valid denom {s}");
        };
        d
    }

    pub(crate) fn dec(s: &str) -> Dec {
        let Ok(d) = s.parse::<Dec>() else {
            panic!("valid decimal {s}");
        };
        d
    }

    pub(crate) fn tick(v: i32) -> Tick {
        let Ok(t) = Tick::new(v) else {
            panic!("valid tick {v}");
        };
        t
    }

    pub(crate) fn alice() -> Address {
        Address::new("alice")
    }

    pub(crate) fn bob() -> Address {
        Address::new("bob")
    }

    /// AMM with `ucre`/`uusd` balances for alice and bob, and one pool at
    /// price 5 with tick spacing 10.
    pub(crate) fn amm_with_pool() -> (Amm<InMemoryLedger>, PoolId) {
        let ledger: InMemoryLedger = [alice(), bob()]
            .into_iter()
            .flat_map(|who| {
                [
                    (who.clone(), Coin::new(denom("ucre"), Amount::new(1_000_000_000))),
                    (who, Coin::new(denom("uusd"), Amount::new(5_000_000_000))),
                ]
            })
            .collect();
        let Ok(mut amm) = Amm::new(Params::default(), ledger) else {
            panic!("valid params");
        };
        let Ok(pool) = amm.create_pool(
            &alice(),
            MarketId::new(1),
            denom("ucre"),
            denom("uusd"),
            dec("5"),
            Some(10),
        ) else {
            panic!("pool created");
        };
        (amm, pool.id)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::domain::{Amount, MarketId};
    use crate::error::AmmError;

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let (mut amm, pool_id) = amm_with_pool();
        let before = amm.export_genesis();
        let ledger_before = amm.bank().clone();
        let r = amm.transact(|scratch| {
            scratch.store.next_pool_id();
            let _ = scratch.add_liquidity(
                &alice(),
                pool_id,
                tick(35_000),
                tick(45_000),
                Amount::new(100),
                Amount::new(500),
            )?;
            Err::<(), _>(AmmError::Invariant("forced"))
        });
        assert_eq!(r, Err(AmmError::Invariant("forced")));
        assert_eq!(amm.export_genesis(), before);
        assert_eq!(amm.bank(), &ledger_before);
    }

    #[test]
    fn invalid_params_rejected() {
        let params = Params {
            allowed_tick_spacings: vec![],
            ..Params::default()
        };
        assert!(Amm::new(params, crate::memory::InMemoryLedger::default()).is_err());
    }

    #[test]
    fn genesis_round_trip_through_json() {
        let (mut amm, pool_id) = amm_with_pool();
        let Ok(_) = amm.add_liquidity(
            &alice(),
            pool_id,
            tick(35_000),
            tick(45_000),
            Amount::new(100),
            Amount::new(500),
        ) else {
            panic!("liquidity added");
        };
        let genesis = amm.export_genesis();
        let Ok(json) = serde_json::to_string(&genesis) else {
            panic!("serialize");
        };
        let Ok(back) = serde_json::from_str::<Genesis>(&json) else {
            panic!("deserialize");
        };
        assert_eq!(back, genesis);
        let Ok(restored) = Amm::from_genesis(back, amm.bank().clone()) else {
            panic!("import");
        };
        assert_eq!(restored.store(), amm.store());
        assert!(restored.store().pool_by_market(MarketId::new(1)).is_some());
    }
}

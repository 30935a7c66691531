//! Balance ledger backed by an ordered map.

use std::collections::BTreeMap;

use tracing::trace;

use crate::domain::{Address, Amount, Coin, Coins, Denom};
use crate::error::AmmError;
use crate::math::CheckedArithmetic;
use crate::traits::BankKeeper;

/// A [`BankKeeper`] holding balances in memory.
///
/// # Examples
///
/// ```
/// use tidal_amm::domain::{Address, Amount, Coins, Denom};
/// use tidal_amm::memory::InMemoryLedger;
/// use tidal_amm::traits::BankKeeper;
///
/// let ucre = Denom::new("ucre").expect("valid denom");
/// let alice = Address::new("alice");
/// let bob = Address::new("bob");
///
/// let mut ledger = InMemoryLedger::default();
/// ledger.mint(&alice, &Coins::single(ucre.clone(), Amount::new(10))).expect("mint");
/// ledger.transfer(&alice, &bob, &Coins::single(ucre.clone(), Amount::new(4))).expect("funded");
/// assert_eq!(ledger.spendable_balance(&bob, &ucre), Amount::new(4));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryLedger {
    balances: BTreeMap<(Address, Denom), Amount>,
    supply: BTreeMap<Denom, Amount>,
}

impl InMemoryLedger {
    /// Creates coins out of thin air into `account`.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if a balance or the supply overflows.
    pub fn mint(&mut self, account: &Address, coins: &Coins) -> Result<(), AmmError> {
        for (denom, amount) in coins.iter() {
            let supply = self.supply.entry(denom.clone()).or_default();
            *supply = supply.safe_add(amount)?;
            let balance = self.balances.entry((account.clone(), denom.clone())).or_default();
            *balance = balance.safe_add(amount)?;
        }
        Ok(())
    }

    /// All balances of `account`.
    #[must_use]
    pub fn balances(&self, account: &Address) -> Coins {
        let mut coins = Coins::new();
        for ((owner, denom), amount) in &self.balances {
            if owner == account {
                coins.set_amount(denom.clone(), *amount);
            }
        }
        coins
    }

    /// Total minted amount of `denom`.
    #[must_use]
    pub fn supply_of(&self, denom: &Denom) -> Amount {
        self.supply.get(denom).copied().unwrap_or_default()
    }
}

impl BankKeeper for InMemoryLedger {
    fn transfer(&mut self, from: &Address, to: &Address, coins: &Coins) -> Result<(), AmmError> {
        if !coins.iter().all(|(d, a)| self.spendable_balance(from, d) >= *a) {
            return Err(AmmError::InsufficientFunds("insufficient balance for transfer"));
        }
        for (denom, amount) in coins.iter() {
            let source = self.balances.entry((from.clone(), denom.clone())).or_default();
            *source = source.safe_sub(amount)?;
            let target = self.balances.entry((to.clone(), denom.clone())).or_default();
            *target = target.safe_add(amount)?;
        }
        trace!(%from, %to, ?coins, "transfer");
        Ok(())
    }

    fn spendable_balance(&self, account: &Address, denom: &Denom) -> Amount {
        self.balances
            .get(&(account.clone(), denom.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn has_supply(&self, denom: &Denom) -> bool {
        !self.supply_of(denom).is_zero()
    }
}

impl FromIterator<(Address, Coin)> for InMemoryLedger {
    /// Builds a ledger from genesis balances.  Overflowing balances
    /// saturate at [`Amount::MAX`].
    fn from_iter<I: IntoIterator<Item = (Address, Coin)>>(iter: I) -> Self {
        let mut ledger = Self::default();
        for (account, coin) in iter {
            let single = Coins::single(coin.denom, coin.amount);
            if ledger.mint(&account, &single).is_err() {
                for (denom, _) in single.iter() {
                    ledger.balances.insert((account.clone(), denom.clone()), Amount::MAX);
                    ledger.supply.insert(denom.clone(), Amount::MAX);
                }
            }
        }
        ledger
    }
}

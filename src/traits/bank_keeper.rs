//! Balance ledger contract.

use crate::domain::{Address, Amount, Coins, Denom};
use crate::error::AmmError;

/// The balance ledger.
///
/// The engine runs every mutation against a scratch clone of the keeper
/// and keeps the clone only on success, so implementations must be cheap
/// to clone and must not share mutable state between clones.
///
/// # Errors
///
/// [`BankKeeper::transfer`] returns [`AmmError::InsufficientFunds`] when
/// `from` cannot cover `coins`; it must not move anything in that case.
pub trait BankKeeper: Clone {
    /// Moves `coins` from one account to another.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::InsufficientFunds`] if `from`'s spendable
    /// balance does not cover `coins`.
    fn transfer(&mut self, from: &Address, to: &Address, coins: &Coins) -> Result<(), AmmError>;

    /// Balance of `denom` that `account` may spend.
    fn spendable_balance(&self, account: &Address, denom: &Denom) -> Amount;

    /// Returns `true` if any `denom` exists on the ledger.
    fn has_supply(&self, denom: &Denom) -> bool;

    /// Spendable balances of `account` for each denomination in `denoms`.
    fn spendable_coins<'a>(&self, account: &Address, denoms: impl IntoIterator<Item = &'a Denom>) -> Coins {
        let mut coins = Coins::new();
        for denom in denoms {
            coins.set_amount(denom.clone(), self.spendable_balance(account, denom));
        }
        coins
    }
}

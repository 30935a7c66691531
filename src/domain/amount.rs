//! Coin amounts in base units.

use super::quantity::unsigned_quantity;

unsigned_quantity! {
    /// A coin amount in the base unit of its denomination (`ucre`, `uusd`).
    ///
    /// An `Amount` is always paired with a [`Denom`](super::Denom) by its
    /// container: [`Coin`](super::Coin), [`Coins`](super::Coins), or the
    /// pool-ordered [`CoinPair`](super::CoinPair).  Amounts are never
    /// negative and never fractional; fractional values live in
    /// [`Dec`](super::Dec) and are rounded into amounts explicitly.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidal_amm::domain::Amount;
    ///
    /// let deposit = Amount::new(1_000_000);
    /// let fee = Amount::new(2_500);
    /// assert_eq!(deposit.checked_sub(&fee), Some(Amount::new(997_500)));
    /// assert_eq!(fee.saturating_sub(&deposit), Amount::ZERO);
    /// ```
    Amount
}

impl Amount {
    /// Largest amount a ledger can hold.
    pub const MAX: Self = Self(u128::MAX);

    /// Difference clamped at zero, for shortfalls that are not errors.
    #[must_use]
    pub const fn saturating_sub(&self, other: &Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

//! Coin collections.
//!
//! - [`Coin`] / [`Coins`]: a denomination-keyed set of integer amounts,
//!   the unit of every ledger transfer.
//! - [`CoinPair`]: a fixed two-slot amount set for a pool's
//!   `(denom0, denom1)`; fee balances never need more.
//! - [`DecPair`]: the two-slot growth accumulator for trading fees.
//! - [`DecCoins`]: a denomination-keyed growth accumulator for farming
//!   rewards, whose denominations are chosen by plan creators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Amount, Dec, Denom, Rounding};
use crate::error::{AmmError, Result};

// ---------------------------------------------------------------------------
// Coin / Coins
// ---------------------------------------------------------------------------

/// A single denomination and amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination.
    pub denom: Denom,
    /// Amount in the smallest unit.
    pub amount: Amount,
}

impl Coin {
    /// Creates a coin.
    pub fn new(denom: Denom, amount: Amount) -> Self {
        Self { denom, amount }
    }
}

/// A set of coins with distinct denominations and no zero entries.
///
/// # Examples
///
/// ```
/// use tidal_amm::domain::{Amount, Coin, Coins, Denom};
///
/// let ucre = Denom::new("ucre").expect("valid denom");
/// let mut coins = Coins::new();
/// coins.add_coin(&Coin::new(ucre.clone(), Amount::new(5))).expect("no overflow");
/// coins.add_coin(&Coin::new(ucre.clone(), Amount::new(7))).expect("no overflow");
/// assert_eq!(coins.amount_of(&ucre), Amount::new(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<Coin>", try_from = "Vec<Coin>")]
pub struct Coins(BTreeMap<Denom, Amount>);

impl Coins {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builds a set from coins, merging repeated denominations.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if a merged amount overflows.
    pub fn from_coins(coins: impl IntoIterator<Item = Coin>) -> Result<Self> {
        let mut set = Self::new();
        for coin in coins {
            set.add_coin(&coin)?;
        }
        Ok(set)
    }

    /// Single-coin set (empty when `amount` is zero).
    #[must_use]
    pub fn single(denom: Denom, amount: Amount) -> Self {
        let mut set = Self::new();
        if !amount.is_zero() {
            set.0.insert(denom, amount);
        }
        set
    }

    /// Returns `true` if the set holds no coins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Amount held for `denom` (zero when absent).
    pub fn amount_of(&self, denom: &Denom) -> Amount {
        self.0.get(denom).copied().unwrap_or(Amount::ZERO)
    }

    /// Iterates `(denom, amount)` pairs in denomination order.
    pub fn iter(&self) -> impl Iterator<Item = (&Denom, &Amount)> {
        self.0.iter()
    }

    /// Iterates the denominations in the set.
    pub fn denoms(&self) -> impl Iterator<Item = &Denom> {
        self.0.keys()
    }

    /// Sets the amount held for `denom`, removing it when zero.
    pub fn set_amount(&mut self, denom: Denom, amount: Amount) {
        if amount.is_zero() {
            self.0.remove(&denom);
        } else {
            self.0.insert(denom, amount);
        }
    }

    /// Adds a coin in place.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] on overflow.
    pub fn add_coin(&mut self, coin: &Coin) -> Result<()> {
        if coin.amount.is_zero() {
            return Ok(());
        }
        let entry = self.0.entry(coin.denom.clone()).or_insert(Amount::ZERO);
        *entry = entry
            .checked_add(&coin.amount)
            .ok_or(AmmError::Overflow("coin addition overflow"))?;
        Ok(())
    }

    /// Adds another set in place.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] on overflow.
    pub fn add(&mut self, other: &Self) -> Result<()> {
        for (denom, amount) in &other.0 {
            self.add_coin(&Coin::new(denom.clone(), *amount))?;
        }
        Ok(())
    }

    /// Returns `self − other`, or `None` if any denomination would go
    /// negative.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        let mut out = self.clone();
        for (denom, amount) in &other.0 {
            let left = out.amount_of(denom).checked_sub(amount)?;
            if left.is_zero() {
                out.0.remove(denom);
            } else {
                out.0.insert(denom.clone(), left);
            }
        }
        Some(out)
    }

    /// Returns `true` if every amount in `self` is ≤ the same
    /// denomination in `other`.
    #[must_use]
    pub fn is_all_lte(&self, other: &Self) -> bool {
        self.0.iter().all(|(d, a)| *a <= other.amount_of(d))
    }

    /// Per-denomination minimum of `self` and `cap`; denominations absent
    /// from `cap` are dropped.
    #[must_use]
    pub fn min(&self, cap: &Self) -> Self {
        let inner = self
            .0
            .iter()
            .filter_map(|(d, a)| {
                let m = (*a).min(cap.amount_of(d));
                (!m.is_zero()).then(|| (d.clone(), m))
            })
            .collect();
        Self(inner)
    }
}

impl From<Coins> for Vec<Coin> {
    fn from(value: Coins) -> Self {
        value
            .0
            .into_iter()
            .map(|(denom, amount)| Coin { denom, amount })
            .collect()
    }
}

impl TryFrom<Vec<Coin>> for Coins {
    type Error = AmmError;

    fn try_from(value: Vec<Coin>) -> Result<Self> {
        Self::from_coins(value)
    }
}

// ---------------------------------------------------------------------------
// CoinPair
// ---------------------------------------------------------------------------

/// Two-slot amount set for a pool's `(denom0, denom1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CoinPair {
    /// Amount of `denom0`.
    pub amount0: Amount,
    /// Amount of `denom1`.
    pub amount1: Amount,
}

impl CoinPair {
    /// Both slots zero.
    pub const ZERO: Self = Self {
        amount0: Amount::ZERO,
        amount1: Amount::ZERO,
    };

    /// Creates a pair.
    pub const fn new(amount0: Amount, amount1: Amount) -> Self {
        Self { amount0, amount1 }
    }

    /// Returns `true` if both slots are zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.amount0.is_zero() && self.amount1.is_zero()
    }

    /// Slot-wise checked addition.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] on overflow.
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        Ok(Self {
            amount0: self
                .amount0
                .checked_add(&other.amount0)
                .ok_or(AmmError::Overflow("coin pair addition overflow"))?,
            amount1: self
                .amount1
                .checked_add(&other.amount1)
                .ok_or(AmmError::Overflow("coin pair addition overflow"))?,
        })
    }

    /// Slot-wise subtraction clamped at zero.
    pub const fn saturating_sub(&self, other: &Self) -> Self {
        Self {
            amount0: self.amount0.saturating_sub(&other.amount0),
            amount1: self.amount1.saturating_sub(&other.amount1),
        }
    }

    /// Expands into a [`Coins`] set using the pool's denominations.
    #[must_use]
    pub fn to_coins(&self, denom0: &Denom, denom1: &Denom) -> Coins {
        let mut coins = Coins::single(denom0.clone(), self.amount0);
        if !self.amount1.is_zero() {
            coins.0.insert(denom1.clone(), self.amount1);
        }
        coins
    }

    /// Projects a [`Coins`] set onto the pool's denominations.
    #[must_use]
    pub fn from_coins(coins: &Coins, denom0: &Denom, denom1: &Denom) -> Self {
        Self::new(coins.amount_of(denom0), coins.amount_of(denom1))
    }
}

// ---------------------------------------------------------------------------
// DecPair
// ---------------------------------------------------------------------------

/// Two-slot growth accumulator for `(denom0, denom1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DecPair {
    /// Growth of `denom0` per unit of liquidity.
    pub growth0: Dec,
    /// Growth of `denom1` per unit of liquidity.
    pub growth1: Dec,
}

impl DecPair {
    /// Both slots zero.
    pub const ZERO: Self = Self {
        growth0: Dec::ZERO,
        growth1: Dec::ZERO,
    };

    /// Creates a pair.
    #[must_use]
    pub const fn new(growth0: Dec, growth1: Dec) -> Self {
        Self { growth0, growth1 }
    }

    /// Slot-wise checked addition.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] on overflow.
    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        Ok(Self {
            growth0: self
                .growth0
                .checked_add(&other.growth0)
                .ok_or(AmmError::Overflow("growth accumulator overflow"))?,
            growth1: self
                .growth1
                .checked_add(&other.growth1)
                .ok_or(AmmError::Overflow("growth accumulator overflow"))?,
        })
    }

    /// Slot-wise checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Invariant`] if either slot would go negative.
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        Ok(Self {
            growth0: self
                .growth0
                .checked_sub(&other.growth0)
                .ok_or(AmmError::Invariant("fee growth subtraction went negative"))?,
            growth1: self
                .growth1
                .checked_sub(&other.growth1)
                .ok_or(AmmError::Invariant("fee growth subtraction went negative"))?,
        })
    }

    /// Slot-wise modular subtraction.
    #[must_use]
    pub fn wrapping_sub(&self, other: &Self) -> Self {
        Self {
            growth0: self.growth0.wrapping_sub(&other.growth0),
            growth1: self.growth1.wrapping_sub(&other.growth1),
        }
    }

    /// Returns `true` if both slots are ≤ the matching slots of `other`.
    #[must_use]
    pub fn is_all_lte(&self, other: &Self) -> bool {
        self.growth0 <= other.growth0 && self.growth1 <= other.growth1
    }

    /// Converts `growth × liquidity` to owed amounts, rounding down.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if an amount exceeds `u128`.
    pub fn owed_for(&self, liquidity: u128) -> Result<CoinPair> {
        Ok(CoinPair::new(
            Amount::new(self.growth0.mul_int_to_int(liquidity, Rounding::Down)?),
            Amount::new(self.growth1.mul_int_to_int(liquidity, Rounding::Down)?),
        ))
    }
}

// ---------------------------------------------------------------------------
// DecCoins
// ---------------------------------------------------------------------------

/// A single denomination and growth value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecCoin {
    /// Denomination.
    pub denom: Denom,
    /// Growth per unit of liquidity.
    pub amount: Dec,
}

/// Denomination-keyed growth accumulator; absent denominations are zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "Vec<DecCoin>", from = "Vec<DecCoin>")]
pub struct DecCoins(BTreeMap<Denom, Dec>);

impl DecCoins {
    /// Empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Value for `denom` (zero when absent).
    #[must_use]
    pub fn amount_of(&self, denom: &Denom) -> Dec {
        self.0.get(denom).copied().unwrap_or(Dec::ZERO)
    }

    /// Iterates `(denom, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Denom, &Dec)> {
        self.0.iter()
    }

    /// Returns `true` if no denomination holds a non-zero value.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.values().all(Dec::is_zero)
    }

    /// Sets the value of a denomination (removing it when zero).
    pub fn set(&mut self, denom: Denom, value: Dec) {
        if value.is_zero() {
            self.0.remove(&denom);
        } else {
            self.0.insert(denom, value);
        }
    }

    /// Adds `value` to `denom`.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] on overflow.
    pub fn add_amount(&mut self, denom: &Denom, value: Dec) -> Result<()> {
        let sum = self
            .amount_of(denom)
            .checked_add(&value)
            .ok_or(AmmError::Overflow("farming growth overflow"))?;
        self.set(denom.clone(), sum);
        Ok(())
    }

    fn union_denoms<'a>(&'a self, other: &'a Self) -> impl Iterator<Item = &'a Denom> {
        let mut denoms: Vec<&Denom> = self.0.keys().chain(other.0.keys()).collect();
        denoms.sort();
        denoms.dedup();
        denoms.into_iter()
    }

    /// Denomination-wise checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Invariant`] if any denomination would go
    /// negative.
    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        let mut out = Self::new();
        for denom in self.union_denoms(other) {
            let v = self
                .amount_of(denom)
                .checked_sub(&other.amount_of(denom))
                .ok_or(AmmError::Invariant("farming growth subtraction went negative"))?;
            out.set(denom.clone(), v);
        }
        Ok(out)
    }

    /// Denomination-wise modular subtraction.
    #[must_use]
    pub fn wrapping_sub(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for denom in self.union_denoms(other) {
            out.set(
                denom.clone(),
                self.amount_of(denom).wrapping_sub(&other.amount_of(denom)),
            );
        }
        out
    }

    /// Returns `true` if every value is ≤ the same denomination in `other`.
    #[must_use]
    pub fn is_all_lte(&self, other: &Self) -> bool {
        self.0.iter().all(|(d, v)| *v <= other.amount_of(d))
    }

    /// Converts `growth × liquidity` to owed coins, rounding down.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if an amount exceeds `u128`.
    pub fn owed_for(&self, liquidity: u128) -> Result<Coins> {
        let mut coins = Coins::new();
        for (denom, growth) in &self.0 {
            let amount = growth.mul_int_to_int(liquidity, Rounding::Down)?;
            coins.add_coin(&Coin::new(denom.clone(), Amount::new(amount)))?;
        }
        Ok(coins)
    }
}

impl From<DecCoins> for Vec<DecCoin> {
    fn from(value: DecCoins) -> Self {
        value
            .0
            .into_iter()
            .map(|(denom, amount)| DecCoin { denom, amount })
            .collect()
    }
}

impl From<Vec<DecCoin>> for DecCoins {
    fn from(value: Vec<DecCoin>) -> Self {
        let mut out = Self::new();
        for c in value {
            out.set(c.denom, c.amount);
        }
        out
    }
}

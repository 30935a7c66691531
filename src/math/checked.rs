//! Result-returning arithmetic over the quantity types.
//!
//! [`Amount`], [`Liquidity`] and [`Dec`] expose `Option`-returning
//! primitives; [`CheckedArithmetic`] turns them into [`AmmError`]s naming
//! the quantity involved, so ledger and engine code can chain with `?`.
//!
//! # Examples
//!
//! ```
//! use tidal_amm::domain::{Amount, Liquidity};
//! use tidal_amm::math::CheckedArithmetic;
//!
//! let balance = Amount::new(100).safe_add(&Amount::new(200));
//! assert_eq!(balance, Ok(Amount::new(300)));
//! assert!(Amount::new(1).safe_sub(&Amount::new(2)).is_err());
//!
//! let total = Liquidity::safe_sum([Liquidity::new(4), Liquidity::new(6)].iter());
//! assert_eq!(total, Ok(Liquidity::new(10)));
//! ```

use crate::domain::{Amount, Dec, Liquidity, Rounding};
use crate::error::AmmError;

/// Fallible arithmetic for balances, liquidity and growth values.
///
/// Never panics and never saturates.
pub trait CheckedArithmetic: Sized + Copy {
    /// Additive identity.
    const ZERO_VALUE: Self;

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the result is not representable.
    fn safe_add(&self, other: &Self) -> Result<Self, AmmError>;

    /// Checked subtraction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Underflow`] if the result would be negative.
    fn safe_sub(&self, other: &Self) -> Result<Self, AmmError>;

    /// Division rounded in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::DivisionByZero`] if `other` is zero.
    fn safe_div(&self, other: &Self, rounding: Rounding) -> Result<Self, AmmError>;

    /// Sum of every item.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the sum is not representable.
    fn safe_sum<'a>(items: impl IntoIterator<Item = &'a Self>) -> Result<Self, AmmError>
    where
        Self: 'a,
    {
        items
            .into_iter()
            .try_fold(Self::ZERO_VALUE, |acc, item| acc.safe_add(item))
    }
}

macro_rules! integer_quantity {
    ($ty:ty, $name:literal) => {
        impl CheckedArithmetic for $ty {
            const ZERO_VALUE: Self = <$ty>::ZERO;

            fn safe_add(&self, other: &Self) -> Result<Self, AmmError> {
                self.checked_add(other)
                    .ok_or(AmmError::Overflow(concat!($name, " overflow")))
            }

            fn safe_sub(&self, other: &Self) -> Result<Self, AmmError> {
                self.checked_sub(other)
                    .ok_or(AmmError::Underflow(concat!($name, " underflow")))
            }

            fn safe_div(&self, other: &Self, rounding: Rounding) -> Result<Self, AmmError> {
                crate::math::div_round(self.get(), other.get(), rounding)
                    .map(<$ty>::new)
                    .ok_or(AmmError::DivisionByZero)
            }
        }
    };
}

integer_quantity!(Amount, "amount");
integer_quantity!(Liquidity, "liquidity");

impl CheckedArithmetic for Dec {
    const ZERO_VALUE: Self = Dec::ZERO;

    fn safe_add(&self, other: &Self) -> Result<Self, AmmError> {
        self.checked_add(other)
            .ok_or(AmmError::Overflow("decimal overflow"))
    }

    fn safe_sub(&self, other: &Self) -> Result<Self, AmmError> {
        self.checked_sub(other)
            .ok_or(AmmError::Underflow("decimal underflow"))
    }

    fn safe_div(&self, other: &Self, rounding: Rounding) -> Result<Self, AmmError> {
        self.div(other, rounding)
    }
}

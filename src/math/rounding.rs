//! Rounding helpers for integer division.
//!
//! [`div_round`] performs `u128` division with an explicit [`Rounding`]
//! direction; [`mul_div`] and [`div_round_wide`] do the same for 256-bit
//! values, using a 512-bit intermediate product so that `a × b / d`
//! never loses precision before the final rounding step.  They are the
//! low-level building blocks of [`Dec`](crate::domain::Dec) and of the
//! liquidity formulas.
//!
//! # Convention
//!
//! **Always round in favour of the pool**:
//!
//! | Quantity | Direction |
//! |----------|-----------|
//! | Amount the pool receives | [`Rounding::Up`] |
//! | Amount the pool pays out | [`Rounding::Down`] |
//! | Liquidity minted | [`Rounding::Down`] |
//! | Growth credited per unit of liquidity | [`Rounding::Down`] |
//!
//! # Examples
//!
//! ```
//! use tidal_amm::domain::Rounding;
//! use tidal_amm::math::div_round;
//!
//! assert_eq!(div_round(10, 3, Rounding::Down), Some(3));
//! assert_eq!(div_round(10, 3, Rounding::Up), Some(4));
//! assert_eq!(div_round(10, 0, Rounding::Down), None);
//! ```

use primitive_types::{U256, U512};

use crate::domain::Rounding;

/// Integer division of `u128` values with explicit rounding direction.
///
/// Returns [`None`] if `denominator` is zero.
#[must_use]
pub const fn div_round(numerator: u128, denominator: u128, rounding: Rounding) -> Option<u128> {
    if denominator == 0 {
        return None;
    }
    let q = numerator / denominator;
    match rounding {
        Rounding::Down => Some(q),
        Rounding::Up => {
            // q + 1 cannot overflow: a non-zero remainder implies q < u128::MAX.
            if numerator % denominator != 0 {
                Some(q + 1)
            } else {
                Some(q)
            }
        }
    }
}

/// Division of 256-bit values with explicit rounding direction.
///
/// Returns [`None`] if `denominator` is zero.
#[must_use]
pub fn div_round_wide(numerator: U256, denominator: U256, rounding: Rounding) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let (q, r) = numerator.div_mod(denominator);
    if rounding.is_up() && !r.is_zero() {
        q.checked_add(U256::one())
    } else {
        Some(q)
    }
}

/// Computes `a × b / denominator` with a 512-bit intermediate.
///
/// Returns [`None`] if `denominator` is zero or the rounded quotient does
/// not fit in 256 bits.
///
/// # Examples
///
/// ```
/// use primitive_types::U256;
/// use tidal_amm::domain::Rounding;
/// use tidal_amm::math::mul_div;
///
/// let max = U256::MAX;
/// // (MAX × 3) / 3 would overflow a 256-bit product, but not here.
/// assert_eq!(mul_div(max, U256::from(3u8), U256::from(3u8), Rounding::Down), Some(max));
/// assert_eq!(mul_div(U256::from(7u8), U256::one(), U256::from(2u8), Rounding::Up), Some(U256::from(4u8)));
/// ```
#[must_use]
pub fn mul_div(a: U256, b: U256, denominator: U256, rounding: Rounding) -> Option<U256> {
    if denominator.is_zero() {
        return None;
    }
    let product: U512 = a.full_mul(b);
    let (q, r) = product.div_mod(U512::from(denominator));
    let q = if rounding.is_up() && !r.is_zero() {
        q.checked_add(U512::one())?
    } else {
        q
    };
    U256::try_from(q).ok()
}

//! Unsigned fixed-point decimal with 18 fractional digits.
//!
//! [`Dec`] is the only non-integer number type in the crate.  It backs
//! prices, square-root prices and growth accumulators.  The value `v` is
//! stored as the integer `v × 10^18` in a 256-bit word, so every
//! computation is bit-exact and reproducible; there is no floating point
//! anywhere.
//!
//! Every operation that can discard digits takes an explicit
//! [`Rounding`].  Growth accumulators additionally use the wrapping
//! operations, treating the 256-bit word as a modular counter.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Rounding;
use crate::error::{AmmError, Result};
use crate::math::{div_round_wide, mul_div};

/// Number of fractional decimal digits.
pub const DEC_PRECISION: u32 = 18;

/// `10^18` as the raw scaling factor.
const SCALE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Fixed-point decimal, `raw / 10^18`.
///
/// # Examples
///
/// ```
/// use tidal_amm::domain::{Dec, Rounding};
///
/// let price: Dec = "5.5".parse().expect("valid decimal");
/// let two = Dec::from_int(2);
/// let half = price.div(&two, Rounding::Down).expect("non-zero divisor");
/// assert_eq!(half.to_string(), "2.750000000000000000");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dec(U256);

impl Dec {
    /// Zero.
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));

    /// One.
    pub const ONE: Self = Self(SCALE);

    /// Returns the scaling factor `10^18` as a raw 256-bit word.
    #[must_use]
    pub const fn scale() -> U256 {
        SCALE
    }

    /// Wraps a raw `value × 10^18` word.
    #[must_use]
    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    /// Returns the raw `value × 10^18` word.
    #[must_use]
    pub const fn raw(&self) -> U256 {
        self.0
    }

    /// Exact conversion from an integer.
    ///
    /// Every `u128` fits: `u128::MAX × 10^18 < 2^256`.
    #[must_use]
    pub fn from_int(value: u128) -> Self {
        Self(U256::from(value) * SCALE)
    }

    /// `numerator / denominator` rounded in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::DivisionByZero`] if `denominator` is zero.
    pub fn from_ratio(numerator: u128, denominator: u128, rounding: Rounding) -> Result<Self> {
        mul_div(U256::from(numerator), SCALE, U256::from(denominator), rounding)
            .map(Self)
            .ok_or(AmmError::DivisionByZero)
    }

    /// Returns `10^exp` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if `exp` is below `-18` (not
    /// representable) or large enough to overflow 256 bits.
    pub fn pow10(exp: i32) -> Result<Self> {
        let shifted = exp
            .checked_add(DEC_PRECISION as i32)
            .ok_or(AmmError::Overflow("decimal exponent overflow"))?;
        if !(0..=76).contains(&shifted) {
            return Err(AmmError::Overflow("decimal exponent out of range"));
        }
        #[allow(clippy::cast_sign_loss)]
        Ok(Self(U256::exp10(shifted as usize)))
    }

    /// Returns `true` if the value is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if the value has no fractional part.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        (self.0 % SCALE).is_zero()
    }

    // -- Additive -----------------------------------------------------------

    /// Checked addition. Returns `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction. Returns `None` if the result would be negative.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Modular addition, for growth counters.
    #[must_use]
    pub fn wrapping_add(&self, other: &Self) -> Self {
        Self(self.0.overflowing_add(other.0).0)
    }

    /// Modular subtraction, for growth counters.
    #[must_use]
    pub fn wrapping_sub(&self, other: &Self) -> Self {
        Self(self.0.overflowing_sub(other.0).0)
    }

    // -- Multiplicative -----------------------------------------------------

    /// `self × other` rounded in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the product does not fit.
    pub fn mul(&self, other: &Self, rounding: Rounding) -> Result<Self> {
        mul_div(self.0, other.0, SCALE, rounding)
            .map(Self)
            .ok_or(AmmError::Overflow("decimal multiplication overflow"))
    }

    /// `self / other` rounded in the given direction.
    ///
    /// # Errors
    ///
    /// - [`AmmError::DivisionByZero`] if `other` is zero.
    /// - [`AmmError::Overflow`] if the quotient does not fit.
    pub fn div(&self, other: &Self, rounding: Rounding) -> Result<Self> {
        if other.is_zero() {
            return Err(AmmError::DivisionByZero);
        }
        mul_div(self.0, SCALE, other.0, rounding)
            .map(Self)
            .ok_or(AmmError::Overflow("decimal division overflow"))
    }

    /// `self × n` (exact).
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the product does not fit.
    pub fn mul_int(&self, n: u128) -> Result<Self> {
        self.0
            .checked_mul(U256::from(n))
            .map(Self)
            .ok_or(AmmError::Overflow("decimal integer multiplication overflow"))
    }

    /// `self / n` rounded in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::DivisionByZero`] if `n` is zero.
    pub fn quo_int(&self, n: u128, rounding: Rounding) -> Result<Self> {
        div_round_wide(self.0, U256::from(n), rounding)
            .map(Self)
            .ok_or(AmmError::DivisionByZero)
    }

    /// `self × n`, converted to an integer in the given direction.
    ///
    /// This is how a per-unit growth value is turned into an owed amount.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the result exceeds `u128`.
    pub fn mul_int_to_int(&self, n: u128, rounding: Rounding) -> Result<u128> {
        let v = mul_div(self.0, U256::from(n), SCALE, rounding)
            .ok_or(AmmError::Overflow("decimal integer product overflow"))?;
        to_u128(v)
    }

    /// Integer part in the given direction.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] if the result exceeds `u128`.
    pub fn to_int(&self, rounding: Rounding) -> Result<u128> {
        let v = div_round_wide(self.0, SCALE, rounding)
            .ok_or(AmmError::Overflow("decimal to integer overflow"))?;
        to_u128(v)
    }

    /// Square root, truncated to 18 fractional digits.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::Overflow`] for values above roughly `10^59`.
    pub fn sqrt(&self) -> Result<Self> {
        let widened = self
            .0
            .checked_mul(SCALE)
            .ok_or(AmmError::Overflow("decimal square root overflow"))?;
        Ok(Self(widened.integer_sqrt()))
    }

    /// Returns the number of decimal digits in the raw word (`0` for zero).
    #[must_use]
    pub fn raw_digits(&self) -> u32 {
        let mut digits = 0;
        let mut v = self.0;
        let ten = U256::from(10u8);
        while !v.is_zero() {
            v /= ten;
            digits += 1;
        }
        digits
    }
}

fn to_u128(v: U256) -> Result<u128> {
    if v > U256::from(u128::MAX) {
        return Err(AmmError::Overflow("value exceeds u128"));
    }
    Ok(v.low_u128())
}

impl PartialOrd for Dec {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dec {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (int, frac) = self.0.div_mod(SCALE);
        write!(f, "{}.{:018}", int, frac.low_u64())
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({self})")
    }
}

impl FromStr for Dec {
    type Err = AmmError;

    /// Parses `"123"`, `"0.5"` or `"5.000000000000000001"`.
    ///
    /// More than 18 fractional digits is rejected rather than rounded.
    fn from_str(s: &str) -> Result<Self> {
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmmError::InvalidAmount("empty decimal string"));
        }
        if frac_part.len() > DEC_PRECISION as usize {
            return Err(AmmError::InvalidAmount("too many fractional digits"));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(AmmError::InvalidAmount("malformed decimal string"));
        }
        let int = if int_part.is_empty() {
            U256::zero()
        } else {
            U256::from_dec_str(int_part)
                .map_err(|_| AmmError::InvalidAmount("malformed decimal string"))?
        };
        let frac = if frac_part.is_empty() {
            U256::zero()
        } else {
            let padded = format!("{frac_part:0<18}");
            U256::from_dec_str(&padded)
                .map_err(|_| AmmError::InvalidAmount("malformed decimal string"))?
        };
        int.checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or(AmmError::Overflow("decimal literal overflow"))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

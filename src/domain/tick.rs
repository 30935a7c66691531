//! Discrete price point on the decimal tick grid.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::Rounding;
use crate::error::AmmError;

/// Minimum valid tick index, the tick of price `10^-14`.
const MIN_TICK: i32 = -1_260_000;

/// Maximum valid tick index, the tick of price `10^24`.
const MAX_TICK: i32 = 2_160_000;

/// A discrete price point.
///
/// Ticks follow a decimal grid: each decade of price holds `90 000`
/// ticks, so every tick price has exactly five significant digits
/// (`1.0000, 1.0001, …, 9.9999, 10.000, 10.001, …`).  Tick `0` is price
/// `1`; tick `40 000` is price `5`.  See
/// [`price_at_tick`](crate::math::price_at_tick).
///
/// # Examples
///
/// ```
/// use tidal_amm::domain::{Rounding, Tick};
///
/// let tick = Tick::new(40_003).expect("in range");
/// assert_eq!(tick.round_to_spacing(10, Rounding::Down).map(|t| t.get()), Ok(40_000));
/// assert!(!tick.is_aligned(10));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tick(i32);

impl Tick {
    /// Minimum valid tick (`-1 260 000`, price `10^-14`).
    pub const MIN: Self = Self(MIN_TICK);

    /// Maximum valid tick (`2 160 000`, price `10^24`).
    pub const MAX: Self = Self(MAX_TICK);

    /// Tick of price `1`.
    pub const ZERO: Self = Self(0);

    /// Creates a new `Tick` with range validation.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::InvalidTick`] if `value` is outside
    /// `[MIN, MAX]`.
    pub const fn new(value: i32) -> crate::error::Result<Self> {
        if value < MIN_TICK || value > MAX_TICK {
            return Err(AmmError::InvalidTick("tick out of range"));
        }
        Ok(Self(value))
    }

    /// Returns the underlying `i32` tick index.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// Checked addition of a delta. `None` outside the valid range.
    #[must_use]
    pub const fn checked_add(&self, delta: i32) -> Option<Self> {
        match self.0.checked_add(delta) {
            Some(v) if v >= MIN_TICK && v <= MAX_TICK => Some(Self(v)),
            _ => None,
        }
    }

    /// Checked subtraction of a delta. `None` outside the valid range.
    #[must_use]
    pub const fn checked_sub(&self, delta: i32) -> Option<Self> {
        match self.0.checked_sub(delta) {
            Some(v) if v >= MIN_TICK && v <= MAX_TICK => Some(Self(v)),
            _ => None,
        }
    }

    /// Returns `true` if the tick is a multiple of `spacing`.
    #[must_use]
    pub const fn is_aligned(&self, spacing: u32) -> bool {
        if spacing == 0 {
            return false;
        }
        (self.0 as i64).rem_euclid(spacing as i64) == 0
    }

    /// Rounds to a multiple of `spacing`: [`Rounding::Down`] towards lower
    /// prices, [`Rounding::Up`] towards higher prices.
    ///
    /// # Errors
    ///
    /// - [`AmmError::InvalidConfiguration`] if `spacing` is zero.
    /// - [`AmmError::InvalidTick`] if the rounded tick leaves the valid
    ///   range.
    pub fn round_to_spacing(&self, spacing: u32, rounding: Rounding) -> crate::error::Result<Self> {
        if spacing == 0 {
            return Err(AmmError::InvalidConfiguration("tick spacing must be non-zero"));
        }
        let t = i64::from(self.0);
        let s = i64::from(spacing);
        let floor = t - t.rem_euclid(s);
        let rounded = if rounding.is_up() && floor != t {
            floor + s
        } else {
            floor
        };
        let v = i32::try_from(rounded).map_err(|_| AmmError::InvalidTick("tick out of range"))?;
        Self::new(v)
    }

    /// Lowest spacing-aligned tick in the valid range.
    ///
    /// # Errors
    ///
    /// Propagates [`Tick::round_to_spacing`] errors.
    pub fn min_aligned(spacing: u32) -> crate::error::Result<Self> {
        Self::MIN.round_to_spacing(spacing, Rounding::Up)
    }

    /// Highest spacing-aligned tick in the valid range.
    ///
    /// # Errors
    ///
    /// Propagates [`Tick::round_to_spacing`] errors.
    pub fn max_aligned(spacing: u32) -> crate::error::Result<Self> {
        Self::MAX.round_to_spacing(spacing, Rounding::Down)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn tick(v: i32) -> Tick {
        let Ok(t) = Tick::new(v) else {
            panic!("valid tick expected");
        };
        t
    }

    // -- Construction -------------------------------------------------------

    #[test]
    fn bounds_are_valid() {
        assert_eq!(tick(-1_260_000), Tick::MIN);
        assert_eq!(tick(2_160_000), Tick::MAX);
    }

    #[test]
    fn out_of_range_is_error() {
        assert!(Tick::new(MIN_TICK - 1).is_err());
        assert!(Tick::new(MAX_TICK + 1).is_err());
    }

    #[test]
    fn checked_arithmetic_respects_range() {
        assert_eq!(Tick::MAX.checked_add(1), None);
        assert_eq!(Tick::MIN.checked_sub(1), None);
        assert_eq!(tick(10).checked_add(-20), Some(tick(-10)));
    }

    // -- Spacing ------------------------------------------------------------

    #[test]
    fn alignment() {
        assert!(tick(40_000).is_aligned(10));
        assert!(tick(-30).is_aligned(10));
        assert!(!tick(-35).is_aligned(10));
        assert!(!tick(0).is_aligned(0));
    }

    #[test]
    fn rounding_positive_and_negative() {
        assert_eq!(tick(15).round_to_spacing(10, Rounding::Down), Ok(tick(10)));
        assert_eq!(tick(15).round_to_spacing(10, Rounding::Up), Ok(tick(20)));
        assert_eq!(tick(-15).round_to_spacing(10, Rounding::Down), Ok(tick(-20)));
        assert_eq!(tick(-15).round_to_spacing(10, Rounding::Up), Ok(tick(-10)));
        assert_eq!(tick(20).round_to_spacing(10, Rounding::Up), Ok(tick(20)));
    }

    #[test]
    fn aligned_bounds() {
        assert_eq!(Tick::min_aligned(50), Ok(tick(-1_260_000)));
        assert_eq!(Tick::max_aligned(50), Ok(tick(2_160_000)));
        assert!(Tick::round_to_spacing(&Tick::MAX, 7, Rounding::Up).is_err());
    }

    #[test]
    fn display() {
        assert_eq!(tick(-42).to_string(), "-42");
    }
}

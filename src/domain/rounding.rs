//! Explicit rounding direction for arithmetic operations.

use serde::{Deserialize, Serialize};

/// Rounding direction for every division, multiplication and square
/// root performed on amounts, liquidity, prices and growth values.
///
/// There is deliberately no "nearest" variant: the direction must always
/// favour the pool (round up what the pool receives, round down what it
/// pays out).
///
/// # Examples
///
/// ```
/// use tidal_amm::domain::Rounding;
///
/// assert!(Rounding::Up.is_up());
/// assert_eq!(Rounding::Up.flip(), Rounding::Down);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rounding {
    /// Round towards positive infinity (ceiling).
    Up,
    /// Round towards zero (floor).
    Down,
}

impl Rounding {
    /// Returns `true` if this is [`Rounding::Up`].
    #[must_use]
    pub const fn is_up(&self) -> bool {
        matches!(self, Self::Up)
    }

    /// Returns `true` if this is [`Rounding::Down`].
    #[must_use]
    pub const fn is_down(&self) -> bool {
        matches!(self, Self::Down)
    }

    /// Returns the opposite direction.
    ///
    /// Used when a quantity appears in a denominator.
    #[must_use]
    pub const fn flip(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

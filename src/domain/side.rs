//! Order side on the exchange's order book.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Side of a limit order, from the pool's point of view.
///
/// A pool **buys** base (`denom0`) with quote (`denom1`) below the current
/// price and **sells** base above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    /// Pay quote, receive base.
    Buy,
    /// Pay base, receive quote.
    Sell,
}

impl OrderSide {
    /// The opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Returns `true` for [`OrderSide::Buy`].
    #[must_use]
    pub const fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("buy"),
            Self::Sell => f.write_str("sell"),
        }
    }
}

//! Per-tick liquidity and growth checkpoints.

use serde::{Deserialize, Serialize};

use crate::domain::{DecCoins, DecPair, Liquidity};

/// Aggregate state of an initialized tick, keyed by `(pool, tick)`.
///
/// A tick is initialized while any position uses it as a bound; the
/// record is deleted once `gross_liquidity` returns to zero.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickInfo {
    /// Total liquidity of positions bounded by this tick.
    pub gross_liquidity: Liquidity,
    /// Liquidity added to the active liquidity when the price crosses
    /// this tick upward (subtracted when crossing downward).
    pub net_liquidity: i128,
    /// Fee growth on the side of this tick away from the current price.
    pub fee_growth_outside: DecPair,
    /// Farming growth on the side of this tick away from the current
    /// price.
    pub farming_rewards_growth_outside: DecCoins,
}

impl TickInfo {
    /// Returns `true` if `gross ≥ |net|`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.net_liquidity.unsigned_abs() <= self.gross_liquidity.get()
    }
}

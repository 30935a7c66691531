//! Liquidity of concentrated positions.

use super::quantity::unsigned_quantity;

unsigned_quantity! {
    /// Curve depth `L` of a position or a pool.
    ///
    /// Moving the square-root price by `Δ√P` exchanges `L · Δ√P` of the
    /// quote coin.  Positions, pools and ticks hold it unsigned; changes
    /// travel as signed `i128` deltas, applied with
    /// [`checked_apply`](Self::checked_apply).
    ///
    /// # Examples
    ///
    /// ```
    /// use tidal_amm::domain::Liquidity;
    ///
    /// let active = Liquidity::new(1_000);
    /// assert_eq!(active.checked_apply(-400), Some(Liquidity::new(600)));
    /// assert_eq!(active.checked_apply(-1_001), None);
    /// ```
    Liquidity
}

impl Liquidity {
    /// Adds a signed delta, or `None` if the result leaves `0..=u128::MAX`.
    #[must_use]
    pub fn checked_apply(&self, delta: i128) -> Option<Self> {
        let magnitude = delta.unsigned_abs();
        if delta < 0 {
            self.0.checked_sub(magnitude).map(Self)
        } else {
            self.0.checked_add(magnitude).map(Self)
        }
    }

    /// The liquidity as a signed delta, or `None` above `i128::MAX`.
    #[must_use]
    pub fn to_delta(&self) -> Option<i128> {
        i128::try_from(self.0).ok()
    }
}

//! Module-wide parameters.

use serde::{Deserialize, Serialize};

use crate::domain::{Address, Amount, Coins};
use crate::error::AmmError;

/// Seconds in one day; farming plans quote rewards per day.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Bounds on the synthetic orders generated for each pool and side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLimits {
    /// Maximum number of orders per pool per side.
    pub max_orders_per_side: u32,
    /// Minimum base quantity of a single order.
    pub min_order_quantity: Amount,
    /// Minimum quote notional (`quantity × price`) of a single order.
    pub min_order_quote: Amount,
}

impl Default for OrderLimits {
    fn default() -> Self {
        Self {
            max_orders_per_side: 20,
            min_order_quantity: Amount::new(1),
            min_order_quote: Amount::new(1),
        }
    }
}

/// Governance-controlled parameters of the AMM core.
///
/// Hosts usually deserialize this from JSON and pass it to
/// [`Amm::new`](crate::engine::Amm::new), which calls
/// [`Params::validate`].
///
/// # Validation
///
/// - `allowed_tick_spacings` is non-empty, strictly ascending and free of
///   zero; every spacing divides `90 000`, the number of ticks per decade.
/// - `default_tick_spacing` is one of the allowed spacings.
/// - `max_farming_block_time` is positive.
/// - `order_limits.max_orders_per_side` is positive.
///
/// # Examples
///
/// ```
/// use tidal_amm::config::Params;
///
/// let params = Params::default();
/// assert!(params.validate().is_ok());
/// assert_eq!(params.allowed_tick_spacings, vec![1, 2, 5, 10, 50]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Tick spacings a pool may be created with.
    pub allowed_tick_spacings: Vec<u32>,
    /// Spacing used when a pool is created without one.
    pub default_tick_spacing: u32,
    /// Fee charged to a pool creator.
    pub pool_creation_fee: Coins,
    /// Fee charged to a private farming plan creator.
    pub private_farming_plan_creation_fee: Coins,
    /// Maximum number of live (non-terminated) private farming plans.
    pub max_num_private_farming_plans: u32,
    /// Cap, in seconds, on the elapsed time of one farming cycle.
    pub max_farming_block_time: u64,
    /// Account receiving creation fees.
    pub fee_collector: Address,
    /// Holding account for settled fees and farming rewards owed to
    /// positions.
    pub rewards_pool: Address,
    /// Synthetic order bounds.
    pub order_limits: OrderLimits,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            allowed_tick_spacings: vec![1, 2, 5, 10, 50],
            default_tick_spacing: 50,
            pool_creation_fee: Coins::new(),
            private_farming_plan_creation_fee: Coins::new(),
            max_num_private_farming_plans: 50,
            max_farming_block_time: 10,
            fee_collector: Address::new("amm/fee_collector"),
            rewards_pool: Address::new("amm/rewards_pool"),
            order_limits: OrderLimits::default(),
        }
    }
}

impl Params {
    /// Validates all parameter invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::InvalidConfiguration`] describing the first
    /// violated rule.
    pub fn validate(&self) -> Result<(), AmmError> {
        if self.allowed_tick_spacings.is_empty() {
            return Err(AmmError::InvalidConfiguration(
                "allowed tick spacings must not be empty",
            ));
        }
        if self.allowed_tick_spacings.windows(2).any(|w| w.first() >= w.get(1)) {
            return Err(AmmError::InvalidConfiguration(
                "allowed tick spacings must be strictly ascending",
            ));
        }
        if self
            .allowed_tick_spacings
            .iter()
            .any(|s| *s == 0 || 90_000 % *s != 0)
        {
            return Err(AmmError::InvalidConfiguration(
                "tick spacing must be a non-zero divisor of 90000",
            ));
        }
        if !self.is_allowed_tick_spacing(self.default_tick_spacing) {
            return Err(AmmError::InvalidConfiguration(
                "default tick spacing must be allowed",
            ));
        }
        if self.max_farming_block_time == 0 {
            return Err(AmmError::InvalidConfiguration(
                "max farming block time must be positive",
            ));
        }
        if self.order_limits.max_orders_per_side == 0 {
            return Err(AmmError::InvalidConfiguration(
                "max orders per side must be positive",
            ));
        }
        if self.fee_collector == self.rewards_pool {
            return Err(AmmError::InvalidConfiguration(
                "fee collector and rewards pool must differ",
            ));
        }
        Ok(())
    }

    /// Returns `true` if `spacing` is in the allow-list.
    #[must_use]
    pub fn is_allowed_tick_spacing(&self, spacing: u32) -> bool {
        self.allowed_tick_spacings.contains(&spacing)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(Params::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_spacings() {
        let mut p = Params::default();
        p.allowed_tick_spacings = vec![];
        assert!(p.validate().is_err());
        p.allowed_tick_spacings = vec![10, 5];
        assert!(p.validate().is_err());
        p.allowed_tick_spacings = vec![0, 50];
        assert!(p.validate().is_err());
        p.allowed_tick_spacings = vec![7, 50];
        assert!(p.validate().is_err());
    }

    #[test]
    fn default_spacing_must_be_allowed() {
        let p = Params {
            default_tick_spacing: 20,
            ..Params::default()
        };
        assert!(matches!(p.validate(), Err(AmmError::InvalidConfiguration(_))));
    }

    #[test]
    fn zero_limits_rejected() {
        let mut p = Params::default();
        p.max_farming_block_time = 0;
        assert!(p.validate().is_err());
        let mut p = Params::default();
        p.order_limits.max_orders_per_side = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn json_round_trip() {
        let p = Params::default();
        let Ok(json) = serde_json::to_string(&p) else {
            panic!("serialize");
        };
        let Ok(back) = serde_json::from_str::<Params>(&json) else {
            panic!("deserialize");
        };
        assert_eq!(back, p);
    }
}

//! Record identifiers.
//!
//! Each identifier is a `u64` newtype handed out by a counter record in
//! the [`Store`](crate::store::Store); ids start at `1`.

use core::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw id.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw id.
            #[must_use]
            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a liquidity pool.
    PoolId
);
id_type!(
    /// Identifier of a liquidity position.
    PositionId
);
id_type!(
    /// Identifier of a farming plan.
    PlanId
);
id_type!(
    /// Identifier of an order-book market (owned by the exchange).
    MarketId
);
id_type!(
    /// Identifier of an order resting on the matching engine.
    OrderId
);

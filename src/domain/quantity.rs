//! Shared shape of the unsigned integer quantities.

/// Declares a `u128` newtype that serializes as a bare number, with a
/// zero constant, raw access, checked addition and subtraction, and
/// decimal display.
macro_rules! unsigned_quantity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u128);

        impl $name {
            /// Zero.
            pub const ZERO: Self = Self(0);

            /// Wraps a raw value.
            #[must_use]
            pub const fn new(value: u128) -> Self {
                Self(value)
            }

            /// Raw value.
            #[must_use]
            pub const fn get(&self) -> u128 {
                self.0
            }

            /// Returns `true` for zero.
            #[must_use]
            pub const fn is_zero(&self) -> bool {
                self.0 == 0
            }

            /// Sum, or `None` on overflow.
            #[must_use]
            pub fn checked_add(&self, other: &Self) -> Option<Self> {
                self.0.checked_add(other.0).map(Self)
            }

            /// Difference, or `None` when `other` is larger.
            #[must_use]
            pub fn checked_sub(&self, other: &Self) -> Option<Self> {
                self.0.checked_sub(other.0).map(Self)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

pub(crate) use unsigned_quantity;

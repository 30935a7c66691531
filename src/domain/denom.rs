//! Coin denominations and ledger account addresses.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AmmError;

/// A coin denomination such as `"ucre"` or `"ibc/27394FB0"`.
///
/// Must start with an ASCII letter, be 3–128 characters long and contain
/// only letters, digits and `/ : . _ -`.
///
/// # Examples
///
/// ```
/// use tidal_amm::domain::Denom;
///
/// assert!(Denom::new("ucre").is_ok());
/// assert!(Denom::new("1abc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Denom(String);

impl Denom {
    /// Creates a validated denomination.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::InvalidDenom`] if the string is malformed.
    pub fn new(value: impl Into<String>) -> crate::error::Result<Self> {
        let value = value.into();
        let len_ok = (3..=128).contains(&value.len());
        let mut bytes = value.bytes();
        let first_ok = bytes.next().is_some_and(|b| b.is_ascii_alphabetic());
        let rest_ok = bytes.all(|b| b.is_ascii_alphanumeric() || b"/:._-".contains(&b));
        if !(len_ok && first_ok && rest_ok) {
            return Err(AmmError::InvalidDenom("malformed denomination"));
        }
        Ok(Self(value))
    }

    /// Returns the denomination string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Denom {
    type Error = AmmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Denom> for String {
    fn from(value: Denom) -> Self {
        value.0
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An account on the balance ledger.
///
/// Opaque to this crate apart from the module accounts it derives for
/// pool reserves (see [`Address::pool_reserve`]).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps an account identifier.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Module account holding a pool's reserve.
    #[must_use]
    pub fn pool_reserve(pool_id: super::PoolId) -> Self {
        Self(format!("amm/pool/{}/reserve", pool_id.get()))
    }

    /// Returns the identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PoolId;

    #[test]
    fn accepts_common_denoms() {
        for s in ["ucre", "uusd", "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2", "pool1:a.b_c-d"] {
            assert!(Denom::new(s).is_ok(), "{s} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_denoms() {
        for s in ["", "ab", "1abc", "ab c", "a$bc"] {
            assert!(Denom::new(s).is_err(), "{s:?} should be invalid");
        }
    }

    #[test]
    fn serde_validates() {
        assert!(serde_json::from_str::<Denom>("\"ucre\"").is_ok());
        assert!(serde_json::from_str::<Denom>("\"x\"").is_err());
    }

    #[test]
    fn reserve_address_is_per_pool() {
        assert_ne!(
            Address::pool_reserve(PoolId::new(1)),
            Address::pool_reserve(PoolId::new(2))
        );
        assert_eq!(Address::pool_reserve(PoolId::new(7)).as_str(), "amm/pool/7/reserve");
    }
}

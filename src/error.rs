//! Unified error types for the Tidal AMM core.
//!
//! All fallible operations across the crate return [`AmmError`] as their
//! error type.  Variants fall into three classes:
//!
//! | Class | Variants | Effect |
//! |-------|----------|--------|
//! | Caller input | `NotFound`, `InvalidTick`, `InvalidAmount`, … | Rejected, no state change |
//! | Invariant violation | `Invariant`, `Overflow`, `Underflow`, `DivisionByZero` | Unit of work aborted |
//! | Resource shortfall | n/a | Handled internally (skipped), never surfaced |
//!
//! Every mutation runs on a scratch copy of state (see
//! [`Amm::transact`](crate::engine::Amm::transact)), so returning any
//! error discards partial writes.

use thiserror::Error;

/// Crate-wide error enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmmError {
    /// A referenced record (pool, position, plan, market) does not exist.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// A record with the same key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(&'static str),

    /// Tick outside the valid range or misaligned with the tick spacing.
    #[error("invalid tick: {0}")]
    InvalidTick(&'static str),

    /// Malformed tick range (`lower >= upper`, misaligned bounds).
    #[error("invalid tick range: {0}")]
    InvalidTickRange(&'static str),

    /// Price outside `[MIN_PRICE, MAX_PRICE]` or otherwise unusable.
    #[error("invalid price: {0}")]
    InvalidPrice(&'static str),

    /// Zero or otherwise unacceptable amount / quantity.
    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),

    /// Bad denomination or denomination pair.
    #[error("invalid denom: {0}")]
    InvalidDenom(&'static str),

    /// Parameter or request violates configuration rules.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// The caller's funds cannot cover the request.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(&'static str),

    /// The position or pool does not hold enough liquidity.
    #[error("insufficient liquidity: {0}")]
    InsufficientLiquidity(&'static str),

    /// The sender does not own the record it is trying to mutate.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),

    /// Internal accounting invariant violated; indicates a bug in this
    /// core or its caller.  Processing of the unit of work stops.
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),

    /// Arithmetic overflow.
    #[error("arithmetic overflow: {0}")]
    Overflow(&'static str),

    /// Arithmetic underflow (subtraction below zero).
    #[error("arithmetic underflow: {0}")]
    Underflow(&'static str),

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
}

impl AmmError {
    /// Returns `true` for errors that signal a broken internal invariant
    /// rather than bad caller input.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::Invariant(_) | Self::Overflow(_) | Self::Underflow(_) | Self::DivisionByZero
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = AmmError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_not_invariant_violations() {
        assert!(!AmmError::NotFound("pool").is_invariant_violation());
        assert!(!AmmError::InsufficientFunds("reserve").is_invariant_violation());
        assert!(!AmmError::InvalidTick("misaligned").is_invariant_violation());
    }

    #[test]
    fn invariant_errors_are_classified() {
        assert!(AmmError::Invariant("tick missing").is_invariant_violation());
        assert!(AmmError::Underflow("growth").is_invariant_violation());
        assert!(AmmError::DivisionByZero.is_invariant_violation());
    }

    #[test]
    fn display_includes_context() {
        let msg = AmmError::InvalidTickRange("lower tick must be less than upper tick").to_string();
        assert!(msg.contains("lower tick must be less than upper tick"));
    }
}

//! Liquidity and amount conversion formulas for concentrated liquidity.
//!
//! All formulas work on square-root prices.  With `√a < √b` bounding a
//! price span and `L` the liquidity active across it:
//!
//! ```text
//! amount0 = L × (√b − √a) / (√a × √b)      base (denom0)
//! amount1 = L × (√b − √a)                  quote (denom1)
//! ```
//!
//! Every function takes or documents its [`Rounding`] direction: amounts
//! the pool receives round up, amounts it pays round down, and minted
//! liquidity rounds down.

use primitive_types::U256;

use crate::domain::{Amount, Dec, Liquidity, OrderSide, Rounding};
use crate::error::{AmmError, Result};
use crate::math::{div_round_wide, mul_div};

fn ordered(a: Dec, b: Dec) -> (U256, U256) {
    if a <= b {
        (a.raw(), b.raw())
    } else {
        (b.raw(), a.raw())
    }
}

fn to_amount(v: U256) -> Result<Amount> {
    if v > U256::from(u128::MAX) {
        return Err(AmmError::Overflow("amount exceeds u128"));
    }
    Ok(Amount::new(v.low_u128()))
}

fn to_liquidity(v: U256) -> Result<Liquidity> {
    if v > U256::from(u128::MAX) {
        return Err(AmmError::Overflow("liquidity exceeds u128"));
    }
    Ok(Liquidity::new(v.low_u128()))
}

/// Amount of `denom0` spanned by moving between two square-root prices at
/// constant liquidity.  The prices may be given in either order.
///
/// # Errors
///
/// - [`AmmError::InvalidPrice`] if the lower square-root price is zero.
/// - [`AmmError::Overflow`] if the result exceeds `u128`.
pub fn amount0_delta(
    sqrt_price_a: Dec,
    sqrt_price_b: Dec,
    liquidity: Liquidity,
    rounding: Rounding,
) -> Result<Amount> {
    let (a, b) = ordered(sqrt_price_a, sqrt_price_b);
    if a.is_zero() {
        return Err(AmmError::InvalidPrice("square-root price must be positive"));
    }
    let numerator = U256::from(liquidity.get()) * Dec::scale();
    let partial = mul_div(numerator, b - a, b, rounding)
        .ok_or(AmmError::Overflow("amount0 delta overflow"))?;
    let amount = div_round_wide(partial, a, rounding).ok_or(AmmError::DivisionByZero)?;
    to_amount(amount)
}

/// Amount of `denom1` spanned by moving between two square-root prices at
/// constant liquidity.  The prices may be given in either order.
///
/// # Errors
///
/// Returns [`AmmError::Overflow`] if the result exceeds `u128`.
pub fn amount1_delta(
    sqrt_price_a: Dec,
    sqrt_price_b: Dec,
    liquidity: Liquidity,
    rounding: Rounding,
) -> Result<Amount> {
    let (a, b) = ordered(sqrt_price_a, sqrt_price_b);
    let amount = mul_div(U256::from(liquidity.get()), b - a, Dec::scale(), rounding)
        .ok_or(AmmError::Overflow("amount1 delta overflow"))?;
    to_amount(amount)
}

/// Liquidity obtainable from `amount0` over `[√a, √b]`, rounded down.
///
/// # Errors
///
/// - [`AmmError::InvalidTickRange`] if the prices are equal.
/// - [`AmmError::Overflow`] if the result exceeds `u128`.
pub fn liquidity_for_amount0(sqrt_price_a: Dec, sqrt_price_b: Dec, amount0: Amount) -> Result<Liquidity> {
    let (a, b) = ordered(sqrt_price_a, sqrt_price_b);
    if a == b {
        return Err(AmmError::InvalidTickRange("empty price range"));
    }
    let product = mul_div(a, b, Dec::scale(), Rounding::Down)
        .ok_or(AmmError::Overflow("square-root price product overflow"))?;
    let liquidity = mul_div(U256::from(amount0.get()), product, b - a, Rounding::Down)
        .ok_or(AmmError::Overflow("liquidity overflow"))?;
    to_liquidity(liquidity)
}

/// Liquidity obtainable from `amount1` over `[√a, √b]`, rounded down.
///
/// # Errors
///
/// - [`AmmError::InvalidTickRange`] if the prices are equal.
/// - [`AmmError::Overflow`] if the result exceeds `u128`.
pub fn liquidity_for_amount1(sqrt_price_a: Dec, sqrt_price_b: Dec, amount1: Amount) -> Result<Liquidity> {
    let (a, b) = ordered(sqrt_price_a, sqrt_price_b);
    if a == b {
        return Err(AmmError::InvalidTickRange("empty price range"));
    }
    let liquidity = mul_div(U256::from(amount1.get()), Dec::scale(), b - a, Rounding::Down)
        .ok_or(AmmError::Overflow("liquidity overflow"))?;
    to_liquidity(liquidity)
}

/// Maximum liquidity that `(amount0, amount1)` can back over
/// `[sqrt_price_lower, sqrt_price_upper)` at the current price.
///
/// - Current price at or below the range: only `amount0` is used.
/// - Current price at or above the range: only `amount1` is used.
/// - Inside the range: the smaller of the two single-sided solutions.
///
/// # Errors
///
/// - [`AmmError::InvalidTickRange`] if `lower >= upper`.
/// - [`AmmError::Overflow`] if the result exceeds `u128`.
///
/// # Examples
///
/// ```
/// use tidal_amm::domain::{Amount, Dec};
/// use tidal_amm::math::{amounts_for_liquidity, liquidity_for_amounts};
/// use tidal_amm::domain::Rounding;
///
/// let current = Dec::from_int(2); // price 4
/// let lower = Dec::ONE;
/// let upper = Dec::from_int(3);
/// let liquidity = liquidity_for_amounts(current, lower, upper, Amount::new(1_000), Amount::new(1_000))
///     .expect("valid range");
/// let (a0, a1) = amounts_for_liquidity(current, lower, upper, liquidity, Rounding::Up)
///     .expect("valid range");
/// assert!(a0 <= Amount::new(1_000) && a1 <= Amount::new(1_000));
/// ```
pub fn liquidity_for_amounts(
    current_sqrt_price: Dec,
    sqrt_price_lower: Dec,
    sqrt_price_upper: Dec,
    amount0: Amount,
    amount1: Amount,
) -> Result<Liquidity> {
    if sqrt_price_lower >= sqrt_price_upper {
        return Err(AmmError::InvalidTickRange("lower price must be below upper price"));
    }
    if current_sqrt_price <= sqrt_price_lower {
        liquidity_for_amount0(sqrt_price_lower, sqrt_price_upper, amount0)
    } else if current_sqrt_price >= sqrt_price_upper {
        liquidity_for_amount1(sqrt_price_lower, sqrt_price_upper, amount1)
    } else {
        let l0 = liquidity_for_amount0(current_sqrt_price, sqrt_price_upper, amount0)?;
        let l1 = liquidity_for_amount1(sqrt_price_lower, current_sqrt_price, amount1)?;
        Ok(if l0 <= l1 { l0 } else { l1 })
    }
}

/// Amounts backing `liquidity` over `[sqrt_price_lower, sqrt_price_upper)`
/// at the current price.
///
/// # Errors
///
/// - [`AmmError::InvalidTickRange`] if `lower >= upper`.
/// - Propagates [`amount0_delta`] / [`amount1_delta`] errors.
pub fn amounts_for_liquidity(
    current_sqrt_price: Dec,
    sqrt_price_lower: Dec,
    sqrt_price_upper: Dec,
    liquidity: Liquidity,
    rounding: Rounding,
) -> Result<(Amount, Amount)> {
    if sqrt_price_lower >= sqrt_price_upper {
        return Err(AmmError::InvalidTickRange("lower price must be below upper price"));
    }
    if current_sqrt_price <= sqrt_price_lower {
        Ok((
            amount0_delta(sqrt_price_lower, sqrt_price_upper, liquidity, rounding)?,
            Amount::ZERO,
        ))
    } else if current_sqrt_price >= sqrt_price_upper {
        Ok((
            Amount::ZERO,
            amount1_delta(sqrt_price_lower, sqrt_price_upper, liquidity, rounding)?,
        ))
    } else {
        Ok((
            amount0_delta(current_sqrt_price, sqrt_price_upper, liquidity, rounding)?,
            amount1_delta(sqrt_price_lower, current_sqrt_price, liquidity, rounding)?,
        ))
    }
}

/// Solves the curve for the square-root price reached after the pool
/// pays out `amount` on `side`.
///
/// - [`OrderSide::Buy`]: the pool pays `amount` of `denom1` and the price
///   falls: `√p' = √p − amount / L`.
/// - [`OrderSide::Sell`]: the pool pays `amount` of `denom0` and the price
///   rises: `√p' = L × √p / (L − amount × √p)`.
///
/// The result is rounded so the price never moves further than the exact
/// solution.
///
/// # Errors
///
/// - [`AmmError::InsufficientLiquidity`] if `liquidity` is zero or the
///   curve cannot supply `amount`.
/// - [`AmmError::Overflow`] on intermediate overflow.
pub fn next_sqrt_price_from_output(
    sqrt_price: Dec,
    liquidity: Liquidity,
    amount: Amount,
    side: OrderSide,
) -> Result<Dec> {
    if amount.is_zero() {
        return Ok(sqrt_price);
    }
    if liquidity.is_zero() {
        return Err(AmmError::InsufficientLiquidity("no liquidity to fill against"));
    }
    let l = U256::from(liquidity.get());
    let amount = U256::from(amount.get());
    let s = sqrt_price.raw();
    match side {
        OrderSide::Buy => {
            let delta = mul_div(amount, Dec::scale(), l, Rounding::Down)
                .ok_or(AmmError::Overflow("square-root price delta overflow"))?;
            if delta >= s {
                return Err(AmmError::InsufficientLiquidity("output exceeds curve quote"));
            }
            Ok(Dec::from_raw(s - delta))
        }
        OrderSide::Sell => {
            let ls = l * Dec::scale();
            let consumed = amount
                .checked_mul(s)
                .ok_or(AmmError::Overflow("square-root price product overflow"))?;
            if consumed >= ls {
                return Err(AmmError::InsufficientLiquidity("output exceeds curve base"));
            }
            mul_div(ls, s, ls - consumed, Rounding::Down)
                .map(Dec::from_raw)
                .ok_or(AmmError::Overflow("square-root price overflow"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        let Ok(d) = s.parse::<Dec>() else {
            panic!("valid decimal literal {s}");
        };
        d
    }

    // -- Amount deltas ------------------------------------------------------

    #[test]
    fn amount1_is_liquidity_times_sqrt_span() {
        let r = amount1_delta(Dec::ONE, Dec::from_int(2), Liquidity::new(1_000), Rounding::Down);
        assert_eq!(r, Ok(Amount::new(1_000)));
        let swapped = amount1_delta(Dec::from_int(2), Dec::ONE, Liquidity::new(1_000), Rounding::Down);
        assert_eq!(swapped, Ok(Amount::new(1_000)));
    }

    #[test]
    fn amount0_is_liquidity_over_sqrt_product() {
        // 1000 × (2 − 1) / (1 × 2) = 500
        let r = amount0_delta(Dec::ONE, Dec::from_int(2), Liquidity::new(1_000), Rounding::Down);
        assert_eq!(r, Ok(Amount::new(500)));
    }

    #[test]
    fn rounding_direction_is_respected() {
        // 1000 × (3 − 1) / 3 = 666.67
        let down = amount0_delta(Dec::ONE, Dec::from_int(3), Liquidity::new(1_000), Rounding::Down);
        let up = amount0_delta(Dec::ONE, Dec::from_int(3), Liquidity::new(1_000), Rounding::Up);
        assert_eq!(down, Ok(Amount::new(666)));
        assert_eq!(up, Ok(Amount::new(667)));
    }

    #[test]
    fn zero_span_is_zero() {
        let s = dec("2.236067977499789696");
        assert_eq!(amount0_delta(s, s, Liquidity::new(99), Rounding::Up), Ok(Amount::ZERO));
        assert_eq!(amount1_delta(s, s, Liquidity::new(99), Rounding::Up), Ok(Amount::ZERO));
    }

    // -- Liquidity for amounts ---------------------------------------------

    #[test]
    fn below_range_uses_only_amount0() {
        let l = liquidity_for_amounts(
            Dec::ONE,
            Dec::ONE,
            Dec::from_int(2),
            Amount::new(500),
            Amount::new(123),
        );
        assert_eq!(l, Ok(Liquidity::new(1_000)));
    }

    #[test]
    fn above_range_uses_only_amount1() {
        let l = liquidity_for_amounts(
            Dec::from_int(3),
            Dec::ONE,
            Dec::from_int(2),
            Amount::new(7),
            Amount::new(1_000),
        );
        assert_eq!(l, Ok(Liquidity::new(1_000)));
    }

    #[test]
    fn inside_range_takes_minimum() {
        let current = dec("1.5");
        let Ok(l) = liquidity_for_amounts(
            current,
            Dec::ONE,
            Dec::from_int(2),
            Amount::new(1_000_000),
            Amount::new(10),
        ) else {
            panic!("expected Ok");
        };
        // amount1 side: 10 / 0.5 = 20
        assert_eq!(l, Liquidity::new(20));
    }

    #[test]
    fn empty_range_is_error() {
        let r = liquidity_for_amounts(Dec::ONE, Dec::from_int(2), Dec::from_int(2), Amount::new(1), Amount::new(1));
        assert!(matches!(r, Err(AmmError::InvalidTickRange(_))));
    }

    #[test]
    fn amounts_for_minted_liquidity_never_exceed_desired() {
        let current = dec("2.236067977499789696");
        let lower = dec("2.121320343559642573");
        let upper = dec("2.345207879911715107");
        let (d0, d1) = (Amount::new(100), Amount::new(500));
        let Ok(l) = liquidity_for_amounts(current, lower, upper, d0, d1) else {
            panic!("expected Ok");
        };
        assert!(!l.is_zero());
        let Ok((a0, a1)) = amounts_for_liquidity(current, lower, upper, l, Rounding::Up) else {
            panic!("expected Ok");
        };
        assert!(a0 <= d0);
        assert!(a1 <= d1);
    }

    // -- next_sqrt_price_from_output ---------------------------------------

    #[test]
    fn buy_output_lowers_price() {
        // L = 1000, √p = 2, pay 500 quote → √p' = 1.5
        let r = next_sqrt_price_from_output(Dec::from_int(2), Liquidity::new(1_000), Amount::new(500), OrderSide::Buy);
        assert_eq!(r, Ok(dec("1.5")));
    }

    #[test]
    fn sell_output_raises_price() {
        // L = 1000, √p = 1, pay 500 base → √p' = 1000 / 500 = 2
        let r = next_sqrt_price_from_output(Dec::ONE, Liquidity::new(1_000), Amount::new(500), OrderSide::Sell);
        assert_eq!(r, Ok(Dec::from_int(2)));
    }

    #[test]
    fn output_beyond_curve_is_error() {
        let r = next_sqrt_price_from_output(Dec::ONE, Liquidity::new(1_000), Amount::new(1_000), OrderSide::Sell);
        assert!(matches!(r, Err(AmmError::InsufficientLiquidity(_))));
        let r = next_sqrt_price_from_output(Dec::ONE, Liquidity::ZERO, Amount::new(1), OrderSide::Buy);
        assert!(matches!(r, Err(AmmError::InsufficientLiquidity(_))));
    }

    #[test]
    fn solved_price_does_not_overshoot() {
        let start = dec("2.236067977499789696");
        let l = Liquidity::new(1_234_567);
        let paid = Amount::new(777);
        let Ok(next) = next_sqrt_price_from_output(start, l, paid, OrderSide::Sell) else {
            panic!("expected Ok");
        };
        let Ok(released) = amount0_delta(start, next, l, Rounding::Down) else {
            panic!("expected Ok");
        };
        assert!(released <= paid);
    }
}

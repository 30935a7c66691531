//! Tick-to-price and price-to-tick conversion on the decimal tick grid.
//!
//! Prices are quantised to five significant digits.  Each decade of price
//! holds `9 × 10^4` ticks:
//!
//! ```text
//! q = ⌊t / 90 000⌋
//! r = t mod 90 000
//! price(t) = (10^4 + r) × 10^(q − 4)
//! ```
//!
//! so tick `0` is price `1`, tick `1` is `1.0001`, tick `90 000` is `10`
//! and tick `90 001` is `10.001`.  Unlike a geometric `1.0001^t` grid
//! every tick price is an exact [`Dec`], which keeps the order book's
//! price levels human-readable and all conversions bit-exact.
//!
//! # Functions
//!
//! - [`price_at_tick`] / [`tick_at_price`]: exact price of a tick and the
//!   greatest tick whose price ≤ a given price.
//! - [`sqrt_price_at_tick`] / [`tick_at_sqrt_price`]: the same on the
//!   square-root scale used by the liquidity formulas.
//! - [`round_price_to_tick`]: snaps an arbitrary price onto the grid.
//!
//! # Examples
//!
//! ```
//! use tidal_amm::domain::Tick;
//! use tidal_amm::math::{price_at_tick, sqrt_price_at_tick, tick_at_sqrt_price};
//!
//! let tick = Tick::new(40_000).expect("in range");
//! assert_eq!(price_at_tick(tick).map(|p| p.to_string()), Ok("5.000000000000000000".into()));
//!
//! let sqrt = sqrt_price_at_tick(tick).expect("valid tick");
//! assert_eq!(tick_at_sqrt_price(sqrt), Ok(tick));
//! ```

use primitive_types::U256;

use crate::domain::{Dec, Rounding, Tick};
use crate::error::{AmmError, Result};

/// Number of significant digits after the leading one in a tick price.
pub const TICK_PRECISION: u32 = 4;

/// Ticks per decade of price.
const TICKS_PER_DECADE: i32 = 90_000;

/// `10^TICK_PRECISION`.
const MANTISSA_BASE: i32 = 10_000;

/// Computes the exact price at a tick.
///
/// # Errors
///
/// Returns [`AmmError::Overflow`] only if the tick grid constants are
/// inconsistent with [`Dec`]'s range, which cannot happen for a valid
/// [`Tick`].
pub fn price_at_tick(tick: Tick) -> Result<Dec> {
    let t = tick.get();
    let q = t.div_euclid(TICKS_PER_DECADE);
    let r = t.rem_euclid(TICKS_PER_DECADE);
    #[allow(clippy::cast_sign_loss)]
    let mantissa = (MANTISSA_BASE + r) as u128;
    Dec::pow10(q - TICK_PRECISION as i32)?.mul_int(mantissa)
}

/// Smallest representable price (`10^-14`).
///
/// # Errors
///
/// See [`price_at_tick`].
pub fn min_price() -> Result<Dec> {
    price_at_tick(Tick::MIN)
}

/// Largest representable price (`10^24`).
///
/// # Errors
///
/// See [`price_at_tick`].
pub fn max_price() -> Result<Dec> {
    price_at_tick(Tick::MAX)
}

/// Returns the greatest tick whose price is ≤ `price`.
///
/// # Errors
///
/// Returns [`AmmError::InvalidPrice`] if `price` is outside
/// `[min_price, max_price]`.
pub fn tick_at_price(price: Dec) -> Result<Tick> {
    if price < min_price()? || price > max_price()? {
        return Err(AmmError::InvalidPrice("price out of tick range"));
    }
    // At least 5 digits: min price 10^-14 has raw value 10^4.
    let digits = price.raw_digits();
    let divisor = U256::exp10((digits - (TICK_PRECISION + 1)) as usize);
    let mantissa = i32::try_from((price.raw() / divisor).low_u64())
        .map_err(|_| AmmError::Invariant("tick mantissa out of range"))?;
    #[allow(clippy::cast_possible_wrap)]
    let exponent = digits as i32 - 1 - crate::domain::DEC_PRECISION as i32;
    let t = exponent
        .checked_mul(TICKS_PER_DECADE)
        .and_then(|v| v.checked_add(mantissa - MANTISSA_BASE))
        .ok_or(AmmError::Overflow("tick computation overflow"))?;
    Tick::new(t)
}

/// Snaps `price` onto the tick grid: [`Rounding::Down`] gives the
/// greatest tick with price ≤ `price`, [`Rounding::Up`] the least tick
/// with price ≥ `price`.
///
/// # Errors
///
/// Returns [`AmmError::InvalidPrice`] if `price` is outside the tick
/// range.
pub fn round_price_to_tick(price: Dec, rounding: Rounding) -> Result<Tick> {
    let tick = tick_at_price(price)?;
    if rounding.is_up() && price_at_tick(tick)? != price {
        return tick
            .checked_add(1)
            .ok_or(AmmError::InvalidPrice("price out of tick range"));
    }
    Ok(tick)
}

/// Square root of the tick price, truncated to 18 fractional digits.
///
/// # Errors
///
/// See [`price_at_tick`].
pub fn sqrt_price_at_tick(tick: Tick) -> Result<Dec> {
    price_at_tick(tick)?.sqrt()
}

/// Returns the greatest tick whose [`sqrt_price_at_tick`] is ≤
/// `sqrt_price`.
///
/// Because [`sqrt_price_at_tick`] truncates, this is an exact inverse:
/// `tick_at_sqrt_price(sqrt_price_at_tick(t)) == t` for every valid `t`.
///
/// # Errors
///
/// Returns [`AmmError::InvalidPrice`] if `sqrt_price` squared lies
/// outside the tick range.
pub fn tick_at_sqrt_price(sqrt_price: Dec) -> Result<Tick> {
    let price = sqrt_price.mul(&sqrt_price, Rounding::Down)?;
    let mut tick = tick_at_price(price)?;
    // `price` is truncated, so the candidate can trail by a few ticks.
    while let Some(next) = tick.checked_add(1) {
        if sqrt_price_at_tick(next)? > sqrt_price {
            break;
        }
        tick = next;
    }
    Ok(tick)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn tick(v: i32) -> Tick {
        let Ok(t) = Tick::new(v) else {
            panic!("valid tick expected");
        };
        t
    }

    fn dec(s: &str) -> Dec {
        let Ok(d) = s.parse::<Dec>() else {
            panic!("valid decimal literal {s}");
        };
        d
    }

    // -- price_at_tick ------------------------------------------------------

    #[test]
    fn known_prices() {
        assert_eq!(price_at_tick(Tick::ZERO), Ok(Dec::ONE));
        assert_eq!(price_at_tick(tick(1)), Ok(dec("1.0001")));
        assert_eq!(price_at_tick(tick(35_000)), Ok(dec("4.5")));
        assert_eq!(price_at_tick(tick(40_000)), Ok(dec("5")));
        assert_eq!(price_at_tick(tick(45_000)), Ok(dec("5.5")));
        assert_eq!(price_at_tick(tick(90_001)), Ok(dec("10.001")));
        assert_eq!(price_at_tick(tick(-1)), Ok(dec("0.99999")));
        assert_eq!(price_at_tick(tick(-90_000)), Ok(dec("0.1")));
    }

    #[test]
    fn range_ends() {
        assert_eq!(min_price(), Ok(dec("0.00000000000001")));
        assert_eq!(max_price(), Dec::pow10(24));
    }

    // -- tick_at_price ------------------------------------------------------

    #[test]
    fn tick_at_price_floors() {
        assert_eq!(tick_at_price(dec("5")), Ok(tick(40_000)));
        assert_eq!(tick_at_price(dec("5.00005")), Ok(tick(40_000)));
        assert_eq!(tick_at_price(dec("0.999999")), Ok(tick(-1)));
        assert_eq!(tick_at_price(dec("123.456")), Ok(tick(2 * 90_000 + 2_345)));
    }

    #[test]
    fn tick_at_price_out_of_range() {
        assert!(tick_at_price(Dec::ZERO).is_err());
        let Ok(too_big) = Dec::pow10(25) else {
            panic!("representable");
        };
        assert!(tick_at_price(too_big).is_err());
    }

    #[test]
    fn round_price_directions() {
        assert_eq!(round_price_to_tick(dec("5.00005"), Rounding::Down), Ok(tick(40_000)));
        assert_eq!(round_price_to_tick(dec("5.00005"), Rounding::Up), Ok(tick(40_001)));
        assert_eq!(round_price_to_tick(dec("5"), Rounding::Up), Ok(tick(40_000)));
    }

    // -- sqrt ---------------------------------------------------------------

    #[test]
    fn sqrt_round_trip_at_edges() {
        for t in [
            Tick::MIN.get(),
            Tick::MIN.get() + 1,
            -1,
            0,
            1,
            40_000,
            89_999,
            90_000,
            Tick::MAX.get() - 1,
            Tick::MAX.get(),
        ] {
            let Ok(s) = sqrt_price_at_tick(tick(t)) else {
                panic!("sqrt price for {t}");
            };
            assert_eq!(tick_at_sqrt_price(s), Ok(tick(t)), "round trip at {t}");
        }
    }

    #[test]
    fn sqrt_is_monotonic_nearby() {
        let Ok(a) = sqrt_price_at_tick(tick(40_000)) else {
            panic!("sqrt");
        };
        let Ok(b) = sqrt_price_at_tick(tick(40_001)) else {
            panic!("sqrt");
        };
        assert!(a < b);
    }

    #[test]
    fn sqrt_between_ticks_floors() {
        let Ok(s) = dec("5.2").sqrt() else {
            panic!("sqrt");
        };
        assert_eq!(tick_at_sqrt_price(s), Ok(tick(42_000)));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sqrt_price_round_trip(t in -1_260_000i32..=2_160_000) {
                let tick = tick(t);
                let sqrt = sqrt_price_at_tick(tick);
                prop_assert!(sqrt.is_ok());
                if let Ok(s) = sqrt {
                    prop_assert_eq!(tick_at_sqrt_price(s), Ok(tick));
                }
            }

            #[test]
            fn price_round_trip(t in -1_260_000i32..=2_160_000) {
                let tick = tick(t);
                let price = price_at_tick(tick);
                prop_assert!(price.is_ok());
                if let Ok(p) = price {
                    prop_assert_eq!(tick_at_price(p), Ok(tick));
                }
            }

            #[test]
            fn prices_strictly_increase(t in -1_260_000i32..2_160_000) {
                let lo = price_at_tick(tick(t));
                let hi = price_at_tick(tick(t + 1));
                prop_assert!(matches!((lo, hi), (Ok(a), Ok(b)) if a < b));
            }
        }
    }
}

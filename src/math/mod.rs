//! Fixed-point math for concentrated liquidity.
//!
//! Stateless, bit-exact functions over [`Dec`](crate::domain::Dec) and the
//! integer quantity types: rounding helpers, the decimal tick grid and
//! the liquidity/amount formulas.  There is no floating point in this
//! module; every lossy step names its [`Rounding`](crate::domain::Rounding).

mod checked;
mod liquidity_math;
mod rounding;
mod tick_math;

pub use checked::CheckedArithmetic;
pub use liquidity_math::{
    amount0_delta, amount1_delta, amounts_for_liquidity, liquidity_for_amount0,
    liquidity_for_amount1, liquidity_for_amounts, next_sqrt_price_from_output,
};
pub use rounding::{div_round, div_round_wide, mul_div};
pub use tick_math::{
    max_price, min_price, price_at_tick, round_price_to_tick, sqrt_price_at_tick, tick_at_price,
    tick_at_sqrt_price, TICK_PRECISION,
};

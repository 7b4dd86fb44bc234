//! Q96 fixed-point helpers.
//!
//! All intermediate products are taken in 512 bits so nothing is lost before
//! the final division. Results that do not fit back into 256 bits are
//! reported as [`MathError::Overflow`] instead of wrapping.

use alloy::primitives::{U256, U512};
use thiserror::Error;

/// Number of fractional bits in a Q96 value.
pub const RESOLUTION: usize = 96;

/// 2^96.
pub const Q96: U256 = U256::from_limbs([0, 1 << (RESOLUTION - 64), 0, 0]);

/// Emission units released over an auction's whole lifetime.
pub const MPS_TOTAL: u32 = 10_000_000;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("overflow")]
    Overflow,

    #[error("underflow")]
    Underflow,

    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Down,
    Up,
}

pub fn widen(value: U256) -> U512 {
    U512::from_limbs_slice(value.as_limbs())
}

pub fn narrow(value: U512) -> Result<U256, MathError> {
    let limbs = value.as_limbs();
    if limbs[4..].iter().any(|limb| *limb != 0) {
        return Err(MathError::Overflow);
    }
    Ok(U256::from_limbs([limbs[0], limbs[1], limbs[2], limbs[3]]))
}

/// `a * b / denominator` in 512-bit precision.
pub fn wide_mul_div(
    a: U512,
    b: U512,
    denominator: U512,
    rounding: Rounding,
) -> Result<U512, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(MathError::Overflow)?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Down => Ok(quotient),
        Rounding::Up if (product % denominator).is_zero() => Ok(quotient),
        Rounding::Up => quotient.checked_add(U512::from(1u8)).ok_or(MathError::Overflow),
    }
}

/// `a * b / denominator`, truncated.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    narrow(wide_mul_div(widen(a), widen(b), widen(denominator), Rounding::Down)?)
}

/// `a * b / denominator`, rounded up.
pub fn mul_div_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    narrow(wide_mul_div(widen(a), widen(b), widen(denominator), Rounding::Up)?)
}

/// Drops the fractional bits of a Q96 value.
pub fn q96_to_int(value: U256) -> U256 {
    value >> RESOLUTION
}

pub fn int_to_q96(value: U256) -> Result<U256, MathError> {
    value.checked_shl(RESOLUTION).ok_or(MathError::Overflow)
}

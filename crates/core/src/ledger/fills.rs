//! Fill reconstruction for bids against the checkpoint series.
//!
//! Fills are cumulative values measured from the bid's submission checkpoint,
//! so each checkpoint recomputes them from scratch rather than adding
//! truncated deltas.

use alloy::primitives::{U256, U512};

use crate::{
    math::{self, MathError, Q96, RESOLUTION, Rounding, widen},
    types::{
        checkpoint::Checkpoint,
        primitives::{BidId, BlockNumber, CurrencyAmount, Price, TokenAmount},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub tokens: TokenAmount,
    pub currency: CurrencyAmount,
}

impl Fill {
    pub const ZERO: Self = Self {
        tokens: TokenAmount::ZERO,
        currency: CurrencyAmount::ZERO,
    };
}

/// New fill state for one bid, produced while a checkpoint is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillUpdate {
    pub bid: BidId,
    pub fill: Fill,
    /// Set for bids still clearing above the price.
    pub fully_filled_through: Option<BlockNumber>,
}

fn remaining_mps(start: &Checkpoint) -> Result<U512, MathError> {
    let remaining = start.remaining_mps().as_u32();
    if remaining == 0 {
        return Err(MathError::DivisionByZero);
    }
    Ok(U512::from(remaining))
}

/// Tokens and currency for a bid that cleared fully between `start` and
/// `end`. Currency is only charged when at least one token was bought.
pub fn fully_filled(
    amount: CurrencyAmount,
    start: &Checkpoint,
    end: &Checkpoint,
) -> Result<Fill, MathError> {
    let mps_remaining = remaining_mps(start)?;
    let mps_per_price_delta = end
        .cumulative_mps_per_price
        .checked_sub(start.cumulative_mps_per_price)
        .ok_or(MathError::Underflow)?;
    let mps_delta = end
        .cumulative_mps
        .as_u32()
        .checked_sub(start.cumulative_mps.as_u32())
        .ok_or(MathError::Underflow)?;

    let amount = widen(amount.as_u256());
    let tokens = math::narrow(math::wide_mul_div(
        amount,
        widen(mps_per_price_delta),
        widen(Q96) * mps_remaining,
        Rounding::Down,
    )?)?;

    if tokens.is_zero() {
        return Ok(Fill::ZERO);
    }

    let currency = math::narrow(math::wide_mul_div(
        amount,
        U512::from(mps_delta),
        mps_remaining,
        Rounding::Down,
    )?)?;

    Ok(Fill {
        tokens: TokenAmount::new(tokens),
        currency: CurrencyAmount::new(currency),
    })
}

/// Fill for a bid sitting exactly at the clearing price.
///
/// The bid is fully filled from `start` up to `last_below`, the last
/// checkpoint that cleared under its price, and then receives a pro-rata
/// share of the currency raised at the clearing price, weighted by
/// `amount / demand`. The currency share rounds up, the token share down.
pub fn partially_filled(
    amount: CurrencyAmount,
    max_price: Price,
    start: &Checkpoint,
    last_below: &Checkpoint,
    at_price: &Checkpoint,
    tick_demand_q96: U256,
) -> Result<Fill, MathError> {
    let base = fully_filled(amount, start, last_below)?;

    let denominator = widen(tick_demand_q96)
        .checked_mul(remaining_mps(start)?)
        .ok_or(MathError::Overflow)?;
    let raised_x7 = widen(at_price.currency_raised_at_clearing_price_x7);

    let partial_currency = math::narrow(math::wide_mul_div(
        widen(amount.as_u256()),
        raised_x7,
        denominator,
        Rounding::Up,
    )?)?;

    let amount_q96 = widen(amount.as_u256())
        .checked_shl(RESOLUTION)
        .ok_or(MathError::Overflow)?;
    let partial_tokens_q96 =
        math::wide_mul_div(amount_q96, raised_x7, denominator, Rounding::Down)?;
    if max_price.as_u256().is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let partial_tokens = math::narrow(partial_tokens_q96 / widen(max_price.as_u256()))?;

    Ok(Fill {
        tokens: TokenAmount::new(
            base.tokens
                .as_u256()
                .checked_add(partial_tokens)
                .ok_or(MathError::Overflow)?,
        ),
        currency: CurrencyAmount::new(
            base.currency
                .as_u256()
                .checked_add(partial_currency)
                .ok_or(MathError::Overflow)?,
        ),
    })
}

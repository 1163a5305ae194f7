//! Integer decay primitives.
//!
//! The rate of epoch `e` is obtained from epoch `e - 1` by one floor-division
//! step. Closed-form exponentiation with a single final truncation drifts
//! from this by a few units after enough epochs, so the loop is deliberate.

use trickle_core::error::ScheduleError;
use trickle_core::types::Amount;

/// Apply one epoch of decay: `floor(rate * (den - num) / den)`.
///
/// Requires `num < den` (validated by the schedule setters).
pub fn decay_once(rate: Amount, numerator: u128, denominator: u128) -> Result<Amount, ScheduleError> {
    if numerator == 0 {
        return Ok(rate);
    }
    let retained = denominator
        .checked_sub(numerator)
        .ok_or(ScheduleError::InvalidDecayRate { numerator, denominator })?;
    Ok(rate
        .checked_mul(retained)
        .ok_or(ScheduleError::ArithmeticOverflow)?
        / denominator)
}

/// Apply [`decay_once`] `epochs` times, stopping early once the rate is zero.
pub fn compound(
    rate: Amount,
    numerator: u128,
    denominator: u128,
    epochs: u64,
) -> Result<Amount, ScheduleError> {
    if numerator == 0 {
        return Ok(rate);
    }
    let mut rate = rate;
    for _ in 0..epochs {
        if rate == 0 {
            break;
        }
        rate = decay_once(rate, numerator, denominator)?;
    }
    Ok(rate)
}

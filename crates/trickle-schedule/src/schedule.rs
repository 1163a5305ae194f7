//! Emission schedule and epoch logic.
//!
//! The emission rate starts at `base_rate` per step and decays once per epoch
//! of `period_length` steps counted from `epoch_anchor`:
//!
//! - Steps `..= anchor + period`: epoch 0, `base_rate`
//! - Steps `anchor + period + 1 ..= anchor + 2 * period`: epoch 1, one decay
//! - …
//!
//! A `period_length` of zero (or a zero decay numerator) disables decay.
//! Parameters are owner-mutable and take effect immediately; past ranges are
//! never recomputed.

use serde::{Deserialize, Serialize};
use tracing::info;
use trickle_core::constants::{
    DEFAULT_BASE_RATE, DEFAULT_DECAY_DENOMINATOR, DEFAULT_DECAY_NUMERATOR, DEFAULT_EPOCH_ANCHOR,
    DEFAULT_PERIOD_LENGTH,
};
use trickle_core::error::ScheduleError;
use trickle_core::types::{AccountId, Amount, Step};

use crate::decay::{compound, decay_once};

/// The five persisted schedule parameters.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode,
)]
#[serde(default)]
pub struct ScheduleParams {
    /// Emission per step at epoch 0, in base units.
    pub base_rate: Amount,
    /// Steps per decay epoch; `0` disables decay.
    pub period_length: u64,
    /// Decay factor is `(decay_denominator - decay_numerator) / decay_denominator`.
    pub decay_numerator: u128,
    pub decay_denominator: u128,
    /// Step at which epoch counting begins.
    pub epoch_anchor: Step,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            base_rate: DEFAULT_BASE_RATE,
            period_length: DEFAULT_PERIOD_LENGTH,
            decay_numerator: DEFAULT_DECAY_NUMERATOR,
            decay_denominator: DEFAULT_DECAY_DENOMINATOR,
            epoch_anchor: DEFAULT_EPOCH_ANCHOR,
        }
    }
}

impl ScheduleParams {
    /// Check the parameter invariants.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::InvalidParameter`] if the denominator is zero or
    ///   `base_rate * decay_denominator` does not fit in a u128
    /// - [`ScheduleError::InvalidDecayRate`] unless `decay_numerator < decay_denominator`
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.decay_denominator == 0 {
            return Err(ScheduleError::InvalidParameter(
                "decay_denominator must be positive".to_string(),
            ));
        }
        if self.decay_numerator >= self.decay_denominator {
            return Err(ScheduleError::InvalidDecayRate {
                numerator: self.decay_numerator,
                denominator: self.decay_denominator,
            });
        }
        // Rates only shrink, so this bounds every intermediate product.
        if self.base_rate.checked_mul(self.decay_denominator).is_none() {
            return Err(ScheduleError::InvalidParameter(format!(
                "base_rate {} too large for decay_denominator {}",
                self.base_rate, self.decay_denominator
            )));
        }
        Ok(())
    }

    /// Whether the rate ever changes.
    pub fn decays(&self) -> bool {
        self.period_length > 0 && self.decay_numerator > 0
    }
}

/// Owner-tunable emission schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmissionSchedule {
    owner: AccountId,
    params: ScheduleParams,
}

impl EmissionSchedule {
    /// Create a schedule owned by `owner`.
    ///
    /// # Errors
    ///
    /// Any error from [`ScheduleParams::validate`].
    pub fn new(owner: AccountId, params: ScheduleParams) -> Result<Self, ScheduleError> {
        params.validate()?;
        Ok(Self { owner, params })
    }

    /// Schedule with [`ScheduleParams::default`] and the given base rate.
    pub fn with_base_rate(owner: AccountId, base_rate: Amount) -> Result<Self, ScheduleError> {
        Self::new(
            owner,
            ScheduleParams {
                base_rate,
                ..ScheduleParams::default()
            },
        )
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn params(&self) -> &ScheduleParams {
        &self.params
    }

    /// Which epoch a step falls in.
    ///
    /// Steps at or before the anchor are epoch 0, as is every step when decay
    /// is disabled by a zero period.
    pub fn epoch(&self, step: Step) -> u64 {
        let p = &self.params;
        if p.period_length == 0 || step <= p.epoch_anchor {
            return 0;
        }
        (step - p.epoch_anchor - 1) / p.period_length
    }

    /// The last step belonging to `epoch`, or `None` when epochs never end.
    ///
    /// Saturates at `u64::MAX` for epochs beyond the representable range.
    pub fn epoch_last_step(&self, epoch: u64) -> Option<Step> {
        let p = &self.params;
        if p.period_length == 0 {
            return None;
        }
        Some(
            epoch
                .saturating_add(1)
                .saturating_mul(p.period_length)
                .saturating_add(p.epoch_anchor),
        )
    }

    /// Emission rate for a whole epoch: `base_rate` decayed `epoch` times.
    pub fn rate_for_epoch(&self, epoch: u64) -> Result<Amount, ScheduleError> {
        let p = &self.params;
        if !p.decays() {
            return Ok(p.base_rate);
        }
        compound(p.base_rate, p.decay_numerator, p.decay_denominator, epoch)
    }

    /// Emission rate at a single step.
    pub fn rate_at(&self, step: Step) -> Result<Amount, ScheduleError> {
        self.rate_for_epoch(self.epoch(step))
    }

    /// Total emission over the steps `(from, to]`.
    ///
    /// `current` is the host's present step; asking for emission past it is a
    /// caller bug. An empty range (`to <= from`) emits nothing.
    ///
    /// Walks one segment per epoch touched: the partial first epoch, every
    /// whole epoch in between and the partial last epoch, carrying the rate
    /// forward with one decay step per boundary. Stops once the rate reaches
    /// zero since every later epoch is zero as well.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::RangeOverflow`] if `to > current`
    /// - [`ScheduleError::ArithmeticOverflow`] if the total exceeds u128
    pub fn cumulative_emission(
        &self,
        from: Step,
        to: Step,
        current: Step,
    ) -> Result<Amount, ScheduleError> {
        if to > current {
            return Err(ScheduleError::RangeOverflow { to, current });
        }
        if to <= from {
            return Ok(0);
        }

        let p = &self.params;
        if !p.decays() {
            return u128::from(to - from)
                .checked_mul(p.base_rate)
                .ok_or(ScheduleError::ArithmeticOverflow);
        }

        let mut epoch = self.epoch(from + 1);
        let mut rate = self.rate_for_epoch(epoch)?;
        let mut cursor = from;
        let mut total: Amount = 0;

        while cursor < to && rate > 0 {
            let segment_end = self.epoch_last_step(epoch).map_or(to, |last| last.min(to));
            let steps = u128::from(segment_end - cursor);
            let segment = steps
                .checked_mul(rate)
                .ok_or(ScheduleError::ArithmeticOverflow)?;
            total = total
                .checked_add(segment)
                .ok_or(ScheduleError::ArithmeticOverflow)?;
            cursor = segment_end;
            epoch = epoch.saturating_add(1);
            rate = decay_once(rate, p.decay_numerator, p.decay_denominator)?;
        }

        Ok(total)
    }

    /// Steps remaining until the rate next changes, counted from `step`.
    ///
    /// Returns `None` when the rate never changes again.
    pub fn steps_until_decay(&self, step: Step) -> Result<Option<u64>, ScheduleError> {
        if !self.params.decays() || self.rate_at(step)? == 0 {
            return Ok(None);
        }
        Ok(self
            .epoch_last_step(self.epoch(step))
            .map(|last| last - step + 1))
    }

    pub fn set_base_rate(&mut self, caller: &AccountId, base_rate: Amount) -> Result<(), ScheduleError> {
        self.update(caller, "base_rate", |p| p.base_rate = base_rate)
    }

    pub fn set_period_length(&mut self, caller: &AccountId, period_length: u64) -> Result<(), ScheduleError> {
        self.update(caller, "period_length", |p| p.period_length = period_length)
    }

    pub fn set_decay_numerator(&mut self, caller: &AccountId, numerator: u128) -> Result<(), ScheduleError> {
        self.update(caller, "decay_numerator", |p| p.decay_numerator = numerator)
    }

    pub fn set_decay_denominator(&mut self, caller: &AccountId, denominator: u128) -> Result<(), ScheduleError> {
        self.update(caller, "decay_denominator", |p| p.decay_denominator = denominator)
    }

    pub fn set_epoch_anchor(&mut self, caller: &AccountId, anchor: Step) -> Result<(), ScheduleError> {
        self.update(caller, "epoch_anchor", |p| p.epoch_anchor = anchor)
    }

    /// Replace every parameter at once, validating only the combined result.
    pub fn set_params(&mut self, caller: &AccountId, params: ScheduleParams) -> Result<(), ScheduleError> {
        self.update(caller, "all", |p| *p = params)
    }

    /// Hand the schedule to a new owner.
    pub fn transfer_ownership(&mut self, caller: &AccountId, new_owner: AccountId) -> Result<(), ScheduleError> {
        self.ensure_owner(caller)?;
        info!(from = %caller.short(), to = %new_owner.short(), "schedule ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    fn ensure_owner(&self, caller: &AccountId) -> Result<(), ScheduleError> {
        if *caller != self.owner {
            return Err(ScheduleError::Unauthorized);
        }
        Ok(())
    }

    /// Apply a parameter change to a copy, validate it, then commit.
    fn update(
        &mut self,
        caller: &AccountId,
        field: &'static str,
        apply: impl FnOnce(&mut ScheduleParams),
    ) -> Result<(), ScheduleError> {
        self.ensure_owner(caller)?;
        let mut next = self.params.clone();
        apply(&mut next);
        next.validate()?;
        self.params = next;
        info!(field, params = ?self.params, "schedule parameter updated");
        Ok(())
    }
}

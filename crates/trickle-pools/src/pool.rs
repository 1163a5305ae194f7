//! Pool and position records plus the accumulator arithmetic.
//!
//! A pool's `acc_reward_per_unit` is the reward owed to one staked base unit
//! since the pool was created, scaled by [`ACC_PRECISION`]. A position stores
//! `settled_debt = staked * acc / ACC_PRECISION` as of its last interaction,
//! so what it is owed at any later accumulator value is the difference.

use serde::{Deserialize, Serialize};
use trickle_core::constants::{ACC_PRECISION, STAKING_POOL_ID};
use trickle_core::error::PoolError;
use trickle_core::types::{Amount, AssetId, PoolId, Step};

/// One weighted staking pool.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode,
)]
pub struct PoolInfo {
    /// Arena index, assigned at creation and never reused.
    pub id: PoolId,
    /// Asset participants stake. Unique across pools.
    pub stake_asset: AssetId,
    /// Share of the emission is `weight / total_weight`.
    pub weight: u64,
    /// Emission up to and including this step has been folded into `acc`.
    pub last_settled_step: Step,
    /// Reward per staked unit, scaled by [`ACC_PRECISION`]. Never decreases.
    pub acc_reward_per_unit: u128,
    /// Sum of every position's `staked` in this pool.
    pub total_staked: Amount,
}

impl PoolInfo {
    pub fn new(id: PoolId, stake_asset: AssetId, weight: u64, start: Step) -> Self {
        Self {
            id,
            stake_asset,
            weight,
            last_settled_step: start,
            acc_reward_per_unit: 0,
            total_staked: 0,
        }
    }

    /// Pool 0 stakes the reward asset itself.
    pub fn is_staking_pool(&self) -> bool {
        self.id == STAKING_POOL_ID
    }
}

/// A participant's stake in one pool.
#[derive(
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Position {
    pub staked: Amount,
    /// `staked * acc / ACC_PRECISION` at the last interaction.
    pub settled_debt: Amount,
}

impl Position {
    /// Reward owed at accumulator value `acc`.
    ///
    /// # Errors
    ///
    /// - [`PoolError::ArithmeticOverflow`] if `staked * acc` overflows
    /// - [`PoolError::CorruptedState`] if the debt exceeds what is accrued,
    ///   which the accounting never produces
    pub fn pending(&self, acc: u128) -> Result<Amount, PoolError> {
        accrued(self.staked, acc)?
            .checked_sub(self.settled_debt)
            .ok_or_else(|| {
                PoolError::CorruptedState(format!(
                    "settled debt {} exceeds accrued reward",
                    self.settled_debt
                ))
            })
    }

    pub fn is_empty(&self) -> bool {
        self.staked == 0 && self.settled_debt == 0
    }
}

/// `staked * acc / ACC_PRECISION`, floored.
pub fn accrued(staked: Amount, acc: u128) -> Result<Amount, PoolError> {
    Ok(staked
        .checked_mul(acc)
        .ok_or(PoolError::ArithmeticOverflow)?
        / ACC_PRECISION)
}

/// The outcome of folding `(from, to]` into one pool.
///
/// Computed without touching state, then committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub pool: PoolId,
    /// `last_settled_step` before.
    pub from: Step,
    /// `last_settled_step` after. Equal to `from` for a no-op.
    pub to: Step,
    /// Total schedule emission over `(from, to]`, before the weight split.
    pub emission: Amount,
    /// Pool share minted into custody.
    pub minted: Amount,
    /// Pool share dropped because nothing was staked.
    pub forfeited: Amount,
    /// Accumulator value after the settlement.
    pub acc_after: u128,
}

impl Settlement {
    /// A settlement that changes nothing.
    pub fn noop(pool: &PoolInfo) -> Self {
        Self {
            pool: pool.id,
            from: pool.last_settled_step,
            to: pool.last_settled_step,
            emission: 0,
            minted: 0,
            forfeited: 0,
            acc_after: pool.acc_reward_per_unit,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.to <= self.from
    }

    /// The same range with nothing minted and the accumulator left at `acc`.
    pub fn forfeiting(self, acc: u128) -> Self {
        Self {
            forfeited: self.forfeited.saturating_add(self.minted),
            minted: 0,
            acc_after: acc,
            ..self
        }
    }
}

//! Persisted distributor layout: snapshot, validation and restore.
//!
//! The layout holds the schedule's five parameters, the append-only pool
//! arena and every `(pool, account)` position. Events and the ledger are not
//! part of it; the ledger is persisted by whoever owns it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;
use trickle_core::error::{PoolError, TrickleError};
use trickle_core::traits::{MinterCapability, TokenLedger};
use trickle_core::types::{AccountId, PoolId, Step};
use trickle_schedule::{EmissionSchedule, ScheduleParams};

use crate::distributor::PoolDistributor;
use crate::pool::{PoolInfo, Position};

/// One entry of the position mapping.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode,
)]
pub struct PositionRecord {
    pub pool: PoolId,
    pub account: AccountId,
    pub position: Position,
}

/// Everything needed to rebuild a [`PoolDistributor`] over the same ledger.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode,
)]
pub struct DistributorState {
    pub owner: AccountId,
    pub custody: AccountId,
    pub schedule: ScheduleParams,
    pub start_step: Step,
    pub staking_weight_divisor: Option<u64>,
    pub pools: Vec<PoolInfo>,
    /// Sorted by `(pool, account)`.
    pub positions: Vec<PositionRecord>,
    pub total_weight: u64,
}

impl DistributorState {
    /// Encode with bincode's standard configuration.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TrickleError> {
        bincode::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| TrickleError::Encoding(e.to_string()))
    }

    /// Decode bytes produced by [`to_bytes`](Self::to_bytes).
    ///
    /// Trailing bytes are rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TrickleError> {
        let (state, read): (Self, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| TrickleError::Encoding(e.to_string()))?;
        if read != bytes.len() {
            return Err(TrickleError::Encoding(format!(
                "{} trailing bytes after distributor state",
                bytes.len() - read
            )));
        }
        Ok(state)
    }

    /// Check every invariant the distributor relies on.
    ///
    /// # Errors
    ///
    /// - [`PoolError::CorruptedState`] naming the first violated invariant
    /// - [`PoolError::Schedule`] for invalid schedule parameters
    pub fn validate(&self) -> Result<(), PoolError> {
        let corrupt = |msg: String| Err(PoolError::CorruptedState(msg));

        self.schedule.validate()?;
        if self.staking_weight_divisor == Some(0) {
            return corrupt("zero staking weight divisor".to_string());
        }
        if self.custody == self.owner {
            return corrupt("custody account equals owner".to_string());
        }
        if self.pools.is_empty() {
            return corrupt("missing staking pool".to_string());
        }

        let mut assets = HashSet::new();
        let mut weight_sum: u64 = 0;
        for (index, pool) in self.pools.iter().enumerate() {
            if pool.id != index as PoolId {
                return corrupt(format!("pool at index {index} has id {}", pool.id));
            }
            if !assets.insert(pool.stake_asset) {
                return corrupt(format!("asset {} staked by two pools", pool.stake_asset));
            }
            weight_sum = weight_sum
                .checked_add(pool.weight)
                .ok_or(PoolError::ArithmeticOverflow)?;
        }
        if weight_sum != self.total_weight {
            return corrupt(format!(
                "pool weights sum to {weight_sum}, total weight is {}",
                self.total_weight
            ));
        }

        let mut staked: HashMap<PoolId, u128> = HashMap::new();
        let mut seen = HashSet::new();
        for record in &self.positions {
            let Some(pool) = self.pools.get(record.pool as usize) else {
                return corrupt(format!("position in unknown pool {}", record.pool));
            };
            if !seen.insert((record.pool, record.account)) {
                return corrupt(format!(
                    "duplicate position for {} in pool {}",
                    record.account.short(),
                    record.pool
                ));
            }
            // Fails when the debt exceeds what the position has accrued.
            record.position.pending(pool.acc_reward_per_unit)?;
            let sum = staked.entry(record.pool).or_default();
            *sum = sum
                .checked_add(record.position.staked)
                .ok_or(PoolError::ArithmeticOverflow)?;
        }
        for pool in &self.pools {
            let sum = staked.get(&pool.id).copied().unwrap_or(0);
            if sum != pool.total_staked {
                return corrupt(format!(
                    "pool {} positions sum to {sum}, total staked is {}",
                    pool.id, pool.total_staked
                ));
            }
        }
        Ok(())
    }
}

impl<L: TokenLedger> PoolDistributor<L> {
    /// Capture the persisted layout.
    pub fn snapshot(&self) -> DistributorState {
        let mut positions: Vec<PositionRecord> = self
            .positions
            .iter()
            .map(|(&(pool, account), &position)| PositionRecord {
                pool,
                account,
                position,
            })
            .collect();
        positions.sort_by_key(|r| (r.pool, r.account));

        DistributorState {
            owner: self.owner,
            custody: self.custody,
            schedule: self.schedule.params().clone(),
            start_step: self.start_step,
            staking_weight_divisor: self.staking_weight_divisor,
            pools: self.pools.clone(),
            positions,
            total_weight: self.total_weight,
        }
    }

    /// Rebuild a distributor from a snapshot over `ledger`.
    ///
    /// # Errors
    ///
    /// - any error from [`DistributorState::validate`]
    /// - [`PoolError::CorruptedState`] if the staking pool does not stake the
    ///   ledger's reward asset
    /// - [`PoolError::Ledger`] if `minter` is not honoured by `ledger`
    pub fn restore(
        state: DistributorState,
        ledger: L,
        minter: MinterCapability,
    ) -> Result<Self, PoolError> {
        state.validate()?;
        let reward = ledger.reward_asset();
        if state.pools[0].stake_asset != reward {
            return Err(PoolError::CorruptedState(format!(
                "staking pool stakes {}, ledger rewards {}",
                state.pools[0].stake_asset, reward
            )));
        }
        ledger.check_minter(&minter)?;
        let schedule = EmissionSchedule::new(state.owner, state.schedule)?;

        let asset_index = state
            .pools
            .iter()
            .map(|p| (p.stake_asset, p.id))
            .collect();
        let positions = state
            .positions
            .into_iter()
            .map(|r| ((r.pool, r.account), r.position))
            .collect();
        info!(pools = state.pools.len(), "distributor restored");

        Ok(Self {
            owner: state.owner,
            custody: state.custody,
            schedule,
            ledger,
            minter,
            start_step: state.start_step,
            staking_weight_divisor: state.staking_weight_divisor,
            pools: state.pools,
            asset_index,
            positions,
            total_weight: state.total_weight,
            events: Vec::new(),
        })
    }
}

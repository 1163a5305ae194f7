//! Events appended by successful distributor mutations.
//!
//! The distributor buffers them; hosts collect them with
//! [`PoolDistributor::drain_events`](crate::PoolDistributor::drain_events).

use serde::{Deserialize, Serialize};
use trickle_core::types::{AccountId, Amount, AssetId, PoolId, Step};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DistributorEvent {
    PoolCreated {
        pool: PoolId,
        stake_asset: AssetId,
        weight: u64,
    },
    WeightChanged {
        pool: PoolId,
        old: u64,
        new: u64,
    },
    Settled {
        pool: PoolId,
        from: Step,
        to: Step,
        minted: Amount,
        forfeited: Amount,
    },
    Deposit {
        account: AccountId,
        pool: PoolId,
        amount: Amount,
    },
    Withdraw {
        account: AccountId,
        pool: PoolId,
        amount: Amount,
    },
    EmergencyWithdraw {
        account: AccountId,
        pool: PoolId,
        amount: Amount,
    },
    /// Pending reward paid out during a deposit or withdraw.
    Harvest {
        account: AccountId,
        pool: PoolId,
        amount: Amount,
    },
}

impl DistributorEvent {
    /// The pool the event concerns.
    pub fn pool(&self) -> PoolId {
        match self {
            Self::PoolCreated { pool, .. }
            | Self::WeightChanged { pool, .. }
            | Self::Settled { pool, .. }
            | Self::Deposit { pool, .. }
            | Self::Withdraw { pool, .. }
            | Self::EmergencyWithdraw { pool, .. }
            | Self::Harvest { pool, .. } => *pool,
        }
    }
}

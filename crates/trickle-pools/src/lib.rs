//! # trickle-pools: weighted staking pools fed by the emission schedule.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Pools**: append-only arena; each pool stakes one asset and owns a
//!   `weight / total_weight` share of the emission.
//! - **Accumulator accounting**: each pool folds settled emission into a
//!   reward-per-unit accumulator scaled by
//!   [`ACC_PRECISION`](trickle_core::constants::ACC_PRECISION); positions
//!   settle against it by difference, so interaction order never changes what
//!   a participant is owed.
//! - **Staking pool**: pool 0 stakes the reward asset itself and, by default,
//!   receives a third of the other pools' combined weight.
//! - **Snapshots**: the full persisted layout encodes to bytes and restores
//!   to an equivalent distributor.

pub mod config;
pub mod distributor;
pub mod events;
pub mod pool;
pub mod shared;
pub mod state;

pub use config::DistributorConfig;
pub use distributor::PoolDistributor;
pub use events::DistributorEvent;
pub use pool::{PoolInfo, Position, Settlement};
pub use shared::SharedDistributor;
pub use state::{DistributorState, PositionRecord};

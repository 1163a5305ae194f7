//! Error types for the Trickle protocol.
//!
//! Every rejected call leaves all persisted state unchanged; there is no
//! internal retry.
use thiserror::Error;

use crate::types::{AssetId, PoolId, Step};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid decay rate: numerator {numerator} must be below denominator {denominator}")] InvalidDecayRate { numerator: u128, denominator: u128 },
    #[error("invalid parameter: {0}")] InvalidParameter(String),
    #[error("range overflow: requested step {to} is past current step {current}")] RangeOverflow { to: Step, current: Step },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("caller is not the schedule owner")] Unauthorized,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: u128, need: u128 },
    #[error("caller is not the ledger admin")] Unauthorized,
    #[error("minter capability {0} is not active")] MinterRevoked(u64),
    #[error("arithmetic overflow")] ArithmeticOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("existing pool for asset {0}")] DuplicatePool(AssetId),
    #[error("unknown pool: {0}")] UnknownPool(PoolId),
    #[error("insufficient stake: have {have}, need {need}")] InsufficientStake { have: u128, need: u128 },
    #[error("caller is not the distributor owner")] Unauthorized,
    #[error("invalid parameter: {0}")] InvalidParameter(String),
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("schedule: {0}")] Schedule(#[from] ScheduleError),
    #[error("ledger: {0}")] Ledger(#[from] LedgerError),
    #[error("corrupted state: {0}")] CorruptedState(String),
}

#[derive(Error, Debug)]
pub enum TrickleError {
    #[error(transparent)] Schedule(#[from] ScheduleError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Pool(#[from] PoolError),
    #[error("encoding: {0}")] Encoding(String),
}

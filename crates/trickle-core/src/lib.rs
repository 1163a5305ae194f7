//! # trickle-core
//! Foundation types, errors and ledger interfaces for the Trickle protocol.

pub mod constants;
pub mod error;
pub mod ledger;
pub mod traits;
pub mod types;

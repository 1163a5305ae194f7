//! Cross-crate test suite for Trickle.
//!
//! Integration tests drive the schedule, the distributor and the reference
//! ledger together: scenario replays with exact expected balances, and
//! property tests that try to break conservation and claim invariants under
//! randomized interaction sequences.

pub mod helpers;

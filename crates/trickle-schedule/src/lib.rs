//! # trickle-schedule: epoch-decaying emission schedule.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Epochs**: steps after the anchor are grouped into fixed-length periods;
//!   the boundary step belongs to the lower epoch.
//! - **Iterative decay**: each epoch applies `x ← floor(x * (den - num) / den)`
//!   to the previous epoch's rate, so rounding happens once per epoch.
//! - **Range emission**: the total over `(from, to]` is summed per epoch
//!   segment, never per step.

pub mod decay;
pub mod schedule;

pub use decay::{compound, decay_once};
pub use schedule::{EmissionSchedule, ScheduleParams};

//! Protocol constants. All token amounts are in base units (1 TRK = 10^18 units).

/// Base units per whole reward token.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Fixed-point scale of a pool's reward-per-unit accumulator.
///
/// # Examples
///
/// ```
/// use trickle_core::constants::ACC_PRECISION;
/// assert_eq!(ACC_PRECISION, 10u128.pow(12));
/// ```
pub const ACC_PRECISION: u128 = 1_000_000_000_000;

/// Default emission per step at epoch 0: 3 TRK.
pub const DEFAULT_BASE_RATE: u128 = 3 * UNIT;

/// Default decay period: 5,184,000 steps (180 days of 3-second steps).
pub const DEFAULT_PERIOD_LENGTH: u64 = 5_184_000;

/// Default decay numerator. With the default denominator each epoch keeps 80%
/// of the previous epoch's rate.
pub const DEFAULT_DECAY_NUMERATOR: u128 = 20;
pub const DEFAULT_DECAY_DENOMINATOR: u128 = 100;
pub const DEFAULT_EPOCH_ANCHOR: u64 = 0;

/// Weight given to the staking pool (pool 0) when the distributor is created.
pub const DEFAULT_STAKING_POOL_WEIGHT: u64 = 1000;

/// The staking pool receives `sum(other weights) / STAKING_WEIGHT_DIVISOR`
/// whenever pool weights change and auto-weighting is enabled.
pub const STAKING_WEIGHT_DIVISOR: u64 = 3;

/// Id of the staking pool, whose stake asset is the reward asset itself.
pub const STAKING_POOL_ID: u64 = 0;

/// Ticker of the reward asset used by the reference ledger.
pub const REWARD_SYMBOL: &str = "TRK";

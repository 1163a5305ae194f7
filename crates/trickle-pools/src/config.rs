//! Distributor construction parameters.

use serde::{Deserialize, Serialize};
use trickle_core::constants::{DEFAULT_STAKING_POOL_WEIGHT, STAKING_WEIGHT_DIVISOR};
use trickle_core::error::PoolError;
use trickle_core::types::{AccountId, Step};
use trickle_schedule::ScheduleParams;

/// Everything [`PoolDistributor::new`](crate::PoolDistributor::new) needs
/// besides the ledger and the minter capability.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DistributorConfig {
    /// Owner of both the distributor and its schedule.
    pub owner: AccountId,
    /// Account holding staked assets and minted-but-unclaimed rewards.
    pub custody: AccountId,
    pub schedule: ScheduleParams,
    /// No pool accrues emission for steps at or before this one.
    pub start_step: Step,
    /// Initial weight of the staking pool.
    pub staking_pool_weight: u64,
    /// Pool 0 is re-weighted to `sum(other weights) / divisor` on every
    /// weight change. `None` leaves it alone.
    pub staking_weight_divisor: Option<u64>,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            owner: AccountId::ZERO,
            custody: AccountId::from_label("trickle/custody"),
            schedule: ScheduleParams::default(),
            start_step: 0,
            staking_pool_weight: DEFAULT_STAKING_POOL_WEIGHT,
            staking_weight_divisor: Some(STAKING_WEIGHT_DIVISOR),
        }
    }
}

impl DistributorConfig {
    /// Check the configuration before building a distributor.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidParameter`] for a zero divisor or a custody
    ///   account equal to the owner
    /// - [`PoolError::Schedule`] for invalid schedule parameters
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.staking_weight_divisor == Some(0) {
            return Err(PoolError::InvalidParameter(
                "staking_weight_divisor must be positive".to_string(),
            ));
        }
        if self.custody == self.owner {
            return Err(PoolError::InvalidParameter(
                "custody account must differ from the owner".to_string(),
            ));
        }
        self.schedule.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trickle_core::error::ScheduleError;

    fn valid() -> DistributorConfig {
        DistributorConfig {
            owner: AccountId::from_label("owner"),
            ..DistributorConfig::default()
        }
    }

    #[test]
    fn defaults() {
        let cfg = DistributorConfig::default();
        assert_eq!(cfg.staking_pool_weight, 1000);
        assert_eq!(cfg.staking_weight_divisor, Some(3));
        assert_eq!(cfg.start_step, 0);
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_divisor_rejected() {
        let cfg = DistributorConfig {
            staking_weight_divisor: Some(0),
            ..valid()
        };
        assert!(matches!(cfg.validate(), Err(PoolError::InvalidParameter(_))));
    }

    #[test]
    fn custody_must_not_be_owner() {
        let cfg = valid();
        let cfg = DistributorConfig {
            custody: cfg.owner,
            ..cfg
        };
        assert!(matches!(cfg.validate(), Err(PoolError::InvalidParameter(_))));
    }

    #[test]
    fn bad_schedule_rejected() {
        let mut cfg = valid();
        cfg.schedule.decay_numerator = 100;
        assert!(matches!(
            cfg.validate(),
            Err(PoolError::Schedule(ScheduleError::InvalidDecayRate { .. }))
        ));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: DistributorConfig =
            serde_json::from_str(r#"{ "start_step": 100, "staking_weight_divisor": null }"#)
                .unwrap();
        assert_eq!(cfg.start_step, 100);
        assert_eq!(cfg.staking_weight_divisor, None);
        assert_eq!(cfg.schedule, ScheduleParams::default());
    }
}

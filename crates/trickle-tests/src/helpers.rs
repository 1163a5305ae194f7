//! Shared fixtures for scenario and property tests.

use trickle_core::ledger::MemoryLedger;
use trickle_core::traits::{MinterCapability, TokenLedger};
use trickle_core::types::{AccountId, Amount, AssetId, CallContext, PoolId, Step};
use trickle_pools::{DistributorConfig, PoolDistributor};
use trickle_schedule::ScheduleParams;

/// Label of the reward asset on every test ledger.
pub const REWARD: &str = "TRK";

pub fn acct(label: &str) -> AccountId {
    AccountId::from_label(label)
}

pub fn asset(label: &str) -> AssetId {
    AssetId::from_label(label)
}

/// A distributor over a fresh [`MemoryLedger`], plus the handles tests need.
pub struct Harness {
    pub chef: PoolDistributor<MemoryLedger>,
    pub owner: AccountId,
    pub admin: AccountId,
    pub minter: MinterCapability,
}

impl Harness {
    /// Build a harness with the given schedule and staking settings.
    pub fn new(schedule: ScheduleParams, start_step: Step, divisor: Option<u64>) -> Self {
        let admin = acct("admin");
        let owner = acct("owner");
        let mut ledger = MemoryLedger::new(admin, asset(REWARD));
        let minter = ledger.grant_minter(&admin).expect("admin grants minter");
        let config = DistributorConfig {
            owner,
            schedule,
            start_step,
            staking_weight_divisor: divisor,
            ..DistributorConfig::default()
        };
        let chef = PoolDistributor::new(config, ledger, minter.clone()).expect("valid config");
        Self {
            chef,
            owner,
            admin,
            minter,
        }
    }

    /// Constant `rate` per step from `start_step`, staking pool auto-weighted.
    pub fn flat(rate: Amount, start_step: Step) -> Self {
        Self::new(
            ScheduleParams {
                base_rate: rate,
                period_length: 0,
                ..ScheduleParams::default()
            },
            start_step,
            Some(3),
        )
    }

    /// Seed `amount` of `asset_label` for `who`.
    pub fn fund(&mut self, who: &str, asset_label: &str, amount: Amount) {
        self.chef
            .ledger_mut()
            .issue(&asset(asset_label), &acct(who), amount)
            .expect("issue");
    }

    /// Owner context at `step`.
    pub fn admin_at(&self, step: Step) -> CallContext {
        CallContext::new(self.owner, step)
    }

    pub fn add_pool(&mut self, step: Step, weight: u64, asset_label: &str) -> PoolId {
        let ctx = self.admin_at(step);
        self.chef
            .create_pool(&ctx, weight, asset(asset_label), true)
            .expect("create pool")
    }

    pub fn balance(&self, who: &str, asset_label: &str) -> Amount {
        self.chef.ledger().balance_of(&asset(asset_label), &acct(who))
    }

    pub fn reward_balance(&self, who: &str) -> Amount {
        self.balance(who, REWARD)
    }

    /// Reward asset held by custody: staked reward plus unclaimed emission.
    pub fn custody_reward(&self) -> Amount {
        self.chef
            .ledger()
            .balance_of(&asset(REWARD), &self.chef.custody())
    }

    /// Total reward supply: issued plus minted.
    pub fn reward_supply(&self) -> Amount {
        self.chef.ledger().total_supply(&asset(REWARD))
    }
}

/// Context for `who` at `step`.
pub fn at(who: &str, step: Step) -> CallContext {
    CallContext::new(acct(who), step)
}

//! Scenario files and schedule arguments.
//!
//! A scenario is a JSON, TOML or YAML file (format taken from the extension)
//! describing a distributor, initial balances and a list of timed actions.
//! Any top-level field can be overridden from the environment with the
//! `TRICKLE_` prefix, using `__` between nested keys
//! (`TRICKLE_DISTRIBUTOR__START_STEP=100`).
//!
//! Amounts may be written as integers or as decimal strings. Use strings for
//! anything above `u64::MAX`; the file parsers read larger numbers as floats.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use trickle_core::constants::{
    DEFAULT_BASE_RATE, DEFAULT_DECAY_DENOMINATOR, DEFAULT_DECAY_NUMERATOR, DEFAULT_EPOCH_ANCHOR,
    DEFAULT_PERIOD_LENGTH, DEFAULT_STAKING_POOL_WEIGHT, REWARD_SYMBOL, STAKING_WEIGHT_DIVISOR,
};
use trickle_core::types::{AccountId, Amount, PoolId, Step};
use trickle_pools::DistributorConfig;
use trickle_schedule::ScheduleParams;

/// Environment prefix for scenario overrides.
pub const ENV_PREFIX: &str = "TRICKLE";

/// Schedule parameters shared by the query subcommands.
#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    /// Emission per step at epoch 0, in base units
    #[arg(long, default_value_t = DEFAULT_BASE_RATE)]
    pub base_rate: u128,

    /// Steps per decay epoch (0 disables decay)
    #[arg(long, default_value_t = DEFAULT_PERIOD_LENGTH)]
    pub period_length: u64,

    /// Decay numerator
    #[arg(long, default_value_t = DEFAULT_DECAY_NUMERATOR)]
    pub decay_numerator: u128,

    /// Decay denominator
    #[arg(long, default_value_t = DEFAULT_DECAY_DENOMINATOR)]
    pub decay_denominator: u128,

    /// Step at which epoch counting begins
    #[arg(long, default_value_t = DEFAULT_EPOCH_ANCHOR)]
    pub epoch_anchor: u64,
}

impl ScheduleArgs {
    pub fn params(&self) -> ScheduleParams {
        ScheduleParams {
            base_rate: self.base_rate,
            period_length: self.period_length,
            decay_numerator: self.decay_numerator,
            decay_denominator: self.decay_denominator,
            epoch_anchor: self.epoch_anchor,
        }
    }
}

/// Parse an amount given either as an integer or a decimal string.
fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
            Ok(Amount::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
            Amount::try_from(v).map_err(|_| E::custom(format!("negative amount {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::custom(format!("invalid amount {v:?}")))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

fn default_reward() -> String {
    REWARD_SYMBOL.to_string()
}

fn default_true() -> bool {
    true
}

/// Schedule section of a scenario; every field falls back to the protocol
/// default.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleSection {
    #[serde(deserialize_with = "amount")]
    pub base_rate: Amount,
    pub period_length: u64,
    #[serde(deserialize_with = "amount")]
    pub decay_numerator: u128,
    #[serde(deserialize_with = "amount")]
    pub decay_denominator: u128,
    pub epoch_anchor: Step,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        let p = ScheduleParams::default();
        Self {
            base_rate: p.base_rate,
            period_length: p.period_length,
            decay_numerator: p.decay_numerator,
            decay_denominator: p.decay_denominator,
            epoch_anchor: p.epoch_anchor,
        }
    }
}

impl From<&ScheduleSection> for ScheduleParams {
    fn from(s: &ScheduleSection) -> Self {
        ScheduleParams {
            base_rate: s.base_rate,
            period_length: s.period_length,
            decay_numerator: s.decay_numerator,
            decay_denominator: s.decay_denominator,
            epoch_anchor: s.epoch_anchor,
        }
    }
}

/// Distributor section. Accounts are labels hashed into ids.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DistributorSection {
    pub owner: String,
    pub custody: String,
    pub schedule: ScheduleSection,
    pub start_step: Step,
    pub staking_pool_weight: u64,
    /// `0` disables auto-weighting of the staking pool.
    pub staking_weight_divisor: u64,
}

impl Default for DistributorSection {
    fn default() -> Self {
        Self {
            owner: "owner".to_string(),
            custody: "custody".to_string(),
            schedule: ScheduleSection::default(),
            start_step: 0,
            staking_pool_weight: DEFAULT_STAKING_POOL_WEIGHT,
            staking_weight_divisor: STAKING_WEIGHT_DIVISOR,
        }
    }
}

impl DistributorSection {
    pub fn to_config(&self) -> DistributorConfig {
        DistributorConfig {
            owner: AccountId::from_label(&self.owner),
            custody: AccountId::from_label(&self.custody),
            schedule: ScheduleParams::from(&self.schedule),
            start_step: self.start_step,
            staking_pool_weight: self.staking_pool_weight,
            staking_weight_divisor: (self.staking_weight_divisor > 0)
                .then_some(self.staking_weight_divisor),
        }
    }
}

/// Initial balance issued before any action runs.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Funding {
    pub account: String,
    pub asset: String,
    #[serde(deserialize_with = "amount")]
    pub amount: Amount,
}

/// One timed call against the distributor.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    CreatePool {
        step: Step,
        weight: u64,
        asset: String,
        #[serde(default = "default_true")]
        settle_all_first: bool,
    },
    SetWeight {
        step: Step,
        pool: PoolId,
        weight: u64,
        #[serde(default = "default_true")]
        settle_all_first: bool,
    },
    /// Change any subset of the schedule parameters at `step`, as one change.
    SetSchedule {
        step: Step,
        #[serde(default, deserialize_with = "optional_amount")]
        base_rate: Option<Amount>,
        #[serde(default)]
        period_length: Option<u64>,
        #[serde(default, deserialize_with = "optional_amount")]
        decay_numerator: Option<u128>,
        #[serde(default, deserialize_with = "optional_amount")]
        decay_denominator: Option<u128>,
        #[serde(default)]
        epoch_anchor: Option<Step>,
    },
    Deposit {
        step: Step,
        account: String,
        pool: PoolId,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    Withdraw {
        step: Step,
        account: String,
        pool: PoolId,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    EnterStaking {
        step: Step,
        account: String,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    LeaveStaking {
        step: Step,
        account: String,
        #[serde(deserialize_with = "amount")]
        amount: Amount,
    },
    EmergencyWithdraw {
        step: Step,
        account: String,
        pool: PoolId,
    },
    Settle {
        step: Step,
        pool: PoolId,
    },
    SettleAll {
        step: Step,
    },
    /// Record an account's pending reward without changing state.
    Pending {
        step: Step,
        account: String,
        pool: PoolId,
    },
}

fn optional_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Amount>, D::Error> {
    amount(deserializer).map(Some)
}

impl Action {
    pub fn step(&self) -> Step {
        match self {
            Action::CreatePool { step, .. }
            | Action::SetWeight { step, .. }
            | Action::SetSchedule { step, .. }
            | Action::Deposit { step, .. }
            | Action::Withdraw { step, .. }
            | Action::EnterStaking { step, .. }
            | Action::LeaveStaking { step, .. }
            | Action::EmergencyWithdraw { step, .. }
            | Action::Settle { step, .. }
            | Action::SettleAll { step }
            | Action::Pending { step, .. } => *step,
        }
    }

    /// Snake-case operation name, as written in scenario files.
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreatePool { .. } => "create_pool",
            Action::SetWeight { .. } => "set_weight",
            Action::SetSchedule { .. } => "set_schedule",
            Action::Deposit { .. } => "deposit",
            Action::Withdraw { .. } => "withdraw",
            Action::EnterStaking { .. } => "enter_staking",
            Action::LeaveStaking { .. } => "leave_staking",
            Action::EmergencyWithdraw { .. } => "emergency_withdraw",
            Action::Settle { .. } => "settle",
            Action::SettleAll { .. } => "settle_all",
            Action::Pending { .. } => "pending",
        }
    }
}

/// A complete scenario file.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Label of the reward asset.
    #[serde(default = "default_reward")]
    pub reward_asset: String,
    #[serde(default)]
    pub distributor: DistributorSection,
    #[serde(default)]
    pub balances: Vec<Funding>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Scenario {
    /// Load a scenario from `path`, applying overrides from the process
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Load a scenario, taking overrides from `env` instead of the process
    /// environment when given.
    pub fn load_with_env(path: &Path, env: Option<::config::Map<String, String>>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("failed to read scenario {}", path.display()))?;

        let scenario: Scenario = settings
            .try_deserialize()
            .with_context(|| format!("invalid scenario {}", path.display()))?;
        scenario.check_ordering()?;
        Ok(scenario)
    }

    /// Steps must never go backwards.
    fn check_ordering(&self) -> Result<()> {
        let mut last = 0;
        for (index, action) in self.actions.iter().enumerate() {
            let step = action.step();
            anyhow::ensure!(
                step >= last,
                "action {index} ({}) at step {step} precedes step {last}",
                action.name()
            );
            last = step;
        }
        Ok(())
    }
}

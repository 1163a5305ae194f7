//! Replays a [`Scenario`] against an in-memory ledger.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use trickle_core::error::PoolError;
use trickle_core::ledger::MemoryLedger;
use trickle_core::traits::TokenLedger;
use trickle_core::types::{AccountId, Amount, AssetId, CallContext, PoolId, Step};
use trickle_pools::{DistributorEvent, PoolDistributor};

use crate::config::{Action, Scenario};

/// Ledger administrator that grants the distributor its minter capability.
const LEDGER_ADMIN: &str = "trickle/ledger-admin";

/// Result of one action.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub index: usize,
    pub op: &'static str,
    pub step: Step,
    /// Reward paid, principal returned, pool created or pending amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PoolLine {
    pub id: PoolId,
    pub asset: String,
    pub weight: u64,
    pub last_settled_step: Step,
    pub acc_reward_per_unit: u128,
    pub total_staked: Amount,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BalanceLine {
    pub account: String,
    /// Hex-encoded account id.
    pub id: String,
    pub asset: String,
    pub amount: Amount,
}

/// Final state after replaying every action.
#[derive(Serialize, Debug, Clone)]
pub struct Report {
    pub name: String,
    pub actions: Vec<ActionOutcome>,
    pub failed: usize,
    pub pools: Vec<PoolLine>,
    pub total_weight: u64,
    pub balances: Vec<BalanceLine>,
    pub reward_supply: Amount,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<DistributorEvent>,
    #[serde(skip)]
    pub state: Vec<u8>,
}

/// Labels seen in a scenario, for naming ids in the report.
#[derive(Default)]
struct Labels {
    accounts: BTreeMap<String, AccountId>,
    assets: BTreeMap<String, AssetId>,
}

impl Labels {
    fn account(&mut self, label: &str) -> AccountId {
        *self
            .accounts
            .entry(label.to_string())
            .or_insert_with(|| AccountId::from_label(label))
    }

    fn asset(&mut self, label: &str) -> AssetId {
        *self
            .assets
            .entry(label.to_string())
            .or_insert_with(|| AssetId::from_label(label))
    }

    fn asset_name(&self, id: &AssetId) -> String {
        self.assets
            .iter()
            .find(|(_, a)| *a == id)
            .map_or_else(|| id.short(), |(label, _)| label.clone())
    }
}

/// Run `scenario` to completion.
///
/// Failed actions are recorded in the report and the replay continues; the
/// distributor leaves its state untouched when a call fails.
pub fn run(scenario: &Scenario, keep_events: bool) -> Result<Report> {
    let mut labels = Labels::default();
    let reward = labels.asset(&scenario.reward_asset);
    let admin = AccountId::from_label(LEDGER_ADMIN);

    let mut ledger = MemoryLedger::new(admin, reward);
    let minter = ledger
        .grant_minter(&admin)
        .context("ledger refused the minter grant")?;
    for funding in &scenario.balances {
        let account = labels.account(&funding.account);
        let asset = labels.asset(&funding.asset);
        ledger
            .issue(&asset, &account, funding.amount)
            .with_context(|| format!("failed to fund {}", funding.account))?;
    }

    let config = scenario.distributor.to_config();
    let owner = labels.account(&scenario.distributor.owner);
    labels.account(&scenario.distributor.custody);
    let mut chef =
        PoolDistributor::new(config, ledger, minter).context("invalid distributor configuration")?;
    info!(
        name = %scenario.name,
        actions = scenario.actions.len(),
        "replaying scenario"
    );

    let mut outcomes = Vec::with_capacity(scenario.actions.len());
    for (index, action) in scenario.actions.iter().enumerate() {
        let result = apply(&mut chef, &mut labels, owner, action);
        let outcome = match result {
            Ok(value) => {
                debug!(index, op = action.name(), step = action.step(), ?value, "action applied");
                ActionOutcome {
                    index,
                    op: action.name(),
                    step: action.step(),
                    value,
                    error: None,
                }
            }
            Err(e) => {
                warn!(index, op = action.name(), step = action.step(), "action failed: {}", e);
                ActionOutcome {
                    index,
                    op: action.name(),
                    step: action.step(),
                    value: None,
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }
    let events = if keep_events { chef.drain_events() } else { Vec::new() };

    let pools = chef
        .pools()
        .iter()
        .map(|p| PoolLine {
            id: p.id,
            asset: labels.asset_name(&p.stake_asset),
            weight: p.weight,
            last_settled_step: p.last_settled_step,
            acc_reward_per_unit: p.acc_reward_per_unit,
            total_staked: p.total_staked,
        })
        .collect();

    let ledger = chef.ledger();
    let mut balances = Vec::new();
    for (account_label, account) in &labels.accounts {
        for (asset_label, asset) in &labels.assets {
            let amount = ledger.balance_of(asset, account);
            if amount > 0 {
                balances.push(BalanceLine {
                    account: account_label.clone(),
                    id: hex::encode(account.as_bytes()),
                    asset: asset_label.clone(),
                    amount,
                });
            }
        }
    }

    let state = chef
        .snapshot()
        .to_bytes()
        .context("failed to encode distributor state")?;
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    info!(failed, pools = chef.pool_count(), "scenario finished");

    Ok(Report {
        name: scenario.name.clone(),
        actions: outcomes,
        failed,
        pools,
        total_weight: chef.total_weight(),
        balances,
        reward_supply: ledger.total_supply(&reward),
        events,
        state,
    })
}

fn apply(
    chef: &mut PoolDistributor<MemoryLedger>,
    labels: &mut Labels,
    owner: AccountId,
    action: &Action,
) -> Result<Option<Amount>, PoolError> {
    let admin = CallContext::new(owner, action.step());
    match action {
        Action::CreatePool {
            weight,
            asset,
            settle_all_first,
            ..
        } => {
            let asset = labels.asset(asset);
            chef.create_pool(&admin, *weight, asset, *settle_all_first)
                .map(|id| Some(Amount::from(id)))
        }
        Action::SetWeight {
            pool,
            weight,
            settle_all_first,
            ..
        } => chef
            .set_weight(&admin, *pool, *weight, *settle_all_first)
            .map(|()| None),
        Action::SetSchedule {
            base_rate,
            period_length,
            decay_numerator,
            decay_denominator,
            epoch_anchor,
            ..
        } => {
            let mut params = chef.schedule().params().clone();
            if let Some(v) = base_rate {
                params.base_rate = *v;
            }
            if let Some(v) = period_length {
                params.period_length = *v;
            }
            if let Some(v) = decay_numerator {
                params.decay_numerator = *v;
            }
            if let Some(v) = decay_denominator {
                params.decay_denominator = *v;
            }
            if let Some(v) = epoch_anchor {
                params.epoch_anchor = *v;
            }
            chef.set_schedule_params(&admin, params)?;
            Ok(None)
        }
        Action::Deposit {
            step,
            account,
            pool,
            amount,
        } => {
            let ctx = CallContext::new(labels.account(account), *step);
            chef.deposit(&ctx, *pool, *amount).map(Some)
        }
        Action::Withdraw {
            step,
            account,
            pool,
            amount,
        } => {
            let ctx = CallContext::new(labels.account(account), *step);
            chef.withdraw(&ctx, *pool, *amount).map(Some)
        }
        Action::EnterStaking {
            step,
            account,
            amount,
        } => {
            let ctx = CallContext::new(labels.account(account), *step);
            chef.enter_staking(&ctx, *amount).map(Some)
        }
        Action::LeaveStaking {
            step,
            account,
            amount,
        } => {
            let ctx = CallContext::new(labels.account(account), *step);
            chef.leave_staking(&ctx, *amount).map(Some)
        }
        Action::EmergencyWithdraw {
            step,
            account,
            pool,
        } => {
            let ctx = CallContext::new(labels.account(account), *step);
            chef.emergency_withdraw(&ctx, *pool).map(Some)
        }
        Action::Settle { pool, .. } => chef.settle(&admin, *pool).map(|s| Some(s.minted)),
        Action::SettleAll { .. } => chef
            .settle_all(&admin)
            .map(|all| Some(all.iter().map(|s| s.minted).sum())),
        Action::Pending {
            step,
            account,
            pool,
        } => chef
            .pending_reward(*pool, &labels.account(account), *step)
            .map(Some),
    }
}

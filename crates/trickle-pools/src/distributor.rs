//! The pool distributor: weighted pools fed by an [`EmissionSchedule`].
//!
//! Every mutating entry point takes a [`CallContext`] and runs in three
//! phases:
//!
//! 1. **Plan**: compute the pool settlement, the caller's pending reward and
//!    the new position from current state without mutating anything.
//! 2. **Check**: verify ownership, stake, ledger balances and the minter
//!    capability against the plan.
//! 3. **Commit**: mint, transfer and write the new pool and position.
//!
//! A call that fails in phase 1 or 2 leaves the distributor and the ledger
//! untouched.
//!
//! Successful calls append [`DistributorEvent`]s to an in-memory buffer that
//! the host empties with [`PoolDistributor::drain_events`].

use std::collections::HashMap;

use tracing::{debug, info, warn};
use trickle_core::constants::{ACC_PRECISION, STAKING_POOL_ID};
use trickle_core::error::{LedgerError, PoolError, ScheduleError};
use trickle_core::traits::{MinterCapability, TokenLedger};
use trickle_core::types::{AccountId, Amount, AssetId, CallContext, PoolId, Step};
use trickle_schedule::{EmissionSchedule, ScheduleParams};

use crate::config::DistributorConfig;
use crate::events::DistributorEvent;
use crate::pool::{accrued, PoolInfo, Position, Settlement};

/// Direction of a stake movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Movement {
    Deposit,
    Withdraw,
}

/// Multi-pool reward distributor over a [`TokenLedger`].
pub struct PoolDistributor<L: TokenLedger> {
    pub(crate) owner: AccountId,
    pub(crate) custody: AccountId,
    pub(crate) schedule: EmissionSchedule,
    pub(crate) ledger: L,
    pub(crate) minter: MinterCapability,
    pub(crate) start_step: Step,
    pub(crate) staking_weight_divisor: Option<u64>,
    /// Arena indexed by [`PoolId`].
    pub(crate) pools: Vec<PoolInfo>,
    pub(crate) asset_index: HashMap<AssetId, PoolId>,
    pub(crate) positions: HashMap<(PoolId, AccountId), Position>,
    /// Always equal to the sum of pool weights.
    pub(crate) total_weight: u64,
    /// Grows with every mutation until [`PoolDistributor::drain_events`].
    pub(crate) events: Vec<DistributorEvent>,
}

impl<L: TokenLedger> PoolDistributor<L> {
    /// Create a distributor and its staking pool.
    ///
    /// The staking pool (pool 0) stakes the ledger's reward asset.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidParameter`] / [`PoolError::Schedule`] for an
    ///   invalid config
    /// - [`PoolError::Ledger`] if `minter` is not honoured by `ledger`
    pub fn new(
        config: DistributorConfig,
        ledger: L,
        minter: MinterCapability,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        ledger.check_minter(&minter)?;
        let schedule = EmissionSchedule::new(config.owner, config.schedule)?;

        let reward = ledger.reward_asset();
        let staking = PoolInfo::new(
            STAKING_POOL_ID,
            reward,
            config.staking_pool_weight,
            config.start_step,
        );
        info!(
            owner = %config.owner.short(),
            start_step = config.start_step,
            staking_weight = config.staking_pool_weight,
            "distributor created"
        );

        Ok(Self {
            owner: config.owner,
            custody: config.custody,
            schedule,
            ledger,
            minter,
            start_step: config.start_step,
            staking_weight_divisor: config.staking_weight_divisor,
            pools: vec![staking],
            asset_index: HashMap::from([(reward, STAKING_POOL_ID)]),
            positions: HashMap::new(),
            total_weight: config.staking_pool_weight,
            events: vec![DistributorEvent::PoolCreated {
                pool: STAKING_POOL_ID,
                stake_asset: reward,
                weight: config.staking_pool_weight,
            }],
        })
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn custody(&self) -> AccountId {
        self.custody
    }

    pub fn start_step(&self) -> Step {
        self.start_step
    }

    pub fn staking_weight_divisor(&self) -> Option<u64> {
        self.staking_weight_divisor
    }

    pub fn schedule(&self) -> &EmissionSchedule {
        &self.schedule
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Mutable ledger access for hosts seeding balances.
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn pool(&self, id: PoolId) -> Option<&PoolInfo> {
        usize::try_from(id).ok().and_then(|i| self.pools.get(i))
    }

    pub fn pools(&self) -> &[PoolInfo] {
        &self.pools
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn pool_of_asset(&self, asset: &AssetId) -> Option<PoolId> {
        self.asset_index.get(asset).copied()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// The position of `account` in pool `id`, if one was ever opened.
    pub fn position(&self, id: PoolId, account: &AccountId) -> Option<Position> {
        self.positions.get(&(id, *account)).copied()
    }

    /// Events recorded since the last [`drain_events`](Self::drain_events).
    pub fn events(&self) -> &[DistributorEvent] {
        &self.events
    }

    /// Take the buffered events, leaving the buffer empty.
    ///
    /// The distributor never discards events on its own. Long-running hosts
    /// must drain after each batch of calls or the buffer grows without
    /// bound.
    pub fn drain_events(&mut self) -> Vec<DistributorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Reward `account` would receive from pool `id` by interacting at `step`.
    ///
    /// Replays the settle arithmetic without mutating anything. The next
    /// interaction pays exactly this unless the custody reserve has fallen
    /// short through rounding, see [`withdraw`](Self::withdraw).
    pub fn pending_reward(
        &self,
        id: PoolId,
        account: &AccountId,
        step: Step,
    ) -> Result<Amount, PoolError> {
        let settlement = self.plan_settlement(id, step)?;
        self.position(id, account)
            .unwrap_or_default()
            .pending(settlement.acc_after)
    }

    // ------------------------------------------------------------------
    // Pool administration
    // ------------------------------------------------------------------

    /// Register a new pool for `stake_asset`. Owner only.
    ///
    /// The pool accrues from `max(ctx.step, start_step)`. With
    /// `settle_all_first` every existing pool is settled at `ctx.step` before
    /// the weights change.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Unauthorized`] if the caller is not the owner
    /// - [`PoolError::DuplicatePool`] if the asset already has a pool
    pub fn create_pool(
        &mut self,
        ctx: &CallContext,
        weight: u64,
        stake_asset: AssetId,
        settle_all_first: bool,
    ) -> Result<PoolId, PoolError> {
        self.ensure_owner(&ctx.caller)?;
        if self.asset_index.contains_key(&stake_asset) {
            return Err(PoolError::DuplicatePool(stake_asset));
        }
        let others = self
            .other_weights()?
            .checked_add(weight)
            .ok_or(PoolError::ArithmeticOverflow)?;
        let (staking_weight, total_weight) =
            self.balanced_weights(others, self.pools[0].weight)?;

        if settle_all_first {
            self.settle_all(ctx)?;
        }

        let id = self.pools.len() as PoolId;
        let start = ctx.step.max(self.start_step);
        self.pools.push(PoolInfo::new(id, stake_asset, weight, start));
        self.asset_index.insert(stake_asset, id);
        self.events.push(DistributorEvent::PoolCreated {
            pool: id,
            stake_asset,
            weight,
        });
        self.apply_staking_weight(staking_weight);
        self.total_weight = total_weight;

        info!(pool = id, asset = %stake_asset.short(), weight, start, "pool created");
        Ok(id)
    }

    /// Change the weight of pool `id`. Owner only.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Unauthorized`] if the caller is not the owner
    /// - [`PoolError::UnknownPool`] if `id` does not exist
    pub fn set_weight(
        &mut self,
        ctx: &CallContext,
        id: PoolId,
        weight: u64,
        settle_all_first: bool,
    ) -> Result<(), PoolError> {
        self.ensure_owner(&ctx.caller)?;
        let index = self.index_of(id)?;
        let old = self.pools[index].weight;

        let (others, staking_requested) = if id == STAKING_POOL_ID {
            (self.other_weights()?, weight)
        } else {
            let others = self
                .other_weights()?
                .checked_sub(old)
                .and_then(|w| w.checked_add(weight))
                .ok_or(PoolError::ArithmeticOverflow)?;
            (others, self.pools[0].weight)
        };
        let (staking_weight, total_weight) = self.balanced_weights(others, staking_requested)?;

        if settle_all_first {
            self.settle_all(ctx)?;
        }

        if id != STAKING_POOL_ID && old != weight {
            self.pools[index].weight = weight;
            self.events.push(DistributorEvent::WeightChanged {
                pool: id,
                old,
                new: weight,
            });
            info!(pool = id, old, new = weight, "pool weight changed");
        }
        self.apply_staking_weight(staking_weight);
        self.total_weight = total_weight;
        Ok(())
    }

    /// Hand the distributor and its schedule to a new owner.
    pub fn transfer_ownership(
        &mut self,
        ctx: &CallContext,
        new_owner: AccountId,
    ) -> Result<(), PoolError> {
        self.ensure_owner(&ctx.caller)?;
        if new_owner == self.custody {
            return Err(PoolError::InvalidParameter(
                "custody account cannot own the distributor".to_string(),
            ));
        }
        self.schedule.transfer_ownership(&ctx.caller, new_owner)?;
        self.owner = new_owner;
        info!(to = %new_owner.short(), "distributor ownership transferred");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Schedule parameters
    // ------------------------------------------------------------------
    //
    // Every pool is settled at `ctx.step` under the old parameters before the
    // new ones apply, so elapsed ranges never change retroactively.

    pub fn set_base_rate(&mut self, ctx: &CallContext, base_rate: Amount) -> Result<(), PoolError> {
        self.update_schedule(ctx, |s, caller| s.set_base_rate(caller, base_rate))
    }

    pub fn set_period_length(&mut self, ctx: &CallContext, period_length: u64) -> Result<(), PoolError> {
        self.update_schedule(ctx, |s, caller| s.set_period_length(caller, period_length))
    }

    pub fn set_decay_numerator(&mut self, ctx: &CallContext, numerator: u128) -> Result<(), PoolError> {
        self.update_schedule(ctx, |s, caller| s.set_decay_numerator(caller, numerator))
    }

    pub fn set_decay_denominator(&mut self, ctx: &CallContext, denominator: u128) -> Result<(), PoolError> {
        self.update_schedule(ctx, |s, caller| s.set_decay_denominator(caller, denominator))
    }

    pub fn set_epoch_anchor(&mut self, ctx: &CallContext, anchor: Step) -> Result<(), PoolError> {
        self.update_schedule(ctx, |s, caller| s.set_epoch_anchor(caller, anchor))
    }

    /// Replace all schedule parameters in one change.
    pub fn set_schedule_params(&mut self, ctx: &CallContext, params: ScheduleParams) -> Result<(), PoolError> {
        self.update_schedule(ctx, |s, caller| s.set_params(caller, params))
    }

    fn update_schedule(
        &mut self,
        ctx: &CallContext,
        apply: impl FnOnce(&mut EmissionSchedule, &AccountId) -> Result<(), ScheduleError>,
    ) -> Result<(), PoolError> {
        self.ensure_owner(&ctx.caller)?;
        let mut next = self.schedule.clone();
        apply(&mut next, &ctx.caller)?;
        self.settle_all(ctx)?;
        self.schedule = next;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Settlement
    // ------------------------------------------------------------------

    /// Fold the emission over `(last_settled_step, ctx.step]` into pool `id`.
    ///
    /// Idempotent for a fixed step. Open to any caller.
    pub fn settle(&mut self, ctx: &CallContext, id: PoolId) -> Result<Settlement, PoolError> {
        let settlement = self.plan_settlement(id, ctx.step)?;
        self.ensure_mintable(settlement.minted)?;
        self.commit_settlement(&settlement)?;
        Ok(settlement)
    }

    /// Settle every pool at `ctx.step`.
    ///
    /// All settlements are planned and the combined mint checked before any
    /// pool is touched.
    pub fn settle_all(&mut self, ctx: &CallContext) -> Result<Vec<Settlement>, PoolError> {
        let plans = self
            .pools
            .iter()
            .map(|p| self.plan_settlement(p.id, ctx.step))
            .collect::<Result<Vec<_>, _>>()?;
        let minted = plans
            .iter()
            .try_fold(0u128, |sum, s| sum.checked_add(s.minted))
            .ok_or(PoolError::ArithmeticOverflow)?;
        self.ensure_mintable(minted)?;
        for settlement in &plans {
            self.commit_settlement(settlement)?;
        }
        debug!(step = ctx.step, minted, "settled all pools");
        Ok(plans)
    }

    /// Compute the settlement of pool `id` at `step` without applying it.
    pub(crate) fn plan_settlement(&self, id: PoolId, step: Step) -> Result<Settlement, PoolError> {
        let pool = &self.pools[self.index_of(id)?];
        if step <= pool.last_settled_step {
            return Ok(Settlement::noop(pool));
        }

        let emission = self
            .schedule
            .cumulative_emission(pool.last_settled_step, step, step)?;
        let share = if self.total_weight == 0 {
            0
        } else {
            emission
                .checked_mul(u128::from(pool.weight))
                .ok_or(PoolError::ArithmeticOverflow)?
                / u128::from(self.total_weight)
        };

        let (minted, forfeited, acc_after) = if pool.total_staked == 0 {
            (0, share, pool.acc_reward_per_unit)
        } else {
            let increment = share
                .checked_mul(ACC_PRECISION)
                .ok_or(PoolError::ArithmeticOverflow)?
                / pool.total_staked;
            let acc = pool
                .acc_reward_per_unit
                .checked_add(increment)
                .ok_or(PoolError::ArithmeticOverflow)?;
            (share, 0, acc)
        };

        Ok(Settlement {
            pool: id,
            from: pool.last_settled_step,
            to: step,
            emission,
            minted,
            forfeited,
            acc_after,
        })
    }

    /// Apply a planned settlement: mint first, then advance the pool.
    fn commit_settlement(&mut self, s: &Settlement) -> Result<(), PoolError> {
        if s.is_noop() {
            return Ok(());
        }
        if s.minted > 0 {
            self.ledger.mint(&self.minter, &self.custody, s.minted)?;
        }
        let index = self.index_of(s.pool)?;
        let pool = &mut self.pools[index];
        pool.acc_reward_per_unit = s.acc_after;
        pool.last_settled_step = s.to;

        if s.forfeited > 0 {
            debug!(pool = s.pool, from = s.from, to = s.to, forfeited = %s.forfeited, "empty pool settled");
        } else {
            debug!(pool = s.pool, from = s.from, to = s.to, minted = %s.minted, "pool settled");
        }
        self.events.push(DistributorEvent::Settled {
            pool: s.pool,
            from: s.from,
            to: s.to,
            minted: s.minted,
            forfeited: s.forfeited,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Participants
    // ------------------------------------------------------------------

    /// Stake `amount` of the pool's asset, paying out pending reward first.
    ///
    /// `amount == 0` only harvests. Returns the reward paid.
    ///
    /// # Errors
    ///
    /// - [`PoolError::UnknownPool`] if `id` does not exist
    /// - [`PoolError::Ledger`] if the caller lacks `amount` of the stake asset
    pub fn deposit(&mut self, ctx: &CallContext, id: PoolId, amount: Amount) -> Result<Amount, PoolError> {
        self.move_stake(ctx, id, amount, Movement::Deposit)
    }

    /// Unstake `amount`, paying out pending reward first. Returns the reward
    /// paid.
    ///
    /// Rewards are paid from the custody reserve. When floor rounding leaves
    /// the reserve a few units below what is owed, the payout is capped at the
    /// reserve and the remainder is dropped; staked principal is never touched.
    ///
    /// # Errors
    ///
    /// - [`PoolError::UnknownPool`] if `id` does not exist
    /// - [`PoolError::InsufficientStake`] if `amount` exceeds the position
    pub fn withdraw(&mut self, ctx: &CallContext, id: PoolId, amount: Amount) -> Result<Amount, PoolError> {
        self.move_stake(ctx, id, amount, Movement::Withdraw)
    }

    /// [`deposit`](Self::deposit) into the staking pool.
    pub fn enter_staking(&mut self, ctx: &CallContext, amount: Amount) -> Result<Amount, PoolError> {
        self.deposit(ctx, STAKING_POOL_ID, amount)
    }

    /// [`withdraw`](Self::withdraw) from the staking pool.
    pub fn leave_staking(&mut self, ctx: &CallContext, amount: Amount) -> Result<Amount, PoolError> {
        self.withdraw(ctx, STAKING_POOL_ID, amount)
    }

    /// Return the caller's whole stake, forfeiting their pending reward.
    ///
    /// The pool is settled up to `ctx.step` first so the stake still counts
    /// for the range it was in. If the reward cannot be minted (revoked
    /// minter, supply overflow) that range is forfeited instead and the exit
    /// goes ahead. Returns the amount handed back.
    pub fn emergency_withdraw(&mut self, ctx: &CallContext, id: PoolId) -> Result<Amount, PoolError> {
        let index = self.index_of(id)?;
        let key = (id, ctx.caller);
        let Some(position) = self.positions.get(&key).copied() else {
            return Ok(0);
        };
        let pool = &self.pools[index];
        let amount = position.staked;
        let total_staked = pool
            .total_staked
            .checked_sub(amount)
            .ok_or_else(|| PoolError::CorruptedState(format!("pool {id} total below position")))?;
        let asset = pool.stake_asset;
        let acc = pool.acc_reward_per_unit;
        self.ledger.ensure_balance(&asset, &self.custody, amount)?;

        let mut settlement = self.plan_settlement(id, ctx.step)?;
        if let Err(err) = self.ensure_mintable(settlement.minted) {
            warn!(pool = id, from = settlement.from, to = settlement.to, error = %err, "cannot mint on emergency exit, range forfeited");
            settlement = settlement.forfeiting(acc);
        }
        self.commit_settlement(&settlement)?;

        self.ledger.transfer(&asset, &self.custody, &ctx.caller, amount)?;
        self.positions.insert(key, Position::default());
        self.pools[index].total_staked = total_staked;
        self.events.push(DistributorEvent::EmergencyWithdraw {
            account: ctx.caller,
            pool: id,
            amount,
        });
        warn!(pool = id, account = %ctx.caller.short(), amount = %amount, "emergency withdraw, pending reward forfeited");
        Ok(amount)
    }

    fn move_stake(
        &mut self,
        ctx: &CallContext,
        id: PoolId,
        amount: Amount,
        movement: Movement,
    ) -> Result<Amount, PoolError> {
        let index = self.index_of(id)?;
        let key = (id, ctx.caller);
        let existing = self.positions.get(&key).copied();
        let position = existing.unwrap_or_default();

        // Plan.
        let settlement = self.plan_settlement(id, ctx.step)?;
        let pending = position.pending(settlement.acc_after)?;
        let pool = &self.pools[index];
        let (staked, total_staked) = match movement {
            Movement::Deposit => (
                position.staked.checked_add(amount),
                pool.total_staked.checked_add(amount),
            ),
            Movement::Withdraw => {
                if amount > position.staked {
                    return Err(PoolError::InsufficientStake {
                        have: position.staked,
                        need: amount,
                    });
                }
                (
                    Some(position.staked - amount),
                    pool.total_staked.checked_sub(amount),
                )
            }
        };
        let staked = staked.ok_or(PoolError::ArithmeticOverflow)?;
        let total_staked = total_staked.ok_or(PoolError::ArithmeticOverflow)?;
        let next = Position {
            staked,
            settled_debt: accrued(staked, settlement.acc_after)?,
        };

        // Check.
        let asset = pool.stake_asset;
        let payout = self.check_movement(ctx, &asset, &settlement, pending, amount, movement)?;
        if payout < pending {
            warn!(
                pool = id,
                account = %ctx.caller.short(),
                pending = %pending,
                payout = %payout,
                "reward reserve short, payout capped"
            );
        }

        // Commit.
        self.commit_settlement(&settlement)?;
        let reward = self.ledger.reward_asset();
        if payout > 0 {
            self.ledger.transfer(&reward, &self.custody, &ctx.caller, payout)?;
            self.events.push(DistributorEvent::Harvest {
                account: ctx.caller,
                pool: id,
                amount: payout,
            });
        }
        if amount > 0 {
            match movement {
                Movement::Deposit => self.ledger.transfer(&asset, &ctx.caller, &self.custody, amount)?,
                Movement::Withdraw => self.ledger.transfer(&asset, &self.custody, &ctx.caller, amount)?,
            }
        }
        if existing.is_some() || staked > 0 {
            self.positions.insert(key, next);
        }
        self.pools[index].total_staked = total_staked;

        let account = ctx.caller;
        self.events.push(match movement {
            Movement::Deposit => DistributorEvent::Deposit { account, pool: id, amount },
            Movement::Withdraw => DistributorEvent::Withdraw { account, pool: id, amount },
        });
        debug!(
            pool = id,
            account = %account.short(),
            ?movement,
            amount = %amount,
            harvested = %payout,
            step = ctx.step,
            "stake moved"
        );
        Ok(payout)
    }

    /// Verify the ledger can carry out a planned movement and return the
    /// reward actually payable.
    ///
    /// Rewards are paid from the custody reserve: custody's reward balance
    /// after the settlement mint, less the principal staked in the staking
    /// pool. Flooring can leave the sum of pending rewards a few units above
    /// that reserve; the payout is capped rather than failing. Principal is
    /// never used to pay rewards.
    ///
    /// Payout happens before the stake transfer, so a deposit into the
    /// staking pool may be funded by the reward it harvests.
    fn check_movement(
        &self,
        ctx: &CallContext,
        asset: &AssetId,
        settlement: &Settlement,
        pending: Amount,
        amount: Amount,
        movement: Movement,
    ) -> Result<Amount, PoolError> {
        self.ensure_mintable(settlement.minted)?;
        let reward = self.ledger.reward_asset();
        let stakes_reward = *asset == reward;

        let custody_reward = self
            .ledger
            .balance_of(&reward, &self.custody)
            .checked_add(settlement.minted)
            .ok_or(PoolError::ArithmeticOverflow)?;
        let reserve = custody_reward.saturating_sub(self.pools[0].total_staked);
        let payout = pending.min(reserve);

        match movement {
            Movement::Deposit => {
                let mut have = self.ledger.balance_of(asset, &ctx.caller);
                if stakes_reward {
                    have = have.checked_add(payout).ok_or(PoolError::ArithmeticOverflow)?;
                }
                if have < amount {
                    return Err(LedgerError::InsufficientBalance { have, need: amount }.into());
                }
            }
            Movement::Withdraw if stakes_reward => {
                let have = custody_reward - payout;
                if have < amount {
                    return Err(LedgerError::InsufficientBalance { have, need: amount }.into());
                }
            }
            Movement::Withdraw => {
                self.ledger.ensure_balance(asset, &self.custody, amount)?;
            }
        }
        Ok(payout)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_owner(&self, caller: &AccountId) -> Result<(), PoolError> {
        if *caller != self.owner {
            return Err(PoolError::Unauthorized);
        }
        Ok(())
    }

    /// Fail unless `amount` can be minted right now.
    fn ensure_mintable(&self, amount: Amount) -> Result<(), PoolError> {
        if amount == 0 {
            return Ok(());
        }
        self.ledger.check_minter(&self.minter)?;
        let reward = self.ledger.reward_asset();
        self.ledger
            .total_supply(&reward)
            .checked_add(amount)
            .ok_or(PoolError::ArithmeticOverflow)?;
        Ok(())
    }

    fn index_of(&self, id: PoolId) -> Result<usize, PoolError> {
        usize::try_from(id)
            .ok()
            .filter(|i| *i < self.pools.len())
            .ok_or(PoolError::UnknownPool(id))
    }

    /// Sum of every weight except the staking pool's.
    fn other_weights(&self) -> Result<u64, PoolError> {
        self.total_weight
            .checked_sub(self.pools[0].weight)
            .ok_or_else(|| PoolError::CorruptedState("total weight below staking weight".to_string()))
    }

    /// Staking-pool weight and total weight once the other pools sum to
    /// `others`.
    ///
    /// With a divisor the staking pool tracks `others / divisor`, unless
    /// `others` is zero. Without one it keeps `staking`.
    fn balanced_weights(&self, others: u64, staking: u64) -> Result<(u64, u64), PoolError> {
        let staking = match self.staking_weight_divisor {
            Some(divisor) if others > 0 && divisor > 0 => others / divisor,
            _ => staking,
        };
        let total = others
            .checked_add(staking)
            .ok_or(PoolError::ArithmeticOverflow)?;
        Ok((staking, total))
    }

    fn apply_staking_weight(&mut self, weight: u64) {
        let old = self.pools[0].weight;
        if old == weight {
            return;
        }
        self.pools[0].weight = weight;
        self.events.push(DistributorEvent::WeightChanged {
            pool: STAKING_POOL_ID,
            old,
            new: weight,
        });
        debug!(old, new = weight, "staking pool re-weighted");
    }
}

impl<L: TokenLedger + std::fmt::Debug> std::fmt::Debug for PoolDistributor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolDistributor")
            .field("owner", &self.owner)
            .field("custody", &self.custody)
            .field("pools", &self.pools.len())
            .field("total_weight", &self.total_weight)
            .field("positions", &self.positions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trickle_core::ledger::MemoryLedger;

    struct Fixture {
        chef: PoolDistributor<MemoryLedger>,
        owner: AccountId,
        admin: AccountId,
        minter: MinterCapability,
    }

    fn acct(label: &str) -> AccountId {
        AccountId::from_label(label)
    }

    fn asset(label: &str) -> AssetId {
        AssetId::from_label(label)
    }

    /// Rate 1000 per step from step 100, no decay within the tested range.
    fn fixture_with(divisor: Option<u64>) -> Fixture {
        let admin = acct("admin");
        let owner = acct("owner");
        let mut ledger = MemoryLedger::new(admin, asset("TRK"));
        let minter = ledger.grant_minter(&admin).unwrap();
        for who in ["alice", "bob"] {
            for lp in ["lp1", "lp2", "lp3"] {
                ledger.issue(&asset(lp), &acct(who), 2000).unwrap();
            }
        }
        let config = DistributorConfig {
            owner,
            schedule: ScheduleParams {
                base_rate: 1000,
                ..ScheduleParams::default()
            },
            start_step: 100,
            staking_weight_divisor: divisor,
            ..DistributorConfig::default()
        };
        let chef = PoolDistributor::new(config, ledger, minter.clone()).unwrap();
        Fixture {
            chef,
            owner,
            admin,
            minter,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Some(3))
    }

    fn at(caller: AccountId, step: Step) -> CallContext {
        CallContext::new(caller, step)
    }

    fn reward_of(chef: &PoolDistributor<MemoryLedger>, who: &AccountId) -> Amount {
        chef.ledger().balance_of(&asset("TRK"), who)
    }

    // ------------------------------------------------------------------
    // construction
    // ------------------------------------------------------------------

    #[test]
    fn new_creates_staking_pool() {
        let f = fixture();
        assert_eq!(f.chef.pool_count(), 1);
        let pool = f.chef.pool(0).unwrap();
        assert!(pool.is_staking_pool());
        assert_eq!(pool.stake_asset, asset("TRK"));
        assert_eq!(pool.weight, 1000);
        assert_eq!(pool.last_settled_step, 100);
        assert_eq!(f.chef.total_weight(), 1000);
        assert_eq!(f.chef.pool_of_asset(&asset("TRK")), Some(0));
    }

    #[test]
    fn new_rejects_revoked_minter() {
        let admin = acct("admin");
        let mut ledger = MemoryLedger::new(admin, asset("TRK"));
        let cap = ledger.grant_minter(&admin).unwrap();
        ledger.revoke_minter(&admin, &cap).unwrap();
        let config = DistributorConfig {
            owner: acct("owner"),
            ..DistributorConfig::default()
        };
        let err = PoolDistributor::new(config, ledger, cap).unwrap_err();
        assert_eq!(err, PoolError::Ledger(LedgerError::MinterRevoked(1)));
    }

    // ------------------------------------------------------------------
    // pools and weights
    // ------------------------------------------------------------------

    #[test]
    fn real_case_weights() {
        let mut f = fixture();
        let ctx = at(f.owner, 20);
        let weights = [2000, 1000, 500, 500, 500, 500, 500, 100, 100];
        for (i, w) in weights.iter().enumerate() {
            let id = f.chef.create_pool(&ctx, *w, asset(&format!("lp{}", i + 1)), true).unwrap();
            assert_eq!(id, i as PoolId + 1);
        }
        assert_eq!(f.chef.pool_count(), 10);
        assert_eq!(f.chef.total_weight(), 7600);
        assert_eq!(f.chef.pool(0).unwrap().weight, 1900);
        let sum: u64 = f.chef.pools().iter().map(|p| p.weight).sum();
        assert_eq!(sum, f.chef.total_weight());
    }

    #[test]
    fn create_pool_owner_only() {
        let mut f = fixture();
        let err = f
            .chef
            .create_pool(&at(acct("mallory"), 1), 10, asset("lp1"), false)
            .unwrap_err();
        assert_eq!(err, PoolError::Unauthorized);
        assert_eq!(f.chef.pool_count(), 1);
    }

    #[test]
    fn duplicate_pool_rejected() {
        let mut f = fixture();
        let ctx = at(f.owner, 1);
        f.chef.create_pool(&ctx, 2000, asset("lp1"), true).unwrap();
        let err = f.chef.create_pool(&ctx, 2000, asset("lp1"), true).unwrap_err();
        assert_eq!(err, PoolError::DuplicatePool(asset("lp1")));
        assert_eq!(f.chef.pool_count(), 2);
        assert_eq!(f.chef.total_weight(), 2000 + 666);
    }

    #[test]
    fn reward_asset_pool_is_duplicate() {
        let mut f = fixture();
        let err = f
            .chef
            .create_pool(&at(f.owner, 1), 10, asset("TRK"), false)
            .unwrap_err();
        assert_eq!(err, PoolError::DuplicatePool(asset("TRK")));
    }

    #[test]
    fn pool_created_after_start_accrues_from_creation() {
        let mut f = fixture();
        let id = f.chef.create_pool(&at(f.owner, 250), 10, asset("lp1"), false).unwrap();
        assert_eq!(f.chef.pool(id).unwrap().last_settled_step, 250);
    }

    #[test]
    fn set_weight_rebalances_staking_pool() {
        let mut f = fixture();
        let ctx = at(f.owner, 1);
        f.chef.create_pool(&ctx, 3000, asset("lp1"), false).unwrap();
        assert_eq!(f.chef.pool(0).unwrap().weight, 1000);
        f.chef.set_weight(&ctx, 1, 600, false).unwrap();
        assert_eq!(f.chef.pool(1).unwrap().weight, 600);
        assert_eq!(f.chef.pool(0).unwrap().weight, 200);
        assert_eq!(f.chef.total_weight(), 800);
    }

    #[test]
    fn staking_weight_overridden_while_divisor_active() {
        let mut f = fixture();
        let ctx = at(f.owner, 1);
        f.chef.create_pool(&ctx, 900, asset("lp1"), false).unwrap();
        f.chef.set_weight(&ctx, 0, 5000, false).unwrap();
        assert_eq!(f.chef.pool(0).unwrap().weight, 300);
    }

    #[test]
    fn manual_staking_weight_without_divisor() {
        let mut f = fixture_with(None);
        let ctx = at(f.owner, 1);
        f.chef.create_pool(&ctx, 900, asset("lp1"), false).unwrap();
        assert_eq!(f.chef.pool(0).unwrap().weight, 1000);
        f.chef.set_weight(&ctx, 0, 5000, false).unwrap();
        assert_eq!(f.chef.pool(0).unwrap().weight, 5000);
        assert_eq!(f.chef.total_weight(), 5900);
    }

    #[test]
    fn staking_weight_kept_while_others_zero() {
        let mut f = fixture();
        let ctx = at(f.owner, 1);
        f.chef.create_pool(&ctx, 0, asset("lp1"), false).unwrap();
        assert_eq!(f.chef.pool(0).unwrap().weight, 1000);
        assert_eq!(f.chef.total_weight(), 1000);
    }

    #[test]
    fn set_weight_unknown_pool() {
        let mut f = fixture();
        let err = f.chef.set_weight(&at(f.owner, 1), 9, 1, false).unwrap_err();
        assert_eq!(err, PoolError::UnknownPool(9));
    }

    // ------------------------------------------------------------------
    // settlement
    // ------------------------------------------------------------------

    #[test]
    fn settling_empty_pool_only_advances_step() {
        let mut f = fixture();
        let supply = f.chef.ledger().total_supply(&asset("TRK"));
        let s = f.chef.settle(&at(acct("anyone"), 150), 0).unwrap();
        assert_eq!(s.minted, 0);
        assert_eq!(s.forfeited, 50 * 1000);
        let pool = f.chef.pool(0).unwrap();
        assert_eq!(pool.last_settled_step, 150);
        assert_eq!(pool.acc_reward_per_unit, 0);
        assert_eq!(f.chef.ledger().total_supply(&asset("TRK")), supply);
    }

    #[test]
    fn settle_is_idempotent() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 3000, asset("lp1"), false).unwrap();
        f.chef.deposit(&at(acct("alice"), 110), lp, 100).unwrap();
        let first = f.chef.settle(&at(acct("bob"), 120), lp).unwrap();
        assert!(first.minted > 0);
        let second = f.chef.settle(&at(acct("bob"), 120), lp).unwrap();
        assert!(second.is_noop());
        let earlier = f.chef.settle(&at(acct("bob"), 115), lp).unwrap();
        assert!(earlier.is_noop());
        assert_eq!(f.chef.pool(lp).unwrap().last_settled_step, 120);
    }

    #[test]
    fn no_accrual_before_start_step() {
        let mut f = fixture();
        f.chef.ledger_mut().issue(&asset("TRK"), &acct("alice"), 100).unwrap();
        f.chef.enter_staking(&at(acct("alice"), 50), 100).unwrap();
        assert_eq!(f.chef.pending_reward(0, &acct("alice"), 100).unwrap(), 0);
        assert_eq!(f.chef.pending_reward(0, &acct("alice"), 101).unwrap(), 1000);
    }

    #[test]
    fn settle_all_settles_every_pool() {
        let mut f = fixture();
        let ctx = at(f.owner, 1);
        f.chef.create_pool(&ctx, 30, asset("lp1"), false).unwrap();
        f.chef.create_pool(&ctx, 30, asset("lp2"), false).unwrap();
        let plans = f.chef.settle_all(&at(f.owner, 140)).unwrap();
        assert_eq!(plans.len(), 3);
        assert!(f.chef.pools().iter().all(|p| p.last_settled_step == 140));
    }

    #[test]
    fn revoked_minter_blocks_settlement_atomically() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 3000, asset("lp1"), false).unwrap();
        f.chef.deposit(&at(acct("alice"), 110), lp, 100).unwrap();
        let admin = f.admin;
        let minter = f.minter.clone();
        f.chef.ledger_mut().revoke_minter(&admin, &minter).unwrap();

        let err = f.chef.withdraw(&at(acct("alice"), 120), lp, 100).unwrap_err();
        assert_eq!(err, PoolError::Ledger(LedgerError::MinterRevoked(minter.grant())));
        assert_eq!(f.chef.pool(lp).unwrap().last_settled_step, 110);
        assert_eq!(f.chef.position(lp, &acct("alice")).unwrap().staked, 100);

        // Emergency exit still works and forfeits the unmintable range.
        let acc = f.chef.pool(lp).unwrap().acc_reward_per_unit;
        assert_eq!(f.chef.emergency_withdraw(&at(acct("alice"), 121), lp).unwrap(), 100);
        assert_eq!(f.chef.ledger().balance_of(&asset("lp1"), &acct("alice")), 2000);
        let pool = f.chef.pool(lp).unwrap();
        assert_eq!((pool.last_settled_step, pool.acc_reward_per_unit), (121, acc));
        assert!(f.chef.events().iter().any(|e| matches!(
            e,
            DistributorEvent::Settled { from: 110, to: 121, minted: 0, forfeited, .. } if *forfeited > 0
        )));
    }

    // ------------------------------------------------------------------
    // participants
    // ------------------------------------------------------------------

    #[test]
    fn real_case() {
        let mut f = fixture();
        let ctx = at(f.owner, 20);
        for (i, w) in [2000, 1000, 500, 500, 500, 500, 500, 100, 100].iter().enumerate() {
            f.chef.create_pool(&ctx, *w, asset(&format!("lp{}", i + 1)), true).unwrap();
        }
        let alice = acct("alice");

        f.chef.deposit(&at(alice, 171), 1, 2000).unwrap();
        assert_eq!(f.chef.ledger().balance_of(&asset("lp1"), &alice), 0);

        let harvested = f.chef.withdraw(&at(alice, 172), 1, 2000).unwrap();
        assert_eq!(harvested, 263);
        assert_eq!(f.chef.ledger().balance_of(&asset("lp1"), &alice), 2000);
        assert_eq!(reward_of(&f.chef, &alice), 263);

        f.chef.enter_staking(&at(alice, 174), 20).unwrap();
        for step in 175..=177 {
            assert_eq!(f.chef.enter_staking(&at(alice, step), 0).unwrap(), 250);
        }
        assert_eq!(reward_of(&f.chef, &alice), 993);
        assert_eq!(f.chef.pool(0).unwrap().weight, 1900);
    }

    #[test]
    fn withdraw_more_than_staked_rejected() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 100, asset("lp1"), false).unwrap();
        let alice = acct("alice");
        f.chef.deposit(&at(alice, 110), lp, 500).unwrap();
        let before = f.chef.position(lp, &alice).unwrap();
        let err = f.chef.withdraw(&at(alice, 120), lp, 501).unwrap_err();
        assert_eq!(err, PoolError::InsufficientStake { have: 500, need: 501 });
        assert_eq!(f.chef.position(lp, &alice).unwrap(), before);
        assert_eq!(f.chef.pool(lp).unwrap().last_settled_step, 110);
    }

    #[test]
    fn deposit_without_funds_leaves_state() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 100, asset("lp1"), false).unwrap();
        let alice = acct("alice");
        f.chef.deposit(&at(alice, 110), lp, 1000).unwrap();
        let supply = f.chef.ledger().total_supply(&asset("TRK"));
        f.chef.drain_events();

        let err = f.chef.deposit(&at(alice, 120), lp, 1001).unwrap_err();
        assert_eq!(
            err,
            PoolError::Ledger(LedgerError::InsufficientBalance { have: 1000, need: 1001 })
        );
        assert_eq!(f.chef.ledger().total_supply(&asset("TRK")), supply);
        assert_eq!(f.chef.pool(lp).unwrap().last_settled_step, 110);
        assert_eq!(reward_of(&f.chef, &alice), 0);
        assert!(f.chef.events().is_empty());
    }

    #[test]
    fn staking_deposit_funded_by_harvest() {
        let mut f = fixture_with(None);
        let alice = acct("alice");
        f.chef.ledger_mut().issue(&asset("TRK"), &alice, 10).unwrap();
        f.chef.enter_staking(&at(alice, 100), 10).unwrap();
        assert_eq!(reward_of(&f.chef, &alice), 0);
        // 10 steps at 1000 all go to pool 0; the harvest covers the deposit.
        let paid = f.chef.enter_staking(&at(alice, 110), 10_000).unwrap();
        assert_eq!(paid, 10_000);
        assert_eq!(reward_of(&f.chef, &alice), 0);
        assert_eq!(f.chef.position(0, &alice).unwrap().staked, 10_010);
    }

    #[test]
    fn pending_matches_harvest() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 700, asset("lp1"), false).unwrap();
        let (alice, bob) = (acct("alice"), acct("bob"));
        f.chef.deposit(&at(alice, 105), lp, 300).unwrap();
        f.chef.deposit(&at(bob, 131), lp, 1700).unwrap();
        for (who, step) in [(alice, 160), (bob, 173), (alice, 199)] {
            let expected = f.chef.pending_reward(lp, &who, step).unwrap();
            assert_eq!(f.chef.deposit(&at(who, step), lp, 0).unwrap(), expected);
        }
    }

    #[test]
    fn short_reserve_caps_payout_but_returns_principal() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 3000, asset("lp1"), false).unwrap();
        let alice = acct("alice");
        f.chef.deposit(&at(alice, 110), lp, 100).unwrap();
        let minted = f.chef.settle(&at(alice, 120), lp).unwrap().minted;
        assert_eq!(minted, 7500);

        let custody = f.chef.custody();
        f.chef
            .ledger_mut()
            .transfer(&asset("TRK"), &custody, &acct("mallory"), minted - 5)
            .unwrap();
        assert_eq!(f.chef.pending_reward(lp, &alice, 120).unwrap(), 7500);

        assert_eq!(f.chef.withdraw(&at(alice, 120), lp, 100).unwrap(), 5);
        assert_eq!(reward_of(&f.chef, &alice), 5);
        assert_eq!(f.chef.ledger().balance_of(&asset("lp1"), &alice), 2000);
        assert_eq!(f.chef.position(lp, &alice).unwrap(), Position::default());
    }

    #[test]
    fn zero_deposit_without_position_creates_nothing() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 700, asset("lp1"), false).unwrap();
        assert_eq!(f.chef.deposit(&at(acct("carol"), 150), lp, 0).unwrap(), 0);
        assert!(f.chef.position(lp, &acct("carol")).is_none());
    }

    #[test]
    fn full_withdraw_keeps_zeroed_position() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 700, asset("lp1"), false).unwrap();
        let alice = acct("alice");
        f.chef.deposit(&at(alice, 120), lp, 40).unwrap();
        f.chef.withdraw(&at(alice, 130), lp, 40).unwrap();
        let pos = f.chef.position(lp, &alice).unwrap();
        assert_eq!(pos.staked, 0);
        assert_eq!(pos.settled_debt, 0);
        assert_eq!(f.chef.pool(lp).unwrap().total_staked, 0);
    }

    #[test]
    fn unknown_pool_rejected() {
        let mut f = fixture();
        let err = f.chef.deposit(&at(acct("alice"), 120), 7, 1).unwrap_err();
        assert_eq!(err, PoolError::UnknownPool(7));
        assert_eq!(f.chef.pending_reward(7, &acct("alice"), 120), Err(PoolError::UnknownPool(7)));
    }

    #[test]
    fn emergency_withdraw_forfeits_pending() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 700, asset("lp1"), false).unwrap();
        let alice = acct("alice");
        f.chef.deposit(&at(alice, 120), lp, 900).unwrap();
        assert!(f.chef.pending_reward(lp, &alice, 150).unwrap() > 0);

        assert_eq!(f.chef.emergency_withdraw(&at(alice, 150), lp).unwrap(), 900);
        assert_eq!(reward_of(&f.chef, &alice), 0);
        assert_eq!(f.chef.position(lp, &alice).unwrap(), Position::default());
        assert_eq!(f.chef.pool(lp).unwrap().total_staked, 0);
        assert_eq!(f.chef.pool(lp).unwrap().last_settled_step, 150);
        assert!(matches!(
            f.chef.events().last(),
            Some(DistributorEvent::EmergencyWithdraw { amount: 900, .. })
        ));
    }

    #[test]
    fn emergency_withdraw_leaves_others_their_share() {
        let mut f = fixture_with(None);
        let lp = f.chef.create_pool(&at(f.owner, 1), 3000, asset("lp1"), false).unwrap();
        let (alice, bob) = (acct("alice"), acct("bob"));
        f.chef.deposit(&at(alice, 100), lp, 100).unwrap();
        f.chef.deposit(&at(bob, 100), lp, 100).unwrap();

        assert_eq!(f.chef.emergency_withdraw(&at(alice, 200), lp).unwrap(), 100);
        assert_eq!(f.chef.pool(lp).unwrap().last_settled_step, 200);
        // Half of 100 steps * 1000 * 3000 / 4000.
        assert_eq!(f.chef.deposit(&at(bob, 200), lp, 0).unwrap(), 37_500);
        assert_eq!(reward_of(&f.chef, &alice), 0);
    }

    #[test]
    fn single_staker_receives_pool_share() {
        let mut f = fixture_with(None);
        let lp = f.chef.create_pool(&at(f.owner, 1), 3000, asset("lp1"), false).unwrap();
        let alice = acct("alice");
        f.chef.deposit(&at(alice, 100), lp, 7).unwrap();
        f.chef.withdraw(&at(alice, 200), lp, 7).unwrap();
        // 100 steps * 1000 * 3000 / 4000, less accumulator rounding.
        let got = reward_of(&f.chef, &alice);
        assert!(got <= 75_000 && 75_000 - got <= 1, "got {got}");
    }

    // ------------------------------------------------------------------
    // schedule forwarding and ownership
    // ------------------------------------------------------------------

    #[test]
    fn rate_change_is_not_retroactive() {
        let mut f = fixture_with(None);
        let alice = acct("alice");
        f.chef.ledger_mut().issue(&asset("TRK"), &alice, 1).unwrap();
        f.chef.enter_staking(&at(alice, 100), 1).unwrap();
        f.chef.set_base_rate(&at(f.owner, 110), 1).unwrap();
        // 10 steps at 1000, then 10 steps at 1.
        assert_eq!(f.chef.pending_reward(0, &alice, 120).unwrap(), 10_010);
        assert_eq!(f.chef.schedule().params().base_rate, 1);
    }

    #[test]
    fn invalid_schedule_change_leaves_pools() {
        let mut f = fixture();
        let err = f.chef.set_decay_numerator(&at(f.owner, 150), 100).unwrap_err();
        assert!(matches!(err, PoolError::Schedule(ScheduleError::InvalidDecayRate { .. })));
        assert_eq!(f.chef.pool(0).unwrap().last_settled_step, 100);
    }

    #[test]
    fn rejected_joint_schedule_change_commits_nothing() {
        let mut f = fixture();
        let before = f.chef.schedule().params().clone();
        let joint = ScheduleParams {
            base_rate: 5,
            decay_numerator: 50,
            decay_denominator: 40,
            ..before.clone()
        };
        let err = f.chef.set_schedule_params(&at(f.owner, 150), joint).unwrap_err();
        assert!(matches!(err, PoolError::Schedule(ScheduleError::InvalidDecayRate { .. })));
        assert_eq!(f.chef.schedule().params(), &before);
        assert_eq!(f.chef.pool(0).unwrap().last_settled_step, 100);
    }

    #[test]
    fn schedule_setters_owner_only() {
        let mut f = fixture();
        assert_eq!(
            f.chef.set_period_length(&at(acct("mallory"), 1), 10),
            Err(PoolError::Unauthorized)
        );
    }

    #[test]
    fn ownership_transfer_moves_schedule_too() {
        let mut f = fixture();
        let next = acct("next-owner");
        f.chef.transfer_ownership(&at(f.owner, 1), next).unwrap();
        assert_eq!(f.chef.owner(), next);
        assert_eq!(f.chef.schedule().owner(), next);
        assert_eq!(
            f.chef.set_epoch_anchor(&at(f.owner, 2), 5),
            Err(PoolError::Unauthorized)
        );
        f.chef.set_epoch_anchor(&at(next, 2), 5).unwrap();
        assert_eq!(f.chef.schedule().params().epoch_anchor, 5);
    }

    // ------------------------------------------------------------------
    // events
    // ------------------------------------------------------------------

    #[test]
    fn drain_empties_the_buffer() {
        let mut f = fixture();
        let lp = f.chef.create_pool(&at(f.owner, 1), 700, asset("lp1"), false).unwrap();
        f.chef.deposit(&at(acct("alice"), 120), lp, 10).unwrap();
        let drained = f.chef.drain_events();
        assert!(drained.len() >= 2);
        assert!(f.chef.events().is_empty());

        f.chef.deposit(&at(acct("alice"), 130), lp, 0).unwrap();
        // Only events from after the drain remain.
        assert!(!f.chef.events().is_empty());
        assert!(!f.chef.events().iter().any(|e| matches!(e, DistributorEvent::PoolCreated { .. })));
        let second = f.chef.drain_events();
        assert!(second.iter().any(|e| matches!(e, DistributorEvent::Harvest { .. })));
        assert!(f.chef.drain_events().is_empty());
    }

    #[test]
    fn deposit_emits_settle_harvest_deposit() {
        let mut f = fixture_with(None);
        let alice = acct("alice");
        f.chef.ledger_mut().issue(&asset("TRK"), &alice, 5).unwrap();
        f.chef.enter_staking(&at(alice, 100), 5).unwrap();
        f.chef.drain_events();

        f.chef.enter_staking(&at(alice, 101), 0).unwrap();
        let events = f.chef.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DistributorEvent::Settled { minted: 1000, .. }));
        assert!(matches!(events[1], DistributorEvent::Harvest { amount: 1000, .. }));
        assert!(matches!(events[2], DistributorEvent::Deposit { amount: 0, .. }));
        assert!(f.chef.events().is_empty());
    }
}

//! Thread-safe handle to a [`PoolDistributor`].
//!
//! Each mutating call holds the write lock for its whole
//! settle-then-mutate sequence, so concurrent callers observe operations as
//! if they ran one after another.

use std::sync::Arc;

use parking_lot::RwLock;
use trickle_core::error::PoolError;
use trickle_core::traits::TokenLedger;
use trickle_core::types::{AccountId, Amount, AssetId, CallContext, PoolId, Step};

use crate::distributor::PoolDistributor;
use crate::events::DistributorEvent;
use crate::pool::{PoolInfo, Position, Settlement};
use crate::state::DistributorState;

/// Cloneable, lock-protected distributor.
pub struct SharedDistributor<L: TokenLedger> {
    inner: Arc<RwLock<PoolDistributor<L>>>,
}

impl<L: TokenLedger> Clone for SharedDistributor<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: TokenLedger> SharedDistributor<L> {
    pub fn new(distributor: PoolDistributor<L>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(distributor)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&PoolDistributor<L>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` under the write lock. Use for multi-call sequences that must
    /// not interleave with other writers.
    pub fn write<R>(&self, f: impl FnOnce(&mut PoolDistributor<L>) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn create_pool(
        &self,
        ctx: &CallContext,
        weight: u64,
        stake_asset: AssetId,
        settle_all_first: bool,
    ) -> Result<PoolId, PoolError> {
        self.inner
            .write()
            .create_pool(ctx, weight, stake_asset, settle_all_first)
    }

    pub fn set_weight(
        &self,
        ctx: &CallContext,
        id: PoolId,
        weight: u64,
        settle_all_first: bool,
    ) -> Result<(), PoolError> {
        self.inner.write().set_weight(ctx, id, weight, settle_all_first)
    }

    pub fn settle(&self, ctx: &CallContext, id: PoolId) -> Result<Settlement, PoolError> {
        self.inner.write().settle(ctx, id)
    }

    pub fn settle_all(&self, ctx: &CallContext) -> Result<Vec<Settlement>, PoolError> {
        self.inner.write().settle_all(ctx)
    }

    pub fn deposit(&self, ctx: &CallContext, id: PoolId, amount: Amount) -> Result<Amount, PoolError> {
        self.inner.write().deposit(ctx, id, amount)
    }

    pub fn withdraw(&self, ctx: &CallContext, id: PoolId, amount: Amount) -> Result<Amount, PoolError> {
        self.inner.write().withdraw(ctx, id, amount)
    }

    pub fn enter_staking(&self, ctx: &CallContext, amount: Amount) -> Result<Amount, PoolError> {
        self.inner.write().enter_staking(ctx, amount)
    }

    pub fn leave_staking(&self, ctx: &CallContext, amount: Amount) -> Result<Amount, PoolError> {
        self.inner.write().leave_staking(ctx, amount)
    }

    pub fn emergency_withdraw(&self, ctx: &CallContext, id: PoolId) -> Result<Amount, PoolError> {
        self.inner.write().emergency_withdraw(ctx, id)
    }

    pub fn pending_reward(&self, id: PoolId, account: &AccountId, step: Step) -> Result<Amount, PoolError> {
        self.inner.read().pending_reward(id, account, step)
    }

    pub fn pool(&self, id: PoolId) -> Option<PoolInfo> {
        self.inner.read().pool(id).cloned()
    }

    pub fn position(&self, id: PoolId, account: &AccountId) -> Option<Position> {
        self.inner.read().position(id, account)
    }

    pub fn total_weight(&self) -> u64 {
        self.inner.read().total_weight()
    }

    pub fn drain_events(&self) -> Vec<DistributorEvent> {
        self.inner.write().drain_events()
    }

    pub fn snapshot(&self) -> DistributorState {
        self.inner.read().snapshot()
    }
}

//! In-memory reference implementation of [`TokenLedger`].
//!
//! Tracks balances of any number of assets in `HashMap`s with no persistence.
//! The reward asset can only be minted through an active
//! [`MinterCapability`]; capabilities are granted and revoked by the ledger
//! admin. Stake assets (and any pre-existing reward supply) are seeded with
//! [`MemoryLedger::issue`].

use std::collections::HashMap;

use rand::RngCore;
use tracing::debug;

use crate::error::LedgerError;
use crate::traits::{MinterCapability, TokenLedger};
use crate::types::{AccountId, Amount, AssetId};

/// In-memory multi-asset ledger.
#[derive(Clone, Debug)]
pub struct MemoryLedger {
    /// Account allowed to grant and revoke minter capabilities.
    admin: AccountId,
    /// The asset minted as emission.
    reward_asset: AssetId,
    /// (asset, account) → balance. Absent entries hold zero.
    balances: HashMap<(AssetId, AccountId), Amount>,
    /// asset → total issued.
    supplies: HashMap<AssetId, Amount>,
    /// Grant id → secret, for every capability currently honoured by `mint`.
    active_minters: HashMap<u64, [u8; 32]>,
    /// Next grant id to hand out.
    next_grant: u64,
}

impl MemoryLedger {
    /// Create an empty ledger administered by `admin`.
    pub fn new(admin: AccountId, reward_asset: AssetId) -> Self {
        Self {
            admin,
            reward_asset,
            balances: HashMap::new(),
            supplies: HashMap::new(),
            active_minters: HashMap::new(),
            next_grant: 1,
        }
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    /// Number of capabilities currently honoured.
    pub fn minter_count(&self) -> usize {
        self.active_minters.len()
    }

    /// Grant the minter role, returning the capability handle.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the admin
    pub fn grant_minter(&mut self, caller: &AccountId) -> Result<MinterCapability, LedgerError> {
        if *caller != self.admin {
            return Err(LedgerError::Unauthorized);
        }
        let grant = self.next_grant;
        self.next_grant += 1;
        let mut secret = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret);
        self.active_minters.insert(grant, secret);
        debug!(grant, "granted minter capability");
        Ok(MinterCapability::new(grant, secret))
    }

    /// Revoke a previously granted capability. Revoking twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] if `caller` is not the admin
    pub fn revoke_minter(
        &mut self,
        caller: &AccountId,
        cap: &MinterCapability,
    ) -> Result<(), LedgerError> {
        if *caller != self.admin {
            return Err(LedgerError::Unauthorized);
        }
        if self.check_minter(cap).is_ok() {
            self.active_minters.remove(&cap.grant());
            debug!(grant = cap.grant(), "revoked minter capability");
        }
        Ok(())
    }

    /// Create `amount` of `asset` out of thin air for `to`.
    ///
    /// Models supply that exists outside the protocol (stake tokens, a
    /// reward-token premine). Not gated: callers are hosts and tests.
    pub fn issue(&mut self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.credit(asset, to, amount)
    }

    fn credit(&mut self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let supply = self
            .total_supply(asset)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let balance = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.supplies.insert(*asset, supply);
        self.balances.insert((*asset, *to), balance);
        Ok(())
    }
}

impl TokenLedger for MemoryLedger {
    fn reward_asset(&self) -> AssetId {
        self.reward_asset
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        *self.balances.get(&(*asset, *account)).unwrap_or(&0)
    }

    fn total_supply(&self, asset: &AssetId) -> Amount {
        *self.supplies.get(asset).unwrap_or(&0)
    }

    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.ensure_balance(asset, from, amount)?;
        if from == to || amount == 0 {
            return Ok(());
        }
        let to_balance = self
            .balance_of(asset, to)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let from_balance = self.balance_of(asset, from) - amount;
        self.balances.insert((*asset, *from), from_balance);
        self.balances.insert((*asset, *to), to_balance);
        Ok(())
    }

    fn check_minter(&self, cap: &MinterCapability) -> Result<(), LedgerError> {
        let honoured = self
            .active_minters
            .get(&cap.grant())
            .is_some_and(|secret| cap.matches(secret));
        if honoured {
            Ok(())
        } else {
            Err(LedgerError::MinterRevoked(cap.grant()))
        }
    }

    fn mint(
        &mut self,
        cap: &MinterCapability,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.check_minter(cap)?;
        let reward = self.reward_asset;
        self.credit(&reward, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (MemoryLedger, AccountId, AssetId) {
        let admin = AccountId::from_label("admin");
        let reward = AssetId::from_label("TRK");
        (MemoryLedger::new(admin, reward), admin, reward)
    }

    #[test]
    fn empty_ledger_has_zero_balances() {
        let (ledger, admin, reward) = setup();
        assert_eq!(ledger.balance_of(&reward, &admin), 0);
        assert_eq!(ledger.total_supply(&reward), 0);
        assert_eq!(ledger.minter_count(), 0);
    }

    #[test]
    fn issue_credits_balance_and_supply() {
        let (mut ledger, _, _) = setup();
        let lp = AssetId::from_label("lp");
        let bob = AccountId::from_label("bob");
        ledger.issue(&lp, &bob, 2000).unwrap();
        assert_eq!(ledger.balance_of(&lp, &bob), 2000);
        assert_eq!(ledger.total_supply(&lp), 2000);
    }

    #[test]
    fn transfer_moves_balance() {
        let (mut ledger, _, _) = setup();
        let lp = AssetId::from_label("lp");
        let bob = AccountId::from_label("bob");
        let alice = AccountId::from_label("alice");
        ledger.issue(&lp, &bob, 100).unwrap();
        ledger.transfer(&lp, &bob, &alice, 40).unwrap();
        assert_eq!(ledger.balance_of(&lp, &bob), 60);
        assert_eq!(ledger.balance_of(&lp, &alice), 40);
        assert_eq!(ledger.total_supply(&lp), 100);
    }

    #[test]
    fn transfer_insufficient_leaves_state() {
        let (mut ledger, _, _) = setup();
        let lp = AssetId::from_label("lp");
        let bob = AccountId::from_label("bob");
        let alice = AccountId::from_label("alice");
        ledger.issue(&lp, &bob, 10).unwrap();
        let err = ledger.transfer(&lp, &bob, &alice, 11).unwrap_err();
        assert_eq!(err, LedgerError::InsufficientBalance { have: 10, need: 11 });
        assert_eq!(ledger.balance_of(&lp, &bob), 10);
        assert_eq!(ledger.balance_of(&lp, &alice), 0);
    }

    #[test]
    fn self_transfer_is_noop() {
        let (mut ledger, _, _) = setup();
        let lp = AssetId::from_label("lp");
        let bob = AccountId::from_label("bob");
        ledger.issue(&lp, &bob, 10).unwrap();
        ledger.transfer(&lp, &bob, &bob, 10).unwrap();
        assert_eq!(ledger.balance_of(&lp, &bob), 10);
    }

    #[test]
    fn only_admin_grants_minter() {
        let (mut ledger, admin, _) = setup();
        let mallory = AccountId::from_label("mallory");
        assert_eq!(ledger.grant_minter(&mallory), Err(LedgerError::Unauthorized));
        let cap = ledger.grant_minter(&admin).unwrap();
        assert!(ledger.check_minter(&cap).is_ok());
        assert_eq!(ledger.minter_count(), 1);
    }

    #[test]
    fn mint_requires_active_capability() {
        let (mut ledger, admin, reward) = setup();
        let chef = AccountId::from_label("chef");
        let cap = ledger.grant_minter(&admin).unwrap();
        ledger.mint(&cap, &chef, 500).unwrap();
        assert_eq!(ledger.balance_of(&reward, &chef), 500);
        assert_eq!(ledger.total_supply(&reward), 500);

        ledger.revoke_minter(&admin, &cap).unwrap();
        assert_eq!(
            ledger.mint(&cap, &chef, 1),
            Err(LedgerError::MinterRevoked(cap.grant()))
        );
        assert_eq!(ledger.total_supply(&reward), 500);
    }

    #[test]
    fn forged_capability_rejected() {
        let (mut ledger, admin, reward) = setup();
        let cap = ledger.grant_minter(&admin).unwrap();
        // Same grant id as the live capability, guessed secret.
        let forged = MinterCapability::new(cap.grant(), [0; 32]);
        assert_eq!(
            ledger.mint(&forged, &AccountId::ZERO, 1),
            Err(LedgerError::MinterRevoked(cap.grant()))
        );
        assert_eq!(ledger.total_supply(&reward), 0);

        // A forged handle cannot revoke the real one either.
        ledger.revoke_minter(&admin, &forged).unwrap();
        assert!(ledger.check_minter(&cap).is_ok());
    }

    #[test]
    fn grants_carry_distinct_secrets() {
        let (mut ledger, admin, _) = setup();
        let a = ledger.grant_minter(&admin).unwrap();
        let b = ledger.grant_minter(&admin).unwrap();
        assert_ne!(a.grant(), b.grant());
        assert_ne!(a, MinterCapability::new(a.grant(), [0; 32]));
        assert_ne!(a, b);
    }

    #[test]
    fn revoke_requires_admin() {
        let (mut ledger, admin, _) = setup();
        let cap = ledger.grant_minter(&admin).unwrap();
        assert_eq!(
            ledger.revoke_minter(&AccountId::ZERO, &cap),
            Err(LedgerError::Unauthorized)
        );
        assert!(ledger.check_minter(&cap).is_ok());
    }

    #[test]
    fn issue_overflow_rejected() {
        let (mut ledger, admin, reward) = setup();
        ledger.issue(&reward, &admin, u128::MAX).unwrap();
        assert_eq!(
            ledger.issue(&reward, &admin, 1),
            Err(LedgerError::ArithmeticOverflow)
        );
        assert_eq!(ledger.total_supply(&reward), u128::MAX);
    }
}

//! Trait interfaces for the Trickle protocol.
//!
//! - [`TokenLedger`]: balances and minting of the reward asset and of every
//!   stake asset (the [`MemoryLedger`](crate::ledger::MemoryLedger) implements
//!   it; hosts may supply their own)
//! - [`MinterCapability`]: the handle that authorises minting, passed
//!   explicitly to whoever is allowed to mint

use crate::error::LedgerError;
use crate::types::{AccountId, Amount, AssetId};

/// Permission to mint the reward asset on one ledger.
///
/// Issued by a ledger when its admin grants the minter role and checked by the
/// ledger on every mint. The grant id names the capability; the secret makes
/// it unforgeable, so ledgers must generate it from a secure random source
/// and compare both halves. Revoking the grant on the ledger invalidates every
/// copy of the handle.
#[derive(Clone, PartialEq, Eq)]
pub struct MinterCapability {
    grant: u64,
    secret: [u8; 32],
}

impl MinterCapability {
    /// Wrap a ledger-specific grant id and its secret. Ledgers call this when
    /// granting.
    pub fn new(grant: u64, secret: [u8; 32]) -> Self {
        Self { grant, secret }
    }

    /// The ledger-specific grant id.
    pub fn grant(&self) -> u64 {
        self.grant
    }

    /// Whether this handle carries `secret`.
    pub fn matches(&self, secret: &[u8; 32]) -> bool {
        self.secret == *secret
    }
}

impl std::fmt::Debug for MinterCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinterCapability")
            .field("grant", &self.grant)
            .finish_non_exhaustive()
    }
}

/// Multi-asset balance ledger with a gated mint for the reward asset.
///
/// All amounts are in base units. Implementations must leave balances
/// untouched when an operation returns an error.
pub trait TokenLedger: Send + Sync {
    /// The asset minted as emission.
    fn reward_asset(&self) -> AssetId;

    /// Balance of `account` in `asset`. Unknown pairs hold zero.
    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount;

    /// Total issued amount of `asset`.
    fn total_supply(&self, asset: &AssetId) -> Amount;

    /// Move `amount` of `asset` between two accounts.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientBalance`] if `from` holds less than `amount`
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Check that a minter capability is currently honoured.
    fn check_minter(&self, cap: &MinterCapability) -> Result<(), LedgerError>;

    /// Mint `amount` of the reward asset to `to`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::MinterRevoked`] if the capability is not active
    /// - [`LedgerError::ArithmeticOverflow`] if the supply would overflow
    fn mint(
        &mut self,
        cap: &MinterCapability,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Fail unless `account` holds at least `need` of `asset`.
    ///
    /// Default implementation compares against [`balance_of`](Self::balance_of).
    fn ensure_balance(
        &self,
        asset: &AssetId,
        account: &AccountId,
        need: Amount,
    ) -> Result<(), LedgerError> {
        let have = self.balance_of(asset, account);
        if have < need {
            return Err(LedgerError::InsufficientBalance { have, need });
        }
        Ok(())
    }
}

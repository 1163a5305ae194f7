//! Core protocol types: account and asset identities, steps, call context.
//!
//! Token amounts are `u128` base units. Steps are `u64` and supplied by the
//! host (typically a block height).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A discrete, monotonically increasing time counter supplied by the host.
pub type Step = u64;

/// Token amount in base units.
pub type Amount = u128;

/// Arena index of a pool. Assigned at creation and never reused.
pub type PoolId = u64;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            Default, bincode::Encode, bincode::Decode,
        )]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// The all-zero identity.
            pub const ZERO: Self = Self([0u8; 32]);

            /// Derive a stable identity from a human-readable label (BLAKE3).
            pub fn from_label(label: &str) -> Self {
                Self(*blake3::hash(label.as_bytes()).as_bytes())
            }

            /// Return the underlying bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Check if this is the zero identity.
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// First eight hex characters, for log lines.
            pub fn short(&self) -> String {
                hex::encode(&self.0[..4])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

id_type!(
    /// Identity of an account: a participant, an owner, or a custody account.
    AccountId
);

id_type!(
    /// Identity of a fungible asset tracked by a ledger.
    ///
    /// Each pool stakes exactly one asset; the reward asset is staked by the
    /// staking pool.
    AssetId
);

/// Host-supplied context of a single entry-point invocation.
///
/// `step` is fixed for the duration of the call.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    /// Account invoking the entry point.
    pub caller: AccountId,
    /// Current step as reported by the host.
    pub step: Step,
}

impl CallContext {
    pub fn new(caller: AccountId, step: Step) -> Self {
        Self { caller, step }
    }
}

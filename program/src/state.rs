//! # Vault Record
//!
//! The durable on-ledger entity: one custody record per (owner, seed).
//!
//! The arithmetic here is the entire protocol. A vault's deadline is
//! `last_check_in + time_interval`, and a vault is expired exactly when
//! `now > deadline` — strictly greater, never `>=`. Everything downstream
//! (release triggers, urgency tiers, reminder emails) keys off that one
//! comparison, so it lives in one place and is checked arithmetic.

use crate::error::VaultError;
use serde::{Deserialize, Serialize};
use vigil_protocol::Address;

/// The on-ledger custody record for one dead man's switch instance.
///
/// Field mutability is enforced by the ledger's instruction handlers, not
/// by visibility: `owner`, `seed`, and `bump` never change after
/// `initialize`; `recipient`, `time_interval`, and `name` are owner-mutable
/// pre-release; `is_released` is monotonic false→true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    /// The party whose liveness the vault watches. Immutable.
    pub owner: Address,
    /// Where custodied value goes after release. Owner-mutable pre-release.
    pub recipient: Address,
    /// Opaque pointer to the encrypted content. The protocol never looks
    /// inside.
    pub content_ref: String,
    /// Opaque pointer/handle to the decryption material.
    pub content_key_ref: String,
    /// Check-in interval in seconds, strictly positive.
    pub time_interval: i64,
    /// Unix seconds of the most recent ping (or creation).
    pub last_check_in: i64,
    /// Monotonic release flag. Never reset.
    pub is_released: bool,
    /// Human-facing label, bounded length.
    pub name: String,
    /// Optional secondary identity authorized to ping. Explicitly a tagged
    /// option so "no delegate" is matched, not sentinel-compared.
    pub delegate: Option<Address>,
    /// Incentive pool paid to whoever triggers release.
    pub bounty_lamports: u64,
    /// Derivation seed, immutable.
    pub seed: u64,
    /// Derivation bump, immutable. Stored so verifiers re-derive without
    /// searching.
    pub bump: u8,
    /// Native-currency custody held for the recipient.
    pub locked_value: u64,
    /// Mint of the secondary asset under custody, set by the first
    /// `lock_tokens`.
    pub token_mint: Option<Address>,
    /// Secondary-asset custody held for the recipient.
    pub locked_tokens: u64,
}

impl VaultRecord {
    /// The instant after which the vault may be released:
    /// `last_check_in + time_interval`, checked.
    pub fn deadline(&self) -> Result<i64, VaultError> {
        self.last_check_in
            .checked_add(self.time_interval)
            .ok_or(VaultError::CalculationOverflow)
    }

    /// Whether `now` is past the deadline. Strict: a vault inspected at
    /// exactly its deadline is not yet expired.
    pub fn is_expired(&self, now: i64) -> Result<bool, VaultError> {
        Ok(now > self.deadline()?)
    }

    /// Seconds remaining until the deadline, negative once past it.
    ///
    /// Returns `None` when the deadline or the subtraction overflows i64 —
    /// such a record is treated as never expiring rather than wrapped into
    /// a bogus urgency.
    pub fn seconds_until_deadline(&self, now: i64) -> Option<i64> {
        self.deadline().ok()?.checked_sub(now)
    }

    /// Whether `signer` may ping this vault: the owner always, the current
    /// delegate while one is set.
    pub fn may_ping(&self, signer: &Address) -> bool {
        *signer == self.owner || self.delegate.as_ref() == Some(signer)
    }
}

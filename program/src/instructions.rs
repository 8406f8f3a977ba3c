//! # Instruction Surface
//!
//! The typed operations callers submit against vault records. Each variant
//! names its target vault except `Initialize`, whose record address is
//! derived from the signer and seed inside the ledger.

use serde::{Deserialize, Serialize};
use vigil_protocol::Address;

/// Parameters for creating a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeParams {
    /// Derivation seed. At most one live record per (owner, seed); the
    /// address frees up again only if the vault is closed.
    pub seed: u64,
    /// Opaque pointer to the encrypted content.
    pub content_ref: String,
    /// Opaque pointer/handle to the decryption material.
    pub content_key_ref: String,
    /// Who may claim after release.
    pub recipient: Address,
    /// Check-in interval in seconds, strictly positive.
    pub time_interval: i64,
    /// Initial bounty pool for the eventual release trigger.
    pub bounty_lamports: u64,
    /// Human-facing label.
    pub name: String,
    /// Native funds locked for the recipient at creation.
    pub locked_value: u64,
}

/// Optional-field update for a vault. `None` leaves the field untouched;
/// `Some` replaces it under the same validation as `initialize`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateVaultParams {
    pub new_recipient: Option<Address>,
    pub new_time_interval: Option<i64>,
    pub new_name: Option<String>,
}

/// A single vault instruction, executed atomically by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Create a record at the address derived from (signer, seed).
    Initialize(InitializeParams),
    /// Re-affirm liveness: reset `last_check_in` to now.
    Ping { vault: Address },
    /// Set or clear the delegate. Owner only.
    SetDelegate {
        vault: Address,
        delegate: Option<Address>,
    },
    /// Replace recipient / interval / name. Owner only, pre-release.
    UpdateVault {
        vault: Address,
        params: UpdateVaultParams,
    },
    /// Grow the bounty pool. Owner only, amount > 0.
    TopUpBounty { vault: Address, amount: u64 },
    /// Move secondary-asset custody into the vault. Owner only,
    /// pre-release; the first lock fixes the vault's mint.
    LockTokens {
        vault: Address,
        mint: Address,
        amount: u64,
    },
    /// Permissionless release once expired. Pays the bounty to the signer.
    TriggerRelease { vault: Address },
    /// Recipient drains the locked native value. Post-release, single-shot.
    ClaimSol { vault: Address },
    /// Recipient drains the locked tokens. Post-release, single-shot.
    ClaimTokens { vault: Address },
    /// Owner reclaims rent and remaining custody, deleting the record.
    CloseVault { vault: Address },
}

impl Instruction {
    /// Stable snake_case name, used for logging and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Initialize(_) => "initialize",
            Instruction::Ping { .. } => "ping",
            Instruction::SetDelegate { .. } => "set_delegate",
            Instruction::UpdateVault { .. } => "update_vault",
            Instruction::TopUpBounty { .. } => "top_up_bounty",
            Instruction::LockTokens { .. } => "lock_tokens",
            Instruction::TriggerRelease { .. } => "trigger_release",
            Instruction::ClaimSol { .. } => "claim_sol",
            Instruction::ClaimTokens { .. } => "claim_tokens",
            Instruction::CloseVault { .. } => "close_vault",
        }
    }
}

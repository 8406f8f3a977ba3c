//! # Vigil Vault Program
//!
//! The on-ledger half of Vigil: the authoritative state machine for vault
//! records, their binary layout, and the devnet arena that hosts them.
//!
//! - **state** — `VaultRecord` and its deadline arithmetic. One record per
//!   (owner, seed), address-derived, strictly `now > deadline` expiry.
//! - **layout** — the fixed binary record encoding scanners and the
//!   program agree on, plus memcmp filters over the fixed-offset fields.
//! - **instructions** — the typed operation surface: initialize, ping,
//!   set_delegate, update_vault, top_up_bounty, lock_tokens,
//!   trigger_release, claim_sol, claim_tokens, close_vault.
//! - **ledger** — the arena executing instructions atomically against
//!   records and balances under host-supplied signer identity and time.
//! - **error** — the error taxonomy, surfaced verbatim all the way to the
//!   UI boundary.
//!
//! ## Design Principles
//!
//! 1. All monetary and timer arithmetic is checked — wrapping arithmetic
//!    and custody do not mix. Overflow surfaces as `CalculationOverflow`.
//! 2. Each instruction is atomic: every check runs before the first write,
//!    so a failed instruction leaves no partial mutation behind.
//! 3. Release is monotonic. `is_released` goes false→true exactly once and
//!    there is no instruction that resets it.

pub mod error;
pub mod instructions;
pub mod layout;
pub mod ledger;
pub mod state;

pub use error::VaultError;
pub use instructions::{InitializeParams, Instruction, UpdateVaultParams};
pub use layout::{DecodeError, MemcmpFilter};
pub use ledger::Ledger;
pub use state::VaultRecord;

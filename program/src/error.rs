//! # Vault Error Taxonomy
//!
//! Every way a vault instruction can fail. These reach callers verbatim —
//! the watchtower and any UI above it relay the exact variant, never a
//! re-mapped generic message — so the wording here is the wording users see.

use thiserror::Error;

/// Errors surfaced by vault instructions.
///
/// The first group is the program's own taxonomy; the second group is the
/// host ledger speaking (account bookkeeping and fund movement). Both are
/// final for the failed instruction: the arena guarantees no partial state
/// change accompanies any of these.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VaultError {
    /// The signer is neither the owner nor an identity authorized for this
    /// operation.
    #[error("unauthorized: signer may not perform this operation")]
    Unauthorized,

    /// `trigger_release` ran while `now <= deadline`.
    #[error("vault is not expired yet")]
    NotExpired,

    /// The vault has already been released; the attempted operation only
    /// makes sense pre-release.
    #[error("vault has already been released")]
    AlreadyReleased,

    /// The vault name exceeds the maximum length.
    #[error("vault name is too long")]
    NameTooLong,

    /// The check-in interval must be strictly positive.
    #[error("time interval must be greater than zero")]
    InvalidTimeInterval,

    /// A zero amount where a positive one is required.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// A claim ran before the vault was released.
    #[error("vault has not been released")]
    NotReleased,

    /// `claim_sol` found nothing to claim.
    #[error("no locked sol to claim")]
    NoLockedSol,

    /// `claim_tokens` found nothing to claim.
    #[error("no locked tokens to claim")]
    NoLockedTokens,

    /// The supplied token mint does not match the mint this vault custodies.
    #[error("token mint does not match the vault's mint")]
    InvalidTokenMint,

    /// Checked arithmetic on a balance or timer overflowed.
    #[error("calculation overflow")]
    CalculationOverflow,

    // -- host ledger classes -------------------------------------------------
    /// `initialize` derived an address that already holds a record. At most
    /// one live record per (owner, seed); close the vault to free the seed.
    #[error("account already in use at the derived address")]
    AccountInUse,

    /// No decodable vault record exists at the target address.
    #[error("account not found")]
    AccountNotFound,

    /// The signer's balance cannot cover the required deposit or transfer.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// A content reference string exceeds the maximum length.
    #[error("content reference is too long")]
    ContentRefTooLong,
}

//! # Capability Tokens
//!
//! Signed, vault-bound, time-limited credentials for wallet-free check-ins.
//!
//! The watchtower emails the owner a link long before a vault expires.
//! Clicking that link must reset the clock without a wallet interaction, so
//! the link carries a capability: `{vault, expires_at}` bincode-encoded,
//! Ed25519-signed by the relay identity under a dedicated domain tag, and
//! base58-armored into a URL-safe string.
//!
//! A capability authenticates — it proves the relay issued a check-in right
//! for *this* vault, still in date. It does not authorize: whether the
//! relay may actually ping the vault is decided by the vault's on-ledger
//! `delegate` field at redemption time, not by anything in the token.

use crate::address::Address;
use crate::config::CAPABILITY_SIGNING_DOMAIN;
use crate::keys::{self, Keypair, Signature, SIGNATURE_LENGTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a presented token failed authentication.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Not base58, too short, or the payload didn't decode. Deliberately
    /// one bucket: attackers don't get a parse oracle.
    #[error("malformed capability token")]
    Malformed,

    /// Decoded fine but the signature doesn't verify against the issuer.
    #[error("capability token signature does not match the issuer")]
    BadSignature,

    /// Genuine token, past its lifetime.
    #[error("capability token expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },
}

/// The claims inside a capability token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    vault: Address,
    expires_at: i64,
}

impl Capability {
    /// Claims for `vault`, valid strictly before `expires_at`.
    pub fn new(vault: Address, expires_at: i64) -> Self {
        Self { vault, expires_at }
    }

    /// The vault this capability is bound to. Redemption must compare this
    /// against the requested vault exactly — a token is never transferable
    /// to a different vault.
    pub fn vault(&self) -> Address {
        self.vault
    }

    /// Expiry as unix seconds. The token is valid while `now < expires_at`.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Sign and armor these claims into the wire string that goes in the
    /// check-in URL.
    pub fn encode(&self, issuer: &Keypair) -> Result<String, CapabilityError> {
        let payload = bincode::serialize(self).map_err(|_| CapabilityError::Malformed)?;
        let signature = issuer.sign(&signing_bytes(&payload));
        let mut wire = payload;
        wire.extend_from_slice(signature.as_bytes());
        Ok(bs58::encode(wire).into_string())
    }

    /// Authenticate a wire token against `issuer` at time `now`.
    ///
    /// Checks run in order: decode, signature, expiry. On success the
    /// verified claims come back; binding the claims to a specific vault
    /// and to the vault's current delegate is the caller's job.
    pub fn verify(issuer: &Address, token: &str, now: i64) -> Result<Self, CapabilityError> {
        let wire = bs58::decode(token)
            .into_vec()
            .map_err(|_| CapabilityError::Malformed)?;
        if wire.len() <= SIGNATURE_LENGTH {
            return Err(CapabilityError::Malformed);
        }
        let (payload, sig_bytes) = wire.split_at(wire.len() - SIGNATURE_LENGTH);
        let capability: Capability =
            bincode::deserialize(payload).map_err(|_| CapabilityError::Malformed)?;
        let sig_arr: [u8; SIGNATURE_LENGTH] = sig_bytes
            .try_into()
            .map_err(|_| CapabilityError::Malformed)?;
        let signature = Signature::from_bytes(sig_arr);
        if !keys::verify(issuer, &signing_bytes(payload), &signature) {
            return Err(CapabilityError::BadSignature);
        }
        if now >= capability.expires_at {
            return Err(CapabilityError::Expired {
                expires_at: capability.expires_at,
                now,
            });
        }
        Ok(capability)
    }
}

// Domain-tagged message a capability signature covers. Without the tag, a
// capability signature would be a valid signature over raw bincode bytes
// that some other subsystem might one day also sign.
fn signing_bytes(payload: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(CAPABILITY_SIGNING_DOMAIN.len() + payload.len());
    msg.extend_from_slice(CAPABILITY_SIGNING_DOMAIN);
    msg.extend_from_slice(payload);
    msg
}

//! # Key Management
//!
//! Ed25519 keypairs and signatures for Vigil identities.
//!
//! Owners, recipients, bounty hunters, and the watchtower's relay identity
//! are all Ed25519 keypairs; their addresses are their public key bytes.
//! Vault records are the only addresses without keys (see
//! [`crate::address::derive_vault_address`]).
//!
//! ## Security considerations
//!
//! - Key generation uses the OS RNG (`OsRng`). If that is compromised,
//!   this protocol is the least of your worries.
//! - Secret key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use crate::address::Address;
use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Errors from key material handling.
///
/// Intentionally vague about *why* something failed — error messages that
/// describe key material are a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key bytes: wrong length or malformed encoding")]
    InvalidSecretKey,
}

/// A Vigil identity keypair wrapping an Ed25519 signing key.
///
/// Deliberately does NOT implement `Serialize`/`Deserialize`. Persisting a
/// private key should be a conscious act via
/// [`secret_key_bytes`](Self::secret_key_bytes), not something that happens
/// because a keypair ended up inside a response struct.
pub struct Keypair {
    signing_key: SigningKey,
}

/// An Ed25519 signature over a message.
///
/// Stored as `Vec<u8>` for serde compatibility, but always exactly 64
/// bytes when produced by [`Keypair::sign`]. A signature of any other
/// length simply fails verification — no panics, just `false`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Keypair {
    /// Generate a fresh keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// The seed *is* the Ed25519 secret key. Feed this weak bytes and you
    /// get a weak identity; use a CSPRNG or a KDF.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Load a keypair from a hex-encoded secret key, as stored by
    /// `vigil-watchtower init` key files.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// The ledger address of this identity: its public key bytes.
    pub fn address(&self) -> Address {
        Address::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    ///
    /// Ed25519 is deterministic — same key, same message, same signature.
    /// No nonce management, no RNG at signing time.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    /// Verify a signature against this keypair's own address.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        verify(&self.address(), message, signature)
    }

    /// Export the raw 32-byte secret. Handle with care: this is the whole
    /// identity. Don't log it, don't ship it over plaintext channels.
    pub fn secret_key_bytes(&self) -> [u8; SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// The underlying dalek verifying key, for callers that talk to
    /// ed25519-dalek directly.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl Clone for Keypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    /// Every copy of a private key is another thing to protect.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material, not even "partially". A partial leak
        // is still a leak.
        write!(f, "Keypair({})", self.address())
    }
}

impl PartialEq for Keypair {
    /// Keypairs are equal when their addresses match. Comparing secret
    /// material in non-constant time is a habit we don't want.
    fn eq(&self, other: &Self) -> bool {
        self.address() == other.address()
    }
}

impl Eq for Keypair {}

/// Verify `signature` over `message` against `signer`.
///
/// Returns `false` for any failure: bad signature, wrong length, or a
/// signer address that isn't a valid curve point (derived vault addresses
/// can never verify anything, which is the point of deriving them
/// off-curve).
pub fn verify(signer: &Address, message: &[u8], signature: &Signature) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(signer.as_bytes()) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; SIGNATURE_LENGTH]>::try_from(signature.bytes.as_slice()) else {
        return false;
    };
    let sig = DalekSignature::from_bytes(&sig_bytes);
    verifying_key.verify(message, &sig).is_ok()
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

impl Signature {
    /// Wrap a raw 64-byte signature.
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Hex rendering, 128 characters for a valid signature.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 16 {
            write!(f, "Signature({}..)", &hex_str[..16])
        } else {
            write!(f, "Signature({hex_str})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::derive_vault_address;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = Keypair::generate();
        let msg = b"I am alive, reset the clock";
        let sig = kp.sign(msg);
        assert!(kp.verify(msg, &sig));
        assert!(verify(&kp.address(), msg, &sig));
    }

    #[test]
    fn wrong_message_fails() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"correct message");
        assert!(!kp.verify(b"wrong message", &sig));
    }

    #[test]
    fn wrong_signer_fails() {
        let kp1 = Keypair::generate();
        let kp2 = Keypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!verify(&kp2.address(), b"message", &sig));
    }

    #[test]
    fn off_curve_address_never_verifies() {
        let kp = Keypair::generate();
        let (vault, _) = derive_vault_address(&kp.address(), 1);
        let sig = kp.sign(b"message");
        assert!(!verify(&vault, b"message", &sig));
    }

    #[test]
    fn from_seed_is_deterministic() {
        let seed = [42u8; 32];
        assert_eq!(Keypair::from_seed(&seed), Keypair::from_seed(&seed));
    }

    #[test]
    fn hex_roundtrip() {
        let kp = Keypair::generate();
        let hex_str = hex::encode(kp.secret_key_bytes());
        let restored = Keypair::from_hex(&hex_str).unwrap();
        assert_eq!(kp.address(), restored.address());
    }

    #[test]
    fn from_hex_tolerates_trailing_newline() {
        // Key files written with `echo` happen. Accept them.
        let kp = Keypair::generate();
        let hex_str = format!("{}\n", hex::encode(kp.secret_key_bytes()));
        assert_eq!(Keypair::from_hex(&hex_str).unwrap().address(), kp.address());
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(Keypair::from_hex("deadbeef").is_err());
        assert!(Keypair::from_hex("not-hex-at-all").is_err());
    }

    #[test]
    fn signatures_are_deterministic() {
        let kp = Keypair::generate();
        let msg = b"determinism is underrated";
        assert_eq!(kp.sign(msg), kp.sign(msg));
    }

    #[test]
    fn truncated_signature_fails_closed() {
        let kp = Keypair::generate();
        let mut sig = kp.sign(b"message");
        sig.bytes.truncate(32);
        assert!(!kp.verify(b"message", &sig));
    }

    #[test]
    fn two_generated_keypairs_differ() {
        // If this fails, the RNG is broken and you should panic (the
        // emotion, not the macro).
        assert_ne!(Keypair::generate(), Keypair::generate());
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = Keypair::generate();
        let dbg = format!("{kp:?}");
        assert!(dbg.starts_with("Keypair("));
        assert!(!dbg.contains(&hex::encode(kp.secret_key_bytes())));
    }
}

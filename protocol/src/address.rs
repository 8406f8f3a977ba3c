//! # Addresses
//!
//! 32-byte account addresses and deterministic vault address derivation.
//!
//! An [`Address`] is just 32 bytes. Most of them are Ed25519 public keys
//! (someone holds the signing key); vault record addresses are the
//! deliberate exception — they are derived from `(owner, seed)` and bump
//! searched until the result is *not* a valid curve point, so no signing
//! key for a vault address can exist. The vault's authority is its program
//! logic, not a keyholder.
//!
//! Addresses render as base58 everywhere a human might see them (logs,
//! JSON, URLs) and as raw bytes everywhere a machine does (record layout,
//! bincode payloads).

use crate::config::VAULT_DERIVATION_DOMAIN;
use ed25519_dalek::VerifyingKey;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Address length in bytes. Everything in this protocol is 32 bytes wide.
pub const ADDRESS_LENGTH: usize = 32;

/// Errors from parsing address material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid address length: expected {ADDRESS_LENGTH} bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid base58 address string")]
    InvalidBase58,
}

/// A 32-byte ledger address.
///
/// `Copy` on purpose — addresses are passed around constantly and a 32-byte
/// copy is cheaper than the cognitive overhead of borrowing them everywhere.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wrap raw bytes as an address. No validation — any 32 bytes are a
    /// syntactically valid address (off-curve ones just can't sign).
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice, rejecting anything but exactly 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; ADDRESS_LENGTH] = slice
            .try_into()
            .map_err(|_| AddressError::InvalidLength(slice.len()))?;
        Ok(Self(bytes))
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// Copy the raw bytes out.
    pub fn to_bytes(self) -> [u8; ADDRESS_LENGTH] {
        self.0
    }

    /// Base58 rendering, the canonical human-facing form.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parse a base58 string. Rejects non-base58 characters and any decoded
    /// length other than 32 bytes.
    pub fn from_base58(s: &str) -> Result<Self, AddressError> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|_| AddressError::InvalidBase58)?;
        Self::try_from_slice(&bytes)
    }

    /// Whether these bytes decompress to a valid Ed25519 point. `true`
    /// means a signing key *could* exist for this address; derived vault
    /// addresses always report `false`.
    pub fn is_on_curve(&self) -> bool {
        VerifyingKey::from_bytes(&self.0).is_ok()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full base58 in Debug is 44 characters of noise per address.
        let b58 = self.to_base58();
        write!(f, "Address({})", &b58[..b58.len().min(8)])
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// Serde — base58 strings for humans, raw bytes for machines
// ---------------------------------------------------------------------------

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base58())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

struct AddressVisitor;

impl<'de> Visitor<'de> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a base58 string or 32 raw bytes")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Address, E> {
        Address::from_base58(v).map_err(de::Error::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Address, E> {
        Address::try_from_slice(v).map_err(de::Error::custom)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Address, A::Error> {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        if seq.next_element::<u8>()?.is_some() {
            return Err(de::Error::invalid_length(ADDRESS_LENGTH + 1, &self));
        }
        Ok(Address(bytes))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(AddressVisitor)
        } else {
            deserializer.deserialize_bytes(AddressVisitor)
        }
    }
}

// ---------------------------------------------------------------------------
// Vault address derivation
// ---------------------------------------------------------------------------

/// Derive the record address for `(owner, seed)`, returning the address and
/// the bump byte that produced it.
///
/// The digest is BLAKE3 over the derivation domain, the owner bytes, the
/// seed (little-endian), and a bump byte searched downward from 255 until
/// the output fails to decompress as an Ed25519 point. The off-curve
/// requirement is what makes vault addresses keyless; the bump is stored in
/// the record so verifiers can re-derive without searching.
///
/// Derivation is deterministic: the same `(owner, seed)` always lands on
/// the same `(address, bump)`.
pub fn derive_vault_address(owner: &Address, seed: u64) -> (Address, u8) {
    for bump in (0..=u8::MAX).rev() {
        let mut hasher = blake3::Hasher::new();
        hasher.update(VAULT_DERIVATION_DOMAIN);
        hasher.update(owner.as_bytes());
        hasher.update(&seed.to_le_bytes());
        hasher.update(&[bump]);
        let digest: [u8; ADDRESS_LENGTH] = hasher.finalize().into();
        let candidate = Address::new(digest);
        if !candidate.is_on_curve() {
            return (candidate, bump);
        }
    }
    // A valid-point digest occurs with probability ~1/2 per bump, so 256
    // consecutive hits requires a broken hash function.
    unreachable!("no off-curve bump found for vault address derivation")
}

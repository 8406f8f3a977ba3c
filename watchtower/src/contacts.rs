//! # Contact Directory
//!
//! Off-ledger mapping from vault addresses to notification emails. The
//! ledger knows nothing about email; this is the watchtower's own
//! lookaside data, resolved in one batched call per scan.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use vigil_protocol::Address;

/// Notification addresses registered for one vault. Either side may be
/// absent; the dispatcher counts the gap instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultContacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("contact lookup failed: {0}")]
    Lookup(String),

    #[error("failed to load contacts file: {0}")]
    Load(String),
}

/// Lookup service for vault notification contacts.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Contacts for every requested vault that has any on file. One
    /// batched call per scan, never one call per vault.
    async fn emails_for(
        &self,
        vaults: &[Address],
    ) -> Result<HashMap<Address, VaultContacts>, ContactError>;
}

/// Directory backed by an in-process map, loadable from a JSON file of
/// the shape `{ "<vault address>": { "owner_email": ..., "recipient_email": ... } }`.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: DashMap<Address, VaultContacts>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a directory from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ContactError> {
        let parsed: HashMap<Address, VaultContacts> =
            serde_json::from_str(json).map_err(|e| ContactError::Load(e.to_string()))?;
        let directory = Self::new();
        for (vault, contacts) in parsed {
            directory.entries.insert(vault, contacts);
        }
        Ok(directory)
    }

    /// Load a directory from a JSON file on disk.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ContactError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ContactError::Load(format!("{}: {e}", path.as_ref().display()))
        })?;
        Self::from_json(&text)
    }

    /// Register (or replace) the contacts for a vault.
    pub fn insert(&self, vault: Address, contacts: VaultContacts) {
        self.entries.insert(vault, contacts);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ContactDirectory for InMemoryDirectory {
    async fn emails_for(
        &self,
        vaults: &[Address],
    ) -> Result<HashMap<Address, VaultContacts>, ContactError> {
        Ok(vaults
            .iter()
            .filter_map(|vault| {
                self.entries
                    .get(vault)
                    .map(|entry| (*vault, entry.value().clone()))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use vigil_protocol::Keypair;

    fn contacts(owner: &str, recipient: &str) -> VaultContacts {
        VaultContacts {
            owner_email: Some(owner.to_string()),
            recipient_email: Some(recipient.to_string()),
        }
    }

    #[tokio::test]
    async fn batched_lookup_returns_only_known_vaults() {
        let directory = InMemoryDirectory::new();
        let known = Keypair::generate().address();
        let unknown = Keypair::generate().address();
        directory.insert(known, contacts("owner@example.com", "heir@example.com"));

        let found = directory.emails_for(&[known, unknown]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[&known].owner_email.as_deref(),
            Some("owner@example.com")
        );
        assert!(!found.contains_key(&unknown));
    }

    #[tokio::test]
    async fn partial_contacts_are_preserved() {
        let directory = InMemoryDirectory::new();
        let vault = Keypair::generate().address();
        directory.insert(
            vault,
            VaultContacts {
                owner_email: None,
                recipient_email: Some("heir@example.com".to_string()),
            },
        );

        let found = directory.emails_for(&[vault]).await.unwrap();
        assert!(found[&vault].owner_email.is_none());
        assert_eq!(found[&vault].recipient_email.as_deref(), Some("heir@example.com"));
    }

    #[test]
    fn loads_from_json_keyed_by_address() {
        let vault = Keypair::generate().address();
        let json = format!(
            r#"{{ "{vault}": {{ "owner_email": "owner@example.com" }} }}"#
        );
        let directory = InMemoryDirectory::from_json(&json).expect("parses");
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = InMemoryDirectory::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ContactError::Load(_)));
    }

    #[test]
    fn loads_from_file() {
        let vault = Keypair::generate().address();
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{ "{vault}": {{ "owner_email": "o@example.com", "recipient_email": "r@example.com" }} }}"#
        )
        .unwrap();

        let directory = InMemoryDirectory::from_json_file(file.path()).expect("loads");
        assert_eq!(directory.len(), 1);
    }
}

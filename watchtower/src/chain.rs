//! # Chain Client
//!
//! The watchtower's view of the ledger, behind a trait so the monitor,
//! bridge, and API are written against an interface rather than a
//! concrete backend. [`InProcessChain`] is the devnet backend: the ledger
//! arena under an async lock, with optional write-through persistence.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use vigil_program::{Instruction, Ledger, MemcmpFilter, VaultError};
use vigil_protocol::{Address, Keypair};

use crate::store::VaultStore;

/// Errors crossing the chain boundary.
///
/// The two variants fail differently: a transport error means the ledger
/// could not be consulted at all and the whole operation should abort; a
/// program error is the ledger's verdict on one instruction and is final
/// for that submission.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("ledger transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Program(#[from] VaultError),
}

/// Read and submit access to the ledger hosting vault records.
///
/// Submission takes the signer keypair itself: possession of the key is
/// the authentication, mirroring how a wallet signs before an RPC send.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Raw account snapshots matching every filter, sorted by address.
    async fn accounts(&self, filters: &[MemcmpFilter]) -> Result<Vec<(Address, Vec<u8>)>, ChainError>;

    /// Raw bytes of one account, `None` if the address holds nothing.
    async fn account(&self, address: &Address) -> Result<Option<Vec<u8>>, ChainError>;

    /// Execute one instruction as `signer`. Returns the target vault
    /// address (for `initialize`, the newly derived one).
    async fn submit(&self, signer: &Keypair, instruction: Instruction) -> Result<Address, ChainError>;

    /// Current ledger time in unix seconds.
    async fn now(&self) -> Result<i64, ChainError>;
}

/// Devnet backend: the arena itself, serialized behind an `RwLock`.
///
/// Scans take the read lock; `submit` takes the write lock for the whole
/// check-then-commit unit, so instructions are serialized exactly as the
/// ledger requires. When a store is attached, every successful submit is
/// followed by a best-effort snapshot.
pub struct InProcessChain {
    ledger: Arc<RwLock<Ledger>>,
    store: Option<VaultStore>,
}

impl InProcessChain {
    /// A chain over `ledger` with no persistence.
    pub fn new(ledger: Arc<RwLock<Ledger>>) -> Self {
        Self {
            ledger,
            store: None,
        }
    }

    /// A chain that snapshots into `store` after each successful submit.
    pub fn with_store(ledger: Arc<RwLock<Ledger>>, store: VaultStore) -> Self {
        Self {
            ledger,
            store: Some(store),
        }
    }

    /// Direct handle to the arena, for devnet tooling and tests.
    pub fn ledger(&self) -> Arc<RwLock<Ledger>> {
        Arc::clone(&self.ledger)
    }
}

#[async_trait]
impl ChainClient for InProcessChain {
    async fn accounts(&self, filters: &[MemcmpFilter]) -> Result<Vec<(Address, Vec<u8>)>, ChainError> {
        Ok(self.ledger.read().await.scan(filters))
    }

    async fn account(&self, address: &Address) -> Result<Option<Vec<u8>>, ChainError> {
        Ok(self.ledger.read().await.account_bytes(address))
    }

    async fn submit(&self, signer: &Keypair, instruction: Instruction) -> Result<Address, ChainError> {
        let name = instruction.name();
        let mut ledger = self.ledger.write().await;
        let vault = ledger.execute(&signer.address(), instruction)?;
        tracing::debug!(instruction = name, vault = %vault, "instruction committed");

        // The arena is the source of truth; a failed snapshot is a
        // durability gap the next successful one closes.
        if let Some(store) = &self.store {
            if let Err(err) = store.persist(&ledger) {
                tracing::warn!(error = %err, "ledger snapshot failed");
            }
        }
        Ok(vault)
    }

    async fn now(&self) -> Result<i64, ChainError> {
        Ok(self.ledger.read().await.clock().now())
    }
}

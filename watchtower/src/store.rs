//! # Vault Store
//!
//! Sled-backed persistence for the devnet ledger arena. The in-memory
//! [`Ledger`] stays the source of truth; the store is a write-through
//! mirror that survives restarts.
//!
//! ## Tree Layout
//!
//! | Tree             | Key                    | Value               |
//! |------------------|------------------------|---------------------|
//! | `accounts`       | address (32B)          | raw record bytes    |
//! | `balances`       | address (32B)          | lamports (8B LE)    |
//! | `token_balances` | mint + holder (64B)    | amount (8B LE)      |
//! | `meta`           | key (UTF-8)            | value (bytes)       |
//!
//! Record bytes are persisted exactly as the program wrote them, so a
//! reloaded ledger scans byte-for-byte identically — including any
//! partially-written record the scanner would skip.
//!
//! ## Durability
//!
//! [`VaultStore::persist`] rebuilds each tree from the arena in one
//! atomic `Batch` per tree and then flushes. The snapshot is not atomic
//! *across* trees; a write torn between trees surfaces on load as a
//! missing record or a zero balance, and the next persist repairs it.

use sled::{Batch, Db, Tree};
use std::path::Path;
use vigil_program::Ledger;
use vigil_protocol::address::ADDRESS_LENGTH;
use vigil_protocol::config::RECORD_LAYOUT_VERSION;
use vigil_protocol::{Address, Clock};

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("corrupt store entry: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Well-known `meta` keys.
const META_SCHEMA_VERSION: &[u8] = b"schema_version";
const META_LAST_PERSIST: &[u8] = b"last_persist_unix";

/// Persistent mirror of the ledger arena.
///
/// sled trees support lock-free concurrent reads and serialized writes,
/// so the store can be shared across tasks by cloning (all handles point
/// at the same database).
#[derive(Debug, Clone)]
pub struct VaultStore {
    db: Db,
    /// Raw record bytes by derived vault address.
    accounts: Tree,
    /// Native lamport balances by address.
    balances: Tree,
    /// Secondary-asset balances by concatenated (mint, holder) key.
    token_balances: Tree,
    /// Schema version and bookkeeping.
    meta: Tree,
}

impl VaultStore {
    /// Open or create a store at `path`. Refuses to open a store written
    /// under a different record layout version.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// An in-memory store that vanishes on drop. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let accounts = db.open_tree("accounts")?;
        let balances = db.open_tree("balances")?;
        let token_balances = db.open_tree("token_balances")?;
        let meta = db.open_tree("meta")?;

        match meta.get(META_SCHEMA_VERSION)? {
            Some(stored) => {
                let stored = u16::from_le_bytes(stored.as_ref().try_into().map_err(|_| {
                    StoreError::Corrupt("schema version is not 2 bytes".to_string())
                })?);
                if stored != RECORD_LAYOUT_VERSION {
                    return Err(StoreError::Corrupt(format!(
                        "store written under record layout v{stored}, this build reads v{RECORD_LAYOUT_VERSION}"
                    )));
                }
            }
            None => {
                meta.insert(META_SCHEMA_VERSION, &RECORD_LAYOUT_VERSION.to_le_bytes())?;
            }
        }

        Ok(Self {
            db,
            accounts,
            balances,
            token_balances,
            meta,
        })
    }

    /// Write a full snapshot of the arena.
    ///
    /// Each tree is cleared and rebuilt in one batch so deleted records
    /// (closed vaults) do not linger in the store.
    pub fn persist(&self, ledger: &Ledger) -> StoreResult<()> {
        let mut accounts = Batch::default();
        for (address, bytes) in ledger.iter_records() {
            accounts.insert(address.as_bytes(), bytes.clone());
        }
        self.accounts.clear()?;
        self.accounts.apply_batch(accounts)?;

        let mut balances = Batch::default();
        for (address, lamports) in ledger.iter_balances() {
            balances.insert(address.as_bytes(), &lamports.to_le_bytes());
        }
        self.balances.clear()?;
        self.balances.apply_batch(balances)?;

        let mut tokens = Batch::default();
        for ((mint, holder), amount) in ledger.iter_token_balances() {
            tokens.insert(token_key(mint, holder).as_slice(), &amount.to_le_bytes());
        }
        self.token_balances.clear()?;
        self.token_balances.apply_batch(tokens)?;

        self.meta
            .insert(META_LAST_PERSIST, &ledger.clock().now().to_le_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    /// Rebuild a ledger arena from the store, reading time from `clock`.
    pub fn load(&self, clock: Clock) -> StoreResult<Ledger> {
        let mut records = Vec::with_capacity(self.accounts.len());
        for entry in self.accounts.iter() {
            let (key, value) = entry?;
            let address = decode_address(&key)?;
            records.push((address, value.to_vec()));
        }

        let mut balances = Vec::with_capacity(self.balances.len());
        for entry in self.balances.iter() {
            let (key, value) = entry?;
            balances.push((decode_address(&key)?, decode_u64(&value)?));
        }

        let mut token_balances = Vec::with_capacity(self.token_balances.len());
        for entry in self.token_balances.iter() {
            let (key, value) = entry?;
            if key.len() != 2 * ADDRESS_LENGTH {
                return Err(StoreError::Corrupt(format!(
                    "token balance key is {} bytes, expected {}",
                    key.len(),
                    2 * ADDRESS_LENGTH
                )));
            }
            let mint = decode_address(&key[..ADDRESS_LENGTH])?;
            let holder = decode_address(&key[ADDRESS_LENGTH..])?;
            token_balances.push(((mint, holder), decode_u64(&value)?));
        }

        Ok(Ledger::restore(clock, records, balances, token_balances))
    }

    /// Clock reading at the time of the last snapshot, if any.
    pub fn last_persist_unix(&self) -> StoreResult<Option<i64>> {
        match self.meta.get(META_LAST_PERSIST)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
                    StoreError::Corrupt("last_persist_unix is not 8 bytes".to_string())
                })?;
                Ok(Some(i64::from_le_bytes(raw)))
            }
            None => Ok(None),
        }
    }

    /// Number of record accounts in the store.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Block until pending writes are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn token_key(mint: &Address, holder: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(2 * ADDRESS_LENGTH);
    key.extend_from_slice(mint.as_bytes());
    key.extend_from_slice(holder.as_bytes());
    key
}

fn decode_address(bytes: &[u8]) -> StoreResult<Address> {
    Address::try_from_slice(bytes)
        .map_err(|_| StoreError::Corrupt(format!("address key is {} bytes", bytes.len())))
}

fn decode_u64(bytes: &[u8]) -> StoreResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::Corrupt(format!("amount value is {} bytes", bytes.len())))?;
    Ok(u64::from_le_bytes(raw))
}

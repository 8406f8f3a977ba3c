//! # Account Scanner
//!
//! Fetches tagged accounts from the chain and decodes them into vault
//! snapshots. One malformed record must never take down a scan of
//! hundreds of healthy ones, so decoding failures are logged, counted,
//! and excluded rather than propagated.

use vigil_program::{layout, MemcmpFilter, VaultRecord};
use vigil_protocol::Address;

use crate::chain::{ChainClient, ChainError};

/// One decoded vault as of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSnapshot {
    pub address: Address,
    pub record: VaultRecord,
}

/// Result of decoding one batch of accounts.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Successfully decoded records, in scan order.
    pub snapshots: Vec<VaultSnapshot>,
    /// Tagged accounts whose bytes did not decode.
    pub skipped: usize,
}

/// Decode a batch of raw accounts, skipping the undecodable.
pub fn decode_accounts(accounts: Vec<(Address, Vec<u8>)>) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    for (address, bytes) in accounts {
        match layout::decode(&bytes) {
            Ok(record) => outcome.snapshots.push(VaultSnapshot { address, record }),
            Err(err) => {
                tracing::warn!(account = %address, error = %err, "skipping undecodable vault record");
                outcome.skipped += 1;
            }
        }
    }
    outcome
}

/// Every vault record on the chain.
pub async fn scan_all(chain: &dyn ChainClient) -> Result<ScanOutcome, ChainError> {
    let accounts = chain.accounts(&[MemcmpFilter::record_tag()]).await?;
    Ok(decode_accounts(accounts))
}

/// Vault records owned by `owner`.
pub async fn scan_owner(chain: &dyn ChainClient, owner: &Address) -> Result<ScanOutcome, ChainError> {
    let accounts = chain
        .accounts(&[MemcmpFilter::record_tag(), MemcmpFilter::owner(owner)])
        .await?;
    Ok(decode_accounts(accounts))
}

/// Vault records naming `recipient`.
pub async fn scan_recipient(
    chain: &dyn ChainClient,
    recipient: &Address,
) -> Result<ScanOutcome, ChainError> {
    let accounts = chain
        .accounts(&[MemcmpFilter::record_tag(), MemcmpFilter::recipient(recipient)])
        .await?;
    Ok(decode_accounts(accounts))
}

//! # Delegate Check-In Bridge
//!
//! Turns emailed capability tokens into on-ledger pings.
//!
//! The watchtower holds a single relay keypair. Owners who want wallet-free
//! check-ins set that relay as their vault's delegate; from then on the
//! reminder emails carry a link whose token the bridge issued. Redemption
//! runs a strict gate, in order:
//!
//! 1. authenticate the token against the relay identity (decode, signature,
//!    expiry);
//! 2. bind it: the token's embedded vault must equal the requested vault;
//! 3. authorize: re-read the record and require its *current* delegate to
//!    be the relay, so revocation beats any outstanding token;
//! 4. submit the ping signed by the relay and let the ledger have the last
//!    word.
//!
//! Steps 1–2 fail as authentication errors, step 3 as authorization errors,
//! step 4 surfaces the ledger's own verdict. The HTTP layer leans on that
//! split to choose between 401, 403, and the ledger-mapped statuses.

use std::sync::Arc;

use vigil_program::{layout, Instruction, VaultError};
use vigil_protocol::{Address, Capability, CapabilityError, Keypair};

use crate::chain::{ChainClient, ChainError};

/// Why a check-in link could not be turned into a ping.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The token itself is bad: malformed, forged, or expired.
    #[error(transparent)]
    Authentication(#[from] CapabilityError),

    /// The token is genuine but bound to a different vault.
    #[error("token is bound to vault {bound}, not {requested}")]
    VaultMismatch { bound: Address, requested: Address },

    /// The vault's current delegate is not the relay. Covers revocation
    /// and vaults that never delegated at all.
    #[error("relay is not the current delegate for vault {vault}")]
    NotDelegate { vault: Address },

    /// The ledger refused the ping or could not be reached.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// The relay side of wallet-free check-ins.
pub struct DelegateBridge {
    relay: Keypair,
    chain: Arc<dyn ChainClient>,
}

impl DelegateBridge {
    pub fn new(relay: Keypair, chain: Arc<dyn ChainClient>) -> Self {
        Self { relay, chain }
    }

    /// The identity owners must set as their vault's delegate for this
    /// bridge to be able to ping on their behalf.
    pub fn relay_address(&self) -> Address {
        self.relay.address()
    }

    /// Issue a check-in token for `vault`, valid for `ttl_secs` of ledger
    /// time from now.
    ///
    /// Issuance does not consult the record: a token is a signed claim,
    /// not a promise that redemption will succeed. Whether the relay may
    /// actually ping is decided fresh at redemption.
    pub async fn issue(&self, vault: Address, ttl_secs: i64) -> Result<String, BridgeError> {
        let now = self.chain.now().await?;
        let expires_at = now.saturating_add(ttl_secs);
        let token = Capability::new(vault, expires_at).encode(&self.relay)?;
        tracing::debug!(vault = %vault, expires_at, "issued check-in token");
        Ok(token)
    }

    /// Redeem `token` as a ping against `vault`, returning the pinged
    /// address on success.
    pub async fn redeem(&self, vault: Address, token: &str) -> Result<Address, BridgeError> {
        let now = self.chain.now().await?;
        let capability = Capability::verify(&self.relay.address(), token, now)?;

        if capability.vault() != vault {
            return Err(BridgeError::VaultMismatch {
                bound: capability.vault(),
                requested: vault,
            });
        }

        // Delegate status is read from the ledger at redemption time, not
        // from anything inside the token: clearing the delegate invalidates
        // every outstanding token in one stroke.
        let bytes = self
            .chain
            .account(&vault)
            .await?
            .ok_or(ChainError::Program(VaultError::AccountNotFound))?;
        let record = layout::decode(&bytes)
            .map_err(|_| ChainError::Program(VaultError::AccountNotFound))?;
        if record.delegate != Some(self.relay.address()) {
            return Err(BridgeError::NotDelegate { vault });
        }

        let pinged = self
            .chain
            .submit(&self.relay, Instruction::Ping { vault })
            .await?;
        tracing::info!(vault = %pinged, "relayed check-in committed");
        Ok(pinged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::InProcessChain;
    use tokio::sync::RwLock;
    use vigil_program::{InitializeParams, Ledger};
    use vigil_protocol::config::{RECORD_RENT_LAMPORTS, SECONDS_PER_DAY};
    use vigil_protocol::Clock;

    const NOW: i64 = 1_700_000_000;

    struct Harness {
        chain: Arc<InProcessChain>,
        bridge: DelegateBridge,
        owner: Keypair,
        vault: Address,
    }

    async fn harness() -> Harness {
        let ledger = Arc::new(RwLock::new(Ledger::new(Clock::manual(NOW))));
        let chain = Arc::new(InProcessChain::new(Arc::clone(&ledger)));
        let relay = Keypair::generate();
        let owner = Keypair::generate();
        let recipient = Keypair::generate();

        ledger
            .write()
            .await
            .airdrop(&owner.address(), 10 * RECORD_RENT_LAMPORTS)
            .unwrap();
        let vault = chain
            .submit(
                &owner,
                Instruction::Initialize(InitializeParams {
                    seed: 1,
                    content_ref: "ipfs://bafy-estate".into(),
                    content_key_ref: String::new(),
                    recipient: recipient.address(),
                    time_interval: 30 * SECONDS_PER_DAY,
                    bounty_lamports: 0,
                    name: "estate".into(),
                    locked_value: 0,
                }),
            )
            .await
            .unwrap();
        chain
            .submit(
                &owner,
                Instruction::SetDelegate {
                    vault,
                    delegate: Some(relay.address()),
                },
            )
            .await
            .unwrap();

        let bridge = DelegateBridge::new(relay, chain.clone() as Arc<dyn ChainClient>);
        Harness {
            chain,
            bridge,
            owner,
            vault,
        }
    }

    async fn advance(chain: &InProcessChain, secs: i64) {
        assert!(chain.ledger().read().await.clock().advance(secs));
    }

    #[tokio::test]
    async fn issued_token_redeems_as_a_ping() {
        let h = harness().await;
        let token = h.bridge.issue(h.vault, SECONDS_PER_DAY).await.unwrap();

        advance(&h.chain, 3_600).await;
        let pinged = h.bridge.redeem(h.vault, &token).await.unwrap();
        assert_eq!(pinged, h.vault);

        let record = h.chain.ledger().read().await.record(&h.vault).unwrap();
        assert_eq!(record.last_check_in, NOW + 3_600);
    }

    #[tokio::test]
    async fn token_for_another_vault_is_rejected() {
        let h = harness().await;
        let other = derive_other_vault(&h).await;
        let token = h.bridge.issue(other, SECONDS_PER_DAY).await.unwrap();

        let err = h.bridge.redeem(h.vault, &token).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::VaultMismatch { bound, requested }
                if bound == other && requested == h.vault
        ));
    }

    /// A second vault for the same owner, also delegated to the relay.
    async fn derive_other_vault(h: &Harness) -> Address {
        let recipient = Keypair::generate();
        let other = h
            .chain
            .submit(
                &h.owner,
                Instruction::Initialize(InitializeParams {
                    seed: 2,
                    content_ref: String::new(),
                    content_key_ref: String::new(),
                    recipient: recipient.address(),
                    time_interval: 30 * SECONDS_PER_DAY,
                    bounty_lamports: 0,
                    name: "other".into(),
                    locked_value: 0,
                }),
            )
            .await
            .unwrap();
        h.chain
            .submit(
                &h.owner,
                Instruction::SetDelegate {
                    vault: other,
                    delegate: Some(h.bridge.relay_address()),
                },
            )
            .await
            .unwrap();
        other
    }

    #[tokio::test]
    async fn revocation_invalidates_outstanding_tokens() {
        let h = harness().await;
        let token = h.bridge.issue(h.vault, SECONDS_PER_DAY).await.unwrap();

        h.chain
            .submit(
                &h.owner,
                Instruction::SetDelegate {
                    vault: h.vault,
                    delegate: None,
                },
            )
            .await
            .unwrap();

        let err = h.bridge.redeem(h.vault, &token).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotDelegate { vault } if vault == h.vault));
    }

    #[tokio::test]
    async fn expired_token_fails_authentication() {
        let h = harness().await;
        let token = h.bridge.issue(h.vault, 100).await.unwrap();

        advance(&h.chain, 100).await;
        let err = h.bridge.redeem(h.vault, &token).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Authentication(CapabilityError::Expired { .. })
        ));
    }

    #[tokio::test]
    async fn garbage_token_fails_authentication() {
        let h = harness().await;
        let err = h.bridge.redeem(h.vault, "not-a-token").await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Authentication(CapabilityError::Malformed)
        ));
    }

    #[tokio::test]
    async fn unknown_vault_surfaces_account_not_found() {
        let h = harness().await;
        let ghost = Keypair::generate().address();
        let token = h.bridge.issue(ghost, SECONDS_PER_DAY).await.unwrap();

        let err = h.bridge.redeem(ghost, &token).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Chain(ChainError::Program(VaultError::AccountNotFound))
        ));
    }

    #[tokio::test]
    async fn released_vault_fails_at_the_ledger() {
        let h = harness().await;
        let token = h.bridge.issue(h.vault, 60 * SECONDS_PER_DAY).await.unwrap();

        advance(&h.chain, 30 * SECONDS_PER_DAY + 1).await;
        let hunter = Keypair::generate();
        h.chain
            .submit(&hunter, Instruction::TriggerRelease { vault: h.vault })
            .await
            .unwrap();

        let err = h.bridge.redeem(h.vault, &token).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Chain(ChainError::Program(VaultError::AlreadyReleased))
        ));
    }
}

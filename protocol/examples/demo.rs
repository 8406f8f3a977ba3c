//! Walkthrough of the Vigil protocol primitives: identities, vault address
//! derivation, and the capability tokens behind wallet-free check-ins.
//!
//! Run with:
//!   cargo run --example demo

use vigil_protocol::address::derive_vault_address;
use vigil_protocol::capability::{Capability, CapabilityError};
use vigil_protocol::config::DEFAULT_CAPABILITY_TTL_SECS;
use vigil_protocol::keys::Keypair;

fn main() {
    println!("== Vigil protocol demo ==\n");

    // 1. Identities. The owner controls the vault; the relay is the
    //    watchtower identity that signs check-in links.
    let owner = Keypair::generate();
    let relay = Keypair::generate();
    println!("owner address: {}", owner.address());
    println!("relay address: {}\n", relay.address());

    // 2. Vault address derivation: deterministic for (owner, seed), and
    //    always off the Ed25519 curve so no private key can ever sign
    //    for the record itself.
    let seed = 1;
    let (vault, bump) = derive_vault_address(&owner.address(), seed);
    println!("vault address: {vault} (seed {seed}, bump {bump})");
    println!("on curve:      {}\n", vault.is_on_curve());

    // 3. A check-in capability: vault-bound claims signed by the relay,
    //    armored into a URL-safe token.
    let now = 1_700_000_000;
    let expires_at = now + DEFAULT_CAPABILITY_TTL_SECS;
    let token = Capability::new(vault, expires_at)
        .encode(&relay)
        .expect("encode capability");
    println!("token:         {token}");
    println!("token length:  {} chars\n", token.len());

    // 4. Verification succeeds against the relay, in date.
    let claims = Capability::verify(&relay.address(), &token, now).expect("verify capability");
    println!("verified:      vault {} until {}", claims.vault(), claims.expires_at());

    // 5. The same token is worthless to an impostor issuer and after expiry.
    let impostor = Keypair::generate();
    let forged = Capability::verify(&impostor.address(), &token, now);
    println!("wrong issuer:  {:?}", forged.unwrap_err());
    let stale = Capability::verify(&relay.address(), &token, expires_at);
    match stale.unwrap_err() {
        CapabilityError::Expired { expires_at, now } => {
            println!("after expiry:  expired at {expires_at} (checked at {now})");
        }
        other => println!("after expiry:  unexpected {other:?}"),
    }
}

// Copyright (c) 2026 Vigil Systems. MIT License.
// See LICENSE for details.

//! # Vigil Protocol — Core Library
//!
//! Shared primitives for Vigil: a dead man's switch custody protocol. An
//! owner locks funds and an encrypted-content reference behind a timer,
//! re-affirms liveness by pinging, and if the timer ever lapses, anyone may
//! flip the vault to its released state so the designated recipient can
//! claim what was custodied.
//!
//! This crate holds everything the on-ledger program and the off-ledger
//! watchtower agree on but neither owns:
//!
//! - **address** — 32-byte account addresses and the deterministic
//!   owner+seed vault address derivation (off-curve on purpose).
//! - **keys** — Ed25519 keypairs and signatures. Don't roll your own.
//! - **clock** — unix-seconds time source, swappable for tests. A custody
//!   protocol whose tests depend on the wall clock is a custody protocol
//!   with flaky tests.
//! - **capability** — signed, vault-bound, time-limited tokens that let an
//!   email link trigger a ping without a wallet in sight.
//! - **config** — protocol constants and service defaults.
//!
//! ## Design Philosophy
//!
//! 1. Correctness over performance (expiry math has no fast path).
//! 2. Checked arithmetic anywhere a timer or a balance is involved.
//! 3. If it touches custody, it has tests. Plural.

pub mod address;
pub mod capability;
pub mod clock;
pub mod config;
pub mod keys;

pub use address::{derive_vault_address, Address, AddressError};
pub use capability::{Capability, CapabilityError};
pub use clock::Clock;
pub use keys::{Keypair, Signature};

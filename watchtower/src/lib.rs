//! # Vigil Watchtower
//!
//! The off-ledger half of Vigil: everything that reads vault records and
//! acts on what it finds. Three concerns live here, behind one binary:
//!
//! - the monitor pipeline (`scanner` → `classifier` → `dispatcher`,
//!   orchestrated by `monitor`), which turns raw ledger accounts into
//!   reminder emails and funds-available notices;
//! - the delegate bridge (`bridge`), which redeems emailed capability
//!   tokens into on-ledger pings without a wallet in the loop;
//! - the HTTP surface (`api`), which fronts both for operators and for
//!   the check-in links themselves.
//!
//! `chain` abstracts the ledger so the whole pipeline runs identically
//! against the in-process devnet arena and, later, a real RPC backend.
//! The binary in `main.rs` wires these modules together; integration
//! tests drive them against an in-process chain directly.

pub mod api;
pub mod bridge;
pub mod chain;
pub mod classifier;
pub mod cli;
pub mod contacts;
pub mod dispatcher;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod scanner;
pub mod store;

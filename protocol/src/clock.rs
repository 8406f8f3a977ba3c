//! # Clock
//!
//! The protocol's single source of unix-seconds time.
//!
//! Everything here turns on `now > deadline`, so time must be injectable:
//! the program, the classifier, and the bridge all take a [`Clock`] instead
//! of calling the wall clock themselves. Production hands them
//! [`Clock::system`]; tests and the devnet time-warp hand them
//! [`Clock::manual`] and move it by hand.

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A cloneable unix-seconds time source.
///
/// Clones share state: advancing one manual clone advances them all, which
/// is exactly what a ledger and a watchtower holding "the same" clock need.
#[derive(Clone, Debug, Default)]
pub struct Clock {
    // None = wall clock; Some = shared manual time.
    frozen: Option<Arc<AtomicI64>>,
}

impl Clock {
    /// The wall clock.
    pub fn system() -> Self {
        Self { frozen: None }
    }

    /// A manual clock starting at `now` unix seconds. It only moves when
    /// told to.
    pub fn manual(now: i64) -> Self {
        Self {
            frozen: Some(Arc::new(AtomicI64::new(now))),
        }
    }

    /// Current unix seconds.
    pub fn now(&self) -> i64 {
        match &self.frozen {
            Some(cell) => cell.load(Ordering::SeqCst),
            None => Utc::now().timestamp(),
        }
    }

    /// Whether this clock is manually driven.
    pub fn is_manual(&self) -> bool {
        self.frozen.is_some()
    }

    /// Move a manual clock forward (or backward, for the truly adventurous)
    /// by `secs`. Returns `false` on a system clock, which does not take
    /// instructions from anyone.
    pub fn advance(&self, secs: i64) -> bool {
        match &self.frozen {
            Some(cell) => {
                cell.fetch_add(secs, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Set a manual clock to an absolute timestamp. Returns `false` on a
    /// system clock.
    pub fn set(&self, now: i64) -> bool {
        match &self.frozen {
            Some(cell) => {
                cell.store(now, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

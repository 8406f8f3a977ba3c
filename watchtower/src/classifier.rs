//! # Status Classifier
//!
//! Pure time arithmetic: sorts scanned vaults into "already expired" and
//! three reminder tiers keyed off seconds until deadline. No I/O, no
//! side effects, so the whole decision table is unit-testable.

use serde::{Deserialize, Serialize};
use vigil_protocol::config::{FINAL_THRESHOLD_SECS, URGENT_THRESHOLD_SECS, WARNING_THRESHOLD_SECS};

use crate::scanner::VaultSnapshot;

/// Reminder tier for a vault approaching its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    /// Less than a day left.
    Final,
    /// Less than three days left.
    Urgent,
    /// Less than a week left.
    Warning,
}

impl Urgency {
    /// Tier for a vault with `seconds_left` on the clock, `None` outside
    /// every warning window. Callers handle expiry before asking.
    pub fn from_seconds_left(seconds_left: i64) -> Option<Self> {
        if seconds_left <= FINAL_THRESHOLD_SECS {
            Some(Urgency::Final)
        } else if seconds_left <= URGENT_THRESHOLD_SECS {
            Some(Urgency::Urgent)
        } else if seconds_left <= WARNING_THRESHOLD_SECS {
            Some(Urgency::Warning)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Final => "final",
            Urgency::Urgent => "urgent",
            Urgency::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classifier's verdict over one scan.
#[derive(Debug, Default, Clone)]
pub struct Classification {
    /// Past the deadline, not yet released. Candidates for a
    /// funds-available notice and a release trigger.
    pub expired: Vec<VaultSnapshot>,
    /// Inside a warning window, paired with the tier.
    pub warnings: Vec<(VaultSnapshot, Urgency)>,
}

/// Sort `snapshots` into expiry and warning buckets as of `now`.
///
/// Released vaults never classify: their story is over. A vault whose
/// deadline arithmetic overflows i64 effectively never expires, so it is
/// skipped rather than wrapped into a bogus tier.
///
/// The expiry boundary here is inclusive where the release boundary is
/// strict: at the deadline instant a vault is one second from releasable,
/// which for a notice is the same thing.
pub fn classify(snapshots: &[VaultSnapshot], now: i64) -> Classification {
    let mut classification = Classification::default();
    for snapshot in snapshots {
        if snapshot.record.is_released {
            continue;
        }
        let Some(seconds_left) = snapshot.record.seconds_until_deadline(now) else {
            continue;
        };
        if seconds_left <= 0 {
            classification.expired.push(snapshot.clone());
        } else if let Some(urgency) = Urgency::from_seconds_left(seconds_left) {
            classification.warnings.push((snapshot.clone(), urgency));
        }
    }
    classification
}

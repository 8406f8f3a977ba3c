//! # Protocol Configuration & Constants
//!
//! Every magic number in Vigil lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are load-bearing for records already on the ledger:
//! the record tag, the field bounds, and the derivation domains cannot change
//! without a migration. The service defaults at the bottom are merely
//! opinions and can be overridden from the CLI.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Record Identification
// ---------------------------------------------------------------------------

/// The 8-byte type tag that opens every vault record. Scanners filter on
/// this before attempting a decode, so any buffer that doesn't start with
/// these bytes is simply not ours.
pub const RECORD_TAG: [u8; 8] = *b"VGLVAULT";

/// Record layout version. Bump on any change to the binary layout — old
/// records with an unknown version are skipped by scanners, not guessed at.
pub const RECORD_LAYOUT_VERSION: u16 = 1;

/// The crate/protocol version string, assembled at compile time.
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// Field Bounds
// ---------------------------------------------------------------------------

/// Maximum vault name length in bytes. Enough for "grandma's estate plan",
/// not enough for the estate plan itself.
pub const MAX_NAME_BYTES: usize = 64;

/// Maximum length in bytes for the opaque content reference strings
/// (`content_ref` and `content_key_ref`). These are pointers into an
/// external content-addressed store, and no addressing scheme we know of
/// needs more than this.
pub const MAX_CONTENT_REF_BYTES: usize = 256;

// ---------------------------------------------------------------------------
// Custody Economics
// ---------------------------------------------------------------------------

/// Native balance reserved per vault record for its ledger storage, in
/// lamports. Refunded to the owner when the vault is closed.
pub const RECORD_RENT_LAMPORTS: u64 = 2_560_000;

/// Lamports per whole native unit. Nine decimals, same as the ledgers this
/// protocol grew up on.
pub const LAMPORTS_PER_UNIT: u64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// Timing & Urgency Tiers
// ---------------------------------------------------------------------------

/// Seconds per day. Written once, here, so nobody ever types 84600 again.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Time-to-deadline at or under which a vault is in its final warning
/// window (one day).
pub const FINAL_THRESHOLD_SECS: i64 = SECONDS_PER_DAY;

/// Time-to-deadline at or under which a vault is urgent (three days).
pub const URGENT_THRESHOLD_SECS: i64 = 3 * SECONDS_PER_DAY;

/// Time-to-deadline at or under which a vault gets its first warning
/// (seven days). Beyond this horizon the classifier stays quiet.
pub const WARNING_THRESHOLD_SECS: i64 = 7 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Derivation & Signing Domains
// ---------------------------------------------------------------------------

/// Domain tag for vault address derivation. Keeps vault addresses in a
/// hash domain no signature or token can collide into.
pub const VAULT_DERIVATION_DOMAIN: &[u8] = b"vigil:vault:v1";

/// Domain tag prefixed to capability token payloads before signing, so a
/// capability signature can never double as a signature over anything else.
pub const CAPABILITY_SIGNING_DOMAIN: &[u8] = b"vigil:capability:v1";

/// Default lifetime of an issued capability token. Check-in emails go out
/// at most a week before the deadline, so a week is exactly as long as a
/// link needs to live.
pub const DEFAULT_CAPABILITY_TTL_SECS: i64 = 7 * SECONDS_PER_DAY;

// ---------------------------------------------------------------------------
// Service Defaults
// ---------------------------------------------------------------------------

/// Default watchtower API port.
pub const DEFAULT_API_PORT: u16 = 8750;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 8751;

/// Upper bound on a single outbound notification send. A mail relay that
/// takes longer than this counts as a failed send, not a stalled batch.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the batched contact-directory lookup.
pub const CONTACT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tag_is_readable_ascii() {
        // The tag shows up in hexdumps and block explorers. Keep it legible.
        assert!(RECORD_TAG.iter().all(|b| b.is_ascii_alphanumeric()));
        assert_eq!(RECORD_TAG.len(), 8);
    }

    #[test]
    fn urgency_thresholds_are_strictly_ordered() {
        // Final < urgent < warning, or the classifier's tier ordering breaks.
        assert!(FINAL_THRESHOLD_SECS < URGENT_THRESHOLD_SECS);
        assert!(URGENT_THRESHOLD_SECS < WARNING_THRESHOLD_SECS);
        assert!(FINAL_THRESHOLD_SECS > 0);
    }

    #[test]
    fn thresholds_match_day_arithmetic() {
        assert_eq!(FINAL_THRESHOLD_SECS, 86_400);
        assert_eq!(URGENT_THRESHOLD_SECS, 3 * 86_400);
        assert_eq!(WARNING_THRESHOLD_SECS, 7 * 86_400);
    }

    #[test]
    fn derivation_domains_are_distinct() {
        assert_ne!(VAULT_DERIVATION_DOMAIN, CAPABILITY_SIGNING_DOMAIN);
    }

    #[test]
    fn service_ports_do_not_collide() {
        assert_ne!(DEFAULT_API_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn name_bound_fits_in_layout_prefix() {
        // Name lengths are encoded as a 4-byte LE prefix on the ledger.
        assert!(MAX_NAME_BYTES <= u32::MAX as usize);
        assert!(MAX_CONTENT_REF_BYTES <= u32::MAX as usize);
    }

    #[test]
    fn timeouts_are_nonzero() {
        assert!(SEND_TIMEOUT.as_millis() > 0);
        assert!(CONTACT_LOOKUP_TIMEOUT.as_millis() > 0);
    }
}

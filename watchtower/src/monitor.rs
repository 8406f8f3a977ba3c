//! # Monitor Runs
//!
//! One monitor run is the whole watchtower read path executed once:
//! scan every vault record, classify against the ledger clock, dispatch
//! notifications, and fold the result into a serializable [`MonitorReport`].
//!
//! Runs are stateless and idempotent from the pipeline's point of view —
//! all state lives in the ledger and in recipients' inboxes — so the
//! scheduler (cron, the `/monitor/run` endpoint, the `scan` subcommand)
//! can fire them as often as it likes. A transport failure aborts the run
//! before any mail goes out; everything below that degrades per vault.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vigil_protocol::Address;

use crate::chain::{ChainClient, ChainError};
use crate::classifier::{self, Urgency};
use crate::dispatcher::{DispatchSummary, Dispatcher};
use crate::metrics::SharedMetrics;
use crate::scanner;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A vault past its deadline and not yet released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiredEntry {
    pub address: Address,
    pub name: String,
    pub seconds_overdue: i64,
}

/// A live vault inside one of the warning windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarningEntry {
    pub address: Address,
    pub name: String,
    pub urgency: Urgency,
    pub seconds_left: i64,
}

/// Everything one run saw and did. Served verbatim from `/monitor/run`
/// and printed by the `scan` subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorReport {
    pub run_id: Uuid,
    /// Wall-clock completion time, RFC 3339.
    pub completed_at: String,
    /// Ledger time the classification used, unix seconds.
    pub ledger_time: i64,
    /// Decoded vault records, released ones included.
    pub total_vaults: usize,
    /// Accounts carrying the record tag that failed to decode.
    pub skipped_records: usize,
    pub expired: Vec<ExpiredEntry>,
    pub warnings: Vec<WarningEntry>,
    pub dispatch: DispatchSummary,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// The assembled pipeline: a chain to scan and a dispatcher to notify.
pub struct Monitor {
    chain: Arc<dyn ChainClient>,
    dispatcher: Dispatcher,
    metrics: SharedMetrics,
}

impl Monitor {
    pub fn new(chain: Arc<dyn ChainClient>, dispatcher: Dispatcher, metrics: SharedMetrics) -> Self {
        Self {
            chain,
            dispatcher,
            metrics,
        }
    }

    /// Execute one full run.
    ///
    /// Only a chain failure is fatal; undecodable records and undeliverable
    /// mail are counted in the report and the run completes.
    pub async fn run(&self) -> Result<MonitorReport, ChainError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(run = %run_id, "monitor run started");

        let now = self.chain.now().await?;
        let outcome = scanner::scan_all(self.chain.as_ref()).await?;
        self.metrics.scans_total.inc();
        self.metrics
            .decode_failures_total
            .inc_by(outcome.skipped as u64);
        self.metrics
            .vaults_watched
            .set(outcome.snapshots.len() as i64);

        let classification = classifier::classify(&outcome.snapshots, now);
        self.metrics
            .expired_vaults
            .set(classification.expired.len() as i64);
        self.metrics
            .warning_vaults
            .set(classification.warnings.len() as i64);

        let dispatch = self.dispatcher.dispatch(&classification).await;
        self.metrics
            .recipient_notices_total
            .inc_by(dispatch.recipient_notices as u64);
        self.metrics
            .reminders_sent_total
            .inc_by(dispatch.reminders_sent() as u64);
        self.metrics
            .sends_failed_total
            .inc_by(dispatch.failed_sends as u64);

        let duration = started.elapsed();
        self.metrics
            .scan_duration_seconds
            .observe(duration.as_secs_f64());

        let expired = classification
            .expired
            .iter()
            .map(|snapshot| ExpiredEntry {
                address: snapshot.address,
                name: snapshot.record.name.clone(),
                seconds_overdue: snapshot
                    .record
                    .seconds_until_deadline(now)
                    .map(|left| left.saturating_neg())
                    .unwrap_or(0),
            })
            .collect();
        let warnings = classification
            .warnings
            .iter()
            .map(|(snapshot, urgency)| WarningEntry {
                address: snapshot.address,
                name: snapshot.record.name.clone(),
                urgency: *urgency,
                seconds_left: snapshot.record.seconds_until_deadline(now).unwrap_or(0),
            })
            .collect();

        let report = MonitorReport {
            run_id,
            completed_at: chrono::Utc::now().to_rfc3339(),
            ledger_time: now,
            total_vaults: outcome.snapshots.len(),
            skipped_records: outcome.skipped,
            expired,
            warnings,
            dispatch,
            duration_ms: duration.as_millis() as u64,
        };
        tracing::info!(
            run = %run_id,
            vaults = report.total_vaults,
            expired = report.expired.len(),
            warnings = report.warnings.len(),
            skipped = report.skipped_records,
            notices = report.dispatch.recipient_notices,
            reminders = report.dispatch.reminders_sent(),
            duration_ms = report.duration_ms,
            "monitor run finished"
        );
        Ok(report)
    }
}

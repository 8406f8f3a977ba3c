//! # Notification Dispatcher
//!
//! Turns a classification into outbound mail. The contract is blunt:
//! `dispatch` never fails. A missing contact, a dead mail transport, or
//! a hung send affects exactly one notification — everything else still
//! goes out, and the damage is tallied in the returned summary.
//!
//! The dispatcher holds no memory of previous runs. If the same vault is
//! still in a warning window next scan, its owner is reminded again;
//! suppression and de-duplication belong to whoever schedules the runs.

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vigil_protocol::config::{CONTACT_LOOKUP_TIMEOUT, SEND_TIMEOUT};

use crate::classifier::{Classification, Urgency};
use crate::contacts::ContactDirectory;
use crate::scanner::VaultSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport failed: {0}")]
    Transport(String),
}

/// Outbound mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Default transport: writes each notification to the log instead of the
/// wire. A deployment swaps in a real transport behind the same trait.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, "notification (log transport)");
        Ok(())
    }
}

/// A capture transport for tests and rehearsal runs: records every send
/// instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in completion order.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        self.sent.lock().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// What one dispatch run accomplished. Counts are deterministic for a
/// given classification and contact set, independent of send ordering.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Funds-available notices delivered to recipients.
    pub recipient_notices: usize,
    /// Delivered reminders, by tier.
    pub final_reminders: usize,
    pub urgent_reminders: usize,
    pub warning_reminders: usize,
    /// Vaults that classified but had no usable contact on file.
    pub missing_contacts: usize,
    /// Sends that failed or timed out.
    pub failed_sends: usize,
}

impl DispatchSummary {
    /// Reminders delivered across all tiers.
    pub fn reminders_sent(&self) -> usize {
        self.final_reminders + self.urgent_reminders + self.warning_reminders
    }
}

enum Category {
    Recipient,
    Reminder(Urgency),
}

struct Job {
    category: Category,
    to: String,
    subject: String,
    body: String,
}

/// Fans a classification out to the people who asked to hear about it.
pub struct Dispatcher {
    directory: Arc<dyn ContactDirectory>,
    mailer: Arc<dyn Mailer>,
}

impl Dispatcher {
    pub fn new(directory: Arc<dyn ContactDirectory>, mailer: Arc<dyn Mailer>) -> Self {
        Self { directory, mailer }
    }

    /// Send every notice the classification calls for.
    ///
    /// Contact lookup happens once for the union of affected vaults. A
    /// lookup failure downgrades every vault to "no contact on file"
    /// rather than aborting; per-send failures and timeouts are isolated
    /// and counted.
    pub async fn dispatch(&self, classification: &Classification) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        let affected: Vec<_> = classification
            .expired
            .iter()
            .map(|s| s.address)
            .chain(classification.warnings.iter().map(|(s, _)| s.address))
            .collect();
        if affected.is_empty() {
            return summary;
        }

        let contacts =
            match tokio::time::timeout(CONTACT_LOOKUP_TIMEOUT, self.directory.emails_for(&affected))
                .await
            {
                Ok(Ok(contacts)) => contacts,
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "contact lookup failed; no notices this run");
                    Default::default()
                }
                Err(_) => {
                    tracing::error!("contact lookup timed out; no notices this run");
                    Default::default()
                }
            };

        let mut jobs = Vec::new();
        for snapshot in &classification.expired {
            let recipient_email = contacts
                .get(&snapshot.address)
                .and_then(|c| c.recipient_email.clone());
            match recipient_email {
                Some(to) => jobs.push(release_notice(to, snapshot)),
                None => {
                    tracing::debug!(vault = %snapshot.address, "expired vault has no recipient email");
                    summary.missing_contacts += 1;
                }
            }
        }
        for (snapshot, urgency) in &classification.warnings {
            let owner_email = contacts
                .get(&snapshot.address)
                .and_then(|c| c.owner_email.clone());
            match owner_email {
                Some(to) => jobs.push(reminder(to, snapshot, *urgency)),
                None => {
                    tracing::debug!(vault = %snapshot.address, "warned vault has no owner email");
                    summary.missing_contacts += 1;
                }
            }
        }

        let sends = jobs.iter().map(|job| {
            let mailer = Arc::clone(&self.mailer);
            async move { tokio::time::timeout(SEND_TIMEOUT, mailer.send(&job.to, &job.subject, &job.body)).await }
        });
        let results = join_all(sends).await;

        for (job, result) in jobs.iter().zip(results) {
            match result {
                Ok(Ok(())) => match job.category {
                    Category::Recipient => summary.recipient_notices += 1,
                    Category::Reminder(Urgency::Final) => summary.final_reminders += 1,
                    Category::Reminder(Urgency::Urgent) => summary.urgent_reminders += 1,
                    Category::Reminder(Urgency::Warning) => summary.warning_reminders += 1,
                },
                Ok(Err(err)) => {
                    tracing::warn!(subject = %job.subject, error = %err, "notification send failed");
                    summary.failed_sends += 1;
                }
                Err(_) => {
                    tracing::warn!(subject = %job.subject, "notification send timed out");
                    summary.failed_sends += 1;
                }
            }
        }

        summary
    }
}

fn release_notice(to: String, snapshot: &VaultSnapshot) -> Job {
    let name = &snapshot.record.name;
    Job {
        category: Category::Recipient,
        to,
        subject: format!("Funds available: vault \"{name}\""),
        body: format!(
            "The owner of vault \"{name}\" ({address}) has missed their check-in \
             deadline. The vault can now be released, after which you, as its \
             designated recipient, can claim what it holds.",
            address = snapshot.address
        ),
    }
}

fn reminder(to: String, snapshot: &VaultSnapshot, urgency: Urgency) -> Job {
    let name = &snapshot.record.name;
    let address = snapshot.address;
    let (subject, body) = match urgency {
        Urgency::Final => (
            format!("Final notice: vault \"{name}\" releases within a day"),
            format!(
                "Your vault \"{name}\" ({address}) passes its deadline in less than \
                 24 hours. Check in now; once the deadline passes, anyone may \
                 trigger its release."
            ),
        ),
        Urgency::Urgent => (
            format!("Urgent: vault \"{name}\" needs a check-in within three days"),
            format!(
                "Your vault \"{name}\" ({address}) passes its deadline in less than \
                 three days. Check in to reset the clock."
            ),
        ),
        Urgency::Warning => (
            format!("Reminder: vault \"{name}\" needs a check-in this week"),
            format!(
                "Your vault \"{name}\" ({address}) passes its deadline in less than \
                 a week. A quick check-in resets the clock."
            ),
        ),
    };
    Job {
        category: Category::Reminder(urgency),
        to,
        subject,
        body,
    }
}

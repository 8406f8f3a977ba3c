//! # Prometheus Metrics
//!
//! Operational metrics for the watchtower, scraped at `/metrics` on the
//! dedicated metrics port. Everything lives in its own
//! [`prometheus::Registry`] under the `vigil` namespace so the exposition
//! never collides with a consumer's default registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Metric handles for the monitor pipeline and the delegate bridge.
///
/// Prometheus handles are internally reference-counted, so this struct is
/// cheap to clone and share across request handlers.
#[derive(Clone)]
pub struct WatchtowerMetrics {
    registry: Registry,
    /// Completed scan runs.
    pub scans_total: IntCounter,
    /// Wall-clock duration of a full scan/classify/notify run.
    pub scan_duration_seconds: Histogram,
    /// Accounts that carried the vault tag but failed to decode.
    pub decode_failures_total: IntCounter,
    /// Vault records decoded by the most recent scan.
    pub vaults_watched: IntGauge,
    /// Vaults past their deadline in the most recent scan.
    pub expired_vaults: IntGauge,
    /// Vaults inside a warning window in the most recent scan.
    pub warning_vaults: IntGauge,
    /// "Funds available" notices delivered to recipients.
    pub recipient_notices_total: IntCounter,
    /// Check-in reminders delivered to owners, all tiers combined.
    pub reminders_sent_total: IntCounter,
    /// Notification sends that failed or timed out.
    pub sends_failed_total: IntCounter,
    /// Check-ins submitted on behalf of owners by the delegate bridge.
    pub relayed_pings_total: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> IntCounter {
    let metric = IntCounter::new(name, help).expect("metric creation");
    registry
        .register(Box::new(metric.clone()))
        .expect("metric registration");
    metric
}

fn gauge(registry: &Registry, name: &str, help: &str) -> IntGauge {
    let metric = IntGauge::new(name, help).expect("metric creation");
    registry
        .register(Box::new(metric.clone()))
        .expect("metric registration");
    metric
}

impl WatchtowerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vigil".into()), None)
            .expect("failed to create prometheus registry");

        let scan_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scan_duration_seconds",
                "Wall-clock duration of one scan/classify/notify run",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(scan_duration_seconds.clone()))
            .expect("metric registration");

        Self {
            scans_total: counter(&registry, "scans_total", "Completed scan runs"),
            scan_duration_seconds,
            decode_failures_total: counter(
                &registry,
                "decode_failures_total",
                "Tagged accounts that failed to decode as vault records",
            ),
            vaults_watched: gauge(
                &registry,
                "vaults_watched",
                "Vault records decoded by the most recent scan",
            ),
            expired_vaults: gauge(
                &registry,
                "expired_vaults",
                "Vaults past their deadline in the most recent scan",
            ),
            warning_vaults: gauge(
                &registry,
                "warning_vaults",
                "Vaults inside a warning window in the most recent scan",
            ),
            recipient_notices_total: counter(
                &registry,
                "recipient_notices_total",
                "Funds-available notices delivered to recipients",
            ),
            reminders_sent_total: counter(
                &registry,
                "reminders_sent_total",
                "Check-in reminders delivered to owners, all tiers combined",
            ),
            sends_failed_total: counter(
                &registry,
                "sends_failed_total",
                "Notification sends that failed or timed out",
            ),
            relayed_pings_total: counter(
                &registry,
                "relayed_pings_total",
                "Check-ins submitted by the delegate bridge",
            ),
            registry,
        }
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for WatchtowerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<WatchtowerMetrics>;

/// Axum handler for the `/metrics` scrape endpoint.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

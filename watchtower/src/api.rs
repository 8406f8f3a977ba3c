//! # Watchtower HTTP API
//!
//! Builds the axum router fronting the monitor pipeline and the delegate
//! check-in bridge. All endpoints share application state through axum's
//! `State` extractor.
//!
//! ## Endpoints
//!
//! | Method   | Path             | Description                             |
//! |----------|------------------|-----------------------------------------|
//! | GET      | `/health`        | Liveness probe                          |
//! | GET/POST | `/monitor/run`   | Execute one monitor run (bearer secret) |
//! | GET      | `/checkin`       | Redeem an emailed check-in token        |
//! | GET      | `/vaults/:owner` | Vault summaries for one owner           |
//!
//! Ledger verdicts cross this boundary verbatim: an error body carries the
//! program's own message, never a re-mapped generic one.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vigil_program::VaultError;
use vigil_protocol::Address;

use crate::bridge::{BridgeError, DelegateBridge};
use crate::chain::{ChainClient, ChainError};
use crate::classifier::Urgency;
use crate::metrics::SharedMetrics;
use crate::monitor::Monitor;
use crate::scanner::{self, VaultSnapshot};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything heavy sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The watchtower's reported version string.
    pub version: String,
    /// Ledger access for read endpoints.
    pub chain: Arc<dyn ChainClient>,
    /// The assembled scan → classify → dispatch pipeline.
    pub monitor: Arc<Monitor>,
    /// Redeems check-in tokens into pings.
    pub bridge: Arc<DelegateBridge>,
    /// Shared secret expected in the `/monitor/run` bearer header.
    pub monitor_secret: String,
    /// Where a successful check-in redirects the clicker.
    pub confirm_url: String,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/monitor/run", get(monitor_run_handler).post(monitor_run_handler))
        .route("/checkin", get(checkin_handler))
        .route("/vaults/:owner", get(vaults_by_owner_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// One owner vault as seen from the outside.
#[derive(Debug, Serialize, Deserialize)]
pub struct VaultSummary {
    pub address: Address,
    pub name: String,
    pub is_released: bool,
    /// Past its deadline but not yet released.
    pub is_expired: bool,
    /// `last_check_in + time_interval`; absent when the sum overflows.
    pub deadline: Option<i64>,
    /// Seconds to the deadline, negative once past it. Absent for
    /// released and never-expiring vaults.
    pub seconds_left: Option<i64>,
    pub urgency: Option<Urgency>,
    pub delegate: Option<Address>,
    pub bounty_lamports: u64,
    pub locked_value: u64,
    pub locked_tokens: u64,
}

/// Generic error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters of a check-in link.
#[derive(Debug, Deserialize)]
pub struct CheckinQuery {
    pub vault: Option<String>,
    pub token: Option<String>,
}

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — liveness probe for orchestrators.
///
/// Deliberately does not touch the ledger; a wedged store must not make
/// the process look dead.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `GET|POST /monitor/run` — execute one monitor run now.
///
/// Meant for cron over HTTP. Both methods behave identically so callers
/// can use whichever their scheduler emits. Requires
/// `Authorization: Bearer <secret>`; 401 without it, 500 when the chain
/// is unreachable, 200 with the full [`crate::monitor::MonitorReport`]
/// otherwise.
async fn monitor_run_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !bearer_matches(&headers, &state.monitor_secret) {
        return error_json(StatusCode::UNAUTHORIZED, "invalid or missing bearer token");
    }
    match state.monitor.run().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "monitor run failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn bearer_matches(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token == secret)
        .unwrap_or(false)
}

/// `GET /checkin?vault=..&token=..` — redeem an emailed check-in link.
///
/// On success the browser is sent to the configured confirmation page
/// with a 303. Failures map the bridge's error classes onto statuses:
/// 400 for missing/unparseable parameters, 401 for token authentication
/// failures, 403 for vault or delegate mismatches, then 404 / 409 / 500
/// for the ledger's own verdicts.
async fn checkin_handler(
    State(state): State<AppState>,
    Query(query): Query<CheckinQuery>,
) -> Response {
    let (Some(vault), Some(token)) = (query.vault, query.token) else {
        return error_json(
            StatusCode::BAD_REQUEST,
            "both `vault` and `token` query parameters are required",
        );
    };
    let vault = match Address::from_base58(&vault) {
        Ok(address) => address,
        Err(_) => return error_json(StatusCode::BAD_REQUEST, "invalid vault address"),
    };

    match state.bridge.redeem(vault, &token).await {
        Ok(_) => {
            state.metrics.relayed_pings_total.inc();
            Redirect::to(&state.confirm_url).into_response()
        }
        Err(err) => {
            tracing::warn!(vault = %vault, error = %err, "check-in rejected");
            error_json(bridge_status(&err), err.to_string())
        }
    }
}

/// Status for each failure class a redemption can hit.
fn bridge_status(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::Authentication(_) => StatusCode::UNAUTHORIZED,
        BridgeError::VaultMismatch { .. } | BridgeError::NotDelegate { .. } => {
            StatusCode::FORBIDDEN
        }
        BridgeError::Chain(ChainError::Program(VaultError::AccountNotFound)) => {
            StatusCode::NOT_FOUND
        }
        BridgeError::Chain(ChainError::Program(_)) => StatusCode::CONFLICT,
        BridgeError::Chain(ChainError::Transport(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `GET /vaults/:owner` — summaries of every vault the owner controls.
async fn vaults_by_owner_handler(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Response {
    let owner = match Address::from_base58(&owner) {
        Ok(address) => address,
        Err(_) => return error_json(StatusCode::BAD_REQUEST, "invalid owner address"),
    };

    let now = match state.chain.now().await {
        Ok(now) => now,
        Err(err) => return error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    };
    match scanner::scan_owner(state.chain.as_ref(), &owner).await {
        Ok(outcome) => {
            let summaries: Vec<VaultSummary> = outcome
                .snapshots
                .iter()
                .map(|snapshot| summarize(snapshot, now))
                .collect();
            (StatusCode::OK, Json(summaries)).into_response()
        }
        Err(err) => {
            tracing::error!(owner = %owner, error = %err, "owner scan failed");
            error_json(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn summarize(snapshot: &VaultSnapshot, now: i64) -> VaultSummary {
    let record = &snapshot.record;
    let seconds_left = (!record.is_released)
        .then(|| record.seconds_until_deadline(now))
        .flatten();
    VaultSummary {
        address: snapshot.address,
        name: record.name.clone(),
        is_released: record.is_released,
        is_expired: !record.is_released && record.is_expired(now).unwrap_or(false),
        deadline: record.deadline().ok(),
        seconds_left,
        urgency: seconds_left
            .filter(|left| *left >= 0)
            .and_then(Urgency::from_seconds_left),
        delegate: record.delegate,
        bounty_lamports: record.bounty_lamports,
        locked_value: record.locked_value,
        locked_tokens: record.locked_tokens,
    }
}

// Copyright (c) 2026 Vigil Systems. MIT License.
// See LICENSE for details.

//! # Vigil Watchtower
//!
//! Entry point for the `vigil-watchtower` binary. Parses CLI arguments,
//! initializes logging and metrics, restores the ledger from the local
//! store, and serves the HTTP API alongside the Prometheus scrape
//! endpoint. One process covers the whole off-ledger surface: monitor
//! runs, notification dispatch, and delegate check-in redemption.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::RwLock;

use vigil_protocol::config::RECORD_LAYOUT_VERSION;
use vigil_protocol::{Clock, Keypair};

use vigil_watchtower::api::{self, AppState};
use vigil_watchtower::bridge::DelegateBridge;
use vigil_watchtower::chain::{ChainClient, InProcessChain};
use vigil_watchtower::cli::{Commands, InitArgs, RunArgs, ScanArgs, WatchtowerCli};
use vigil_watchtower::contacts::{ContactDirectory, InMemoryDirectory};
use vigil_watchtower::dispatcher::{Dispatcher, LogMailer};
use vigil_watchtower::logging::{self, LogFormat};
use vigil_watchtower::metrics::{self, SharedMetrics, WatchtowerMetrics};
use vigil_watchtower::monitor::Monitor;
use vigil_watchtower::store::VaultStore;

/// File under the data directory holding the relay's hex-encoded secret key.
const RELAY_KEY_FILE: &str = "relay.key";
/// Subdirectory under the data directory holding the sled database.
const DB_DIR: &str = "db";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = WatchtowerCli::parse();
    match cli.command {
        Commands::Run(args) => run_service(args).await,
        Commands::Scan(args) => run_scan(args).await,
        Commands::Init(args) => init_data_dir(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// run — the long-lived service
// ---------------------------------------------------------------------------

async fn run_service(args: RunArgs) -> Result<()> {
    logging::init_logging(LogFormat::from_str_lossy(&args.log_format));
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vigil watchtower starting");

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory {}", args.data_dir.display())
    })?;
    let relay = load_relay_keypair(args.relay_key.as_deref(), &args.data_dir)?;
    tracing::info!(relay = %relay.address(), "relay identity loaded");

    let store = VaultStore::open(args.data_dir.join(DB_DIR)).context("failed to open vault store")?;
    let ledger = store
        .load(Clock::system())
        .context("failed to restore ledger from store")?;
    tracing::info!(records = ledger.record_count(), "ledger restored");

    let ledger = Arc::new(RwLock::new(ledger));
    let chain: Arc<dyn ChainClient> =
        Arc::new(InProcessChain::with_store(ledger, store.clone()));

    let directory = load_contacts(args.contacts.as_deref())?;
    let metrics: SharedMetrics = Arc::new(WatchtowerMetrics::new());
    let dispatcher = Dispatcher::new(directory, Arc::new(LogMailer));
    let monitor = Arc::new(Monitor::new(
        Arc::clone(&chain),
        dispatcher,
        Arc::clone(&metrics),
    ));
    let bridge = Arc::new(DelegateBridge::new(relay, Arc::clone(&chain)));

    let state = AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain,
        monitor,
        bridge,
        monitor_secret: args.monitor_secret,
        confirm_url: args.confirm_url,
        metrics: Arc::clone(&metrics),
    };
    let api_router = api::create_router(state);
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(metrics);

    let api_addr = SocketAddr::from(([0, 0, 0, 0], args.api_port));
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], args.metrics_port));
    let api_listener = TcpListener::bind(api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {api_addr}"))?;
    let metrics_listener = TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {metrics_addr}"))?;
    tracing::info!(api = %api_addr, metrics = %metrics_addr, "listening");

    tokio::select! {
        result = axum::serve(api_listener, api_router) => {
            result.context("API server terminated")?;
        }
        result = axum::serve(metrics_listener, metrics_router) => {
            result.context("metrics server terminated")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    store.flush().context("final store flush failed")?;
    tracing::info!("watchtower stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// scan — one pipeline run, report on stdout
// ---------------------------------------------------------------------------

async fn run_scan(args: ScanArgs) -> Result<()> {
    logging::init_logging(LogFormat::from_str_lossy(&args.log_format));

    let store = VaultStore::open(args.data_dir.join(DB_DIR)).with_context(|| {
        format!("failed to open vault store under {}", args.data_dir.display())
    })?;
    let ledger = store
        .load(Clock::system())
        .context("failed to restore ledger from store")?;
    tracing::info!(records = ledger.record_count(), "ledger restored");

    let chain: Arc<dyn ChainClient> =
        Arc::new(InProcessChain::new(Arc::new(RwLock::new(ledger))));
    let directory = load_contacts(args.contacts.as_deref())?;
    let metrics: SharedMetrics = Arc::new(WatchtowerMetrics::new());
    let monitor = Monitor::new(chain, Dispatcher::new(directory, Arc::new(LogMailer)), metrics);

    let report = monitor.run().await.context("monitor run failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// init — prepare a data directory and relay identity
// ---------------------------------------------------------------------------

fn init_data_dir(args: InitArgs) -> Result<()> {
    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory {}", args.data_dir.display())
    })?;

    let key_path = args.data_dir.join(RELAY_KEY_FILE);
    if key_path.exists() && !args.force {
        anyhow::bail!(
            "relay key already exists at {}; pass --force to overwrite",
            key_path.display()
        );
    }

    let relay = Keypair::generate();
    std::fs::write(&key_path, hex::encode(relay.secret_key_bytes()))
        .with_context(|| format!("failed to write relay key to {}", key_path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&key_path, std::fs::Permissions::from_mode(0o600))
            .context("failed to restrict relay key permissions")?;
    }

    println!("Initialized watchtower data directory");
    println!("  data dir:      {}", args.data_dir.display());
    println!("  relay key:     {}", key_path.display());
    println!("  relay address: {}", relay.address());
    println!();
    println!("Owners enable wallet-free check-ins by setting this relay address");
    println!("as their vault's delegate.");
    Ok(())
}

fn print_version() {
    println!("vigil-watchtower {}", env!("CARGO_PKG_VERSION"));
    println!("record layout   v{RECORD_LAYOUT_VERSION}");
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// The relay key comes from `--relay-key` / `VIGIL_RELAY_KEY` when given,
/// otherwise from the key file `init` wrote into the data directory.
fn load_relay_keypair(inline_hex: Option<&str>, data_dir: &Path) -> Result<Keypair> {
    let hex_key = match inline_hex {
        Some(hex_key) => hex_key.to_string(),
        None => {
            let path = data_dir.join(RELAY_KEY_FILE);
            std::fs::read_to_string(&path).with_context(|| {
                format!(
                    "no relay key at {}; run `vigil-watchtower init` first",
                    path.display()
                )
            })?
        }
    };
    Keypair::from_hex(hex_key.trim()).context("relay key is not a valid hex-encoded secret key")
}

fn load_contacts(path: Option<&Path>) -> Result<Arc<dyn ContactDirectory>> {
    let directory = match path {
        Some(path) => {
            let directory = InMemoryDirectory::from_json_file(path)
                .with_context(|| format!("failed to load contacts from {}", path.display()))?;
            tracing::info!(contacts = directory.len(), path = %path.display(), "contact directory loaded");
            directory
        }
        None => {
            tracing::warn!("no contact file configured; notifications will find nobody");
            InMemoryDirectory::new()
        }
    };
    Ok(Arc::new(directory))
}

/// Resolves when the process should shut down: Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

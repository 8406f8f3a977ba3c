//! Command-line interface for the Vigil watchtower.
//!
//! Every flag has an environment-variable fallback so the service can be
//! configured entirely from a unit file or container manifest.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vigil_protocol::config;

#[derive(Parser, Debug)]
#[command(
    name = "vigil-watchtower",
    about = "Vigil watchtower: vault monitor, notification dispatcher, and delegate check-in bridge",
    version
)]
pub struct WatchtowerCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the watchtower service (HTTP API, metrics, delegate bridge).
    Run(RunArgs),
    /// Run the scan / classify / notify pipeline once and print the report.
    Scan(ScanArgs),
    /// Create a data directory and generate the relay identity.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Data directory holding the ledger store and the relay key.
    #[arg(long, short = 'd', env = "VIGIL_DATA_DIR", default_value = "./vigil-data")]
    pub data_dir: PathBuf,

    /// Port for the watchtower HTTP API.
    #[arg(long, env = "VIGIL_API_PORT", default_value_t = config::DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "VIGIL_METRICS_PORT", default_value_t = config::DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Shared bearer secret protecting the /monitor/run trigger.
    #[arg(long, env = "VIGIL_MONITOR_SECRET")]
    pub monitor_secret: String,

    /// Hex-encoded relay secret key. Falls back to `relay.key` inside the
    /// data directory when omitted.
    #[arg(long, env = "VIGIL_RELAY_KEY")]
    pub relay_key: Option<String>,

    /// JSON file mapping vault addresses to owner and recipient emails.
    #[arg(long, env = "VIGIL_CONTACTS")]
    pub contacts: Option<PathBuf>,

    /// Where a successful browser check-in is redirected to.
    #[arg(
        long,
        env = "VIGIL_CONFIRM_URL",
        default_value = "https://app.vigilsystems.io/checkin/confirmed"
    )]
    pub confirm_url: String,

    /// Log output format: "pretty" for development, "json" for production.
    #[arg(long, env = "VIGIL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// Data directory holding the ledger store. The service must not be
    /// running against the same directory (the store takes an exclusive lock).
    #[arg(long, short = 'd', env = "VIGIL_DATA_DIR", default_value = "./vigil-data")]
    pub data_dir: PathBuf,

    /// JSON file mapping vault addresses to owner and recipient emails.
    #[arg(long, env = "VIGIL_CONTACTS")]
    pub contacts: Option<PathBuf>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "VIGIL_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Data directory to create.
    #[arg(long, short = 'd', env = "VIGIL_DATA_DIR", default_value = "./vigil-data")]
    pub data_dir: PathBuf,

    /// Overwrite an existing relay key.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

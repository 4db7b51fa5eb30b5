//! # CLI Interface
//!
//! Defines the command-line argument structure for `tally-node` using
//! `clap` derive. Supports five subcommands: `run`, `init`, `invoke`,
//! `query`, and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use tally_protocol::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

use crate::logging::LogFormat;

/// Tally ledger host.
///
/// Owns the on-disk ledger state, runs the account ledger contract against
/// it, serves the HTTP API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "tally-node",
    about = "Tally account ledger host",
    version,
    propagate_version = true
)]
pub struct TallyNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Tally node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API and metrics servers.
    Run(RunArgs),
    /// Create the data directory and write an empty account registry.
    Init(InitArgs),
    /// Run one mutating operation against the local store and exit.
    Invoke(CallArgs),
    /// Run one read-only operation against the local store and exit.
    Query(CallArgs),
    /// Print version information and exit.
    Version,
}

/// Options shared by every subcommand that opens the ledger.
#[derive(Args, Debug, Clone)]
pub struct LedgerArgs {
    /// Directory holding the ledger state. Created on first use.
    #[arg(long, short = 'd', env = "TALLY_DATA_DIR", default_value = ".tally")]
    pub data_dir: PathBuf,

    /// Shared secret accepted from every caller.
    ///
    /// Ignored when `--callers` is given.
    #[arg(long, env = "TALLY_SECURITY_TOKEN", hide_env_values = true)]
    pub security_token: Option<String>,

    /// JSON file mapping caller ids to their tokens (`{"caller":"token"}`).
    #[arg(long, env = "TALLY_CALLERS")]
    pub callers: Option<PathBuf>,

    /// Reject negative transfer amounts and loyalty points.
    #[arg(long, env = "TALLY_STRICT_AMOUNTS")]
    pub strict_amounts: bool,

    /// Log output format.
    #[arg(
        long,
        env = "TALLY_LOG_FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Port for the HTTP API.
    #[arg(long, env = "TALLY_API_PORT", default_value_t = DEFAULT_API_PORT)]
    pub api_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TALLY_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,
}

/// Arguments for the `init` subcommand.
#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Reset the registry even if one already exists.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `invoke` and `query` subcommands.
#[derive(Args, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub ledger: LedgerArgs,

    /// Caller id passed alongside the token to per-caller policies.
    #[arg(long, env = "TALLY_CALLER")]
    pub caller: Option<String>,

    /// Operation name, e.g. `transfer` or `GetAccountDetails`.
    pub function: String,

    /// Positional operation arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

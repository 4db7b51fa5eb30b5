// Copyright (c) 2026 Tally Contributors. MIT License.
// See LICENSE for details.

//! # Tally Node
//!
//! Entry point for the `tally-node` binary. Parses CLI arguments, initializes
//! logging and metrics, opens the ledger state, and serves the HTTP API.
//!
//! The binary supports five subcommands:
//!
//! - `run`: serve the HTTP API and metrics endpoint
//! - `init`: create the data directory and write an empty registry
//! - `invoke`: run one mutating operation locally and exit
//! - `query`: run one read-only operation locally and exit
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use tally_contracts::{AccountLedger, LedgerOptions, LedgerResult, Response};
use tally_protocol::{AuthPolicy, CallerTokenPolicy, SharedSecretPolicy, SledStore, StagedStore};

use cli::{Commands, LedgerArgs, TallyNodeCli};
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TallyNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_ledger(args),
        Commands::Invoke(args) => call_ledger(args, false),
        Commands::Query(args) => call_ledger(args, true),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the API server and the metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        &format!("{},tower_http=debug", logging::DEFAULT_FILTER),
        args.ledger.log_format,
    )
    .context("failed to install log subscriber")?;

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.ledger.data_dir.display(),
        strict_amounts = args.ledger.strict_amounts,
        "starting tally-node"
    );

    let ledger = build_ledger(&args.ledger)?;
    let store = open_store(&args.ledger.data_dir)?;

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to create metrics registry")?);

    // --- Application state ---
    let app_state = api::AppState::new(
        format!(
            "{} (contract {})",
            env!("CARGO_PKG_VERSION"),
            tally_protocol::config::CONTRACT_VERSION,
        ),
        ledger,
        store,
        Arc::clone(&node_metrics),
    );
    match app_state.ledger.get_all_account_ids(&*app_state.store) {
        Ok(registry) => {
            node_metrics.registered_accounts.set(registry.len() as i64);
            tracing::info!(accounts = registry.len(), "ledger state loaded");
        }
        Err(_) => tracing::warn!("ledger has no registry yet; invoke init before use"),
    }

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("tally-node stopped");
    Ok(())
}

/// Creates the data directory and writes an empty registry.
fn init_ledger(args: cli::InitArgs) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.ledger.log_format)
        .context("failed to install log subscriber")?;

    let data_dir = &args.ledger.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing ledger");

    let ledger = build_ledger(&args.ledger)?;
    let store = open_store(data_dir)?;

    if !args.force && ledger.get_all_account_ids(&store).is_ok() {
        bail!(
            "ledger at {} is already initialized; pass --force to reset the registry",
            data_dir.display()
        );
    }

    commit_with(&store, |staged| ledger.invoke(staged, "init", &[], None))?;

    println!("Ledger initialized successfully.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Contract       : {}", tally_protocol::config::CONTRACT_VERSION);

    Ok(())
}

/// Runs a single operation against the local store and prints its result
/// as JSON on stdout.
fn call_ledger(args: cli::CallArgs, read_only: bool) -> Result<()> {
    logging::init_logging(logging::DEFAULT_FILTER, args.ledger.log_format)
        .context("failed to install log subscriber")?;

    let ledger = build_ledger(&args.ledger)?;
    let store = open_store(&args.ledger.data_dir)?;

    let response = if read_only {
        ledger
            .query(&store, &args.function, &args.args)
            .map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))?
    } else {
        let caller = args.caller.as_deref();
        commit_with(&store, |staged| {
            ledger.invoke(staged, &args.function, &args.args, caller)
        })?
    };

    if let Some(bytes) = response.to_bytes()? {
        println!("{}", String::from_utf8_lossy(&bytes));
    }
    Ok(())
}

/// Runs `call` against a staging overlay of `store` and commits its writes
/// only if it succeeds.
fn commit_with<F>(store: &SledStore, call: F) -> Result<Response>
where
    F: FnOnce(&StagedStore<'_, SledStore>) -> LedgerResult<Response>,
{
    let staged = StagedStore::new(store);
    let response = call(&staged).map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))?;
    let writes = staged.commit().context("failed to commit ledger writes")?;
    tracing::debug!(writes, "writes committed");
    Ok(response)
}

/// Builds the authorization policy from the CLI/env configuration.
///
/// A caller table takes precedence over a shared secret.
fn build_policy(args: &LedgerArgs) -> Result<Arc<dyn AuthPolicy>> {
    if let Some(path) = &args.callers {
        let json = std::fs::read(path)
            .with_context(|| format!("failed to read caller table {}", path.display()))?;
        let policy = CallerTokenPolicy::from_json(&json)
            .with_context(|| format!("invalid caller table {}", path.display()))?;
        tracing::info!(callers = policy.caller_count(), "per-caller authorization enabled");
        return Ok(Arc::new(policy));
    }

    match &args.security_token {
        Some(token) => {
            let policy = SharedSecretPolicy::new(token).context("invalid security token")?;
            Ok(Arc::new(policy))
        }
        None => bail!("no authorization configured: set --security-token or --callers"),
    }
}

fn build_ledger(args: &LedgerArgs) -> Result<AccountLedger> {
    let policy = build_policy(args)?;
    tracing::debug!(policy = policy.name(), "authorization policy selected");
    Ok(AccountLedger::with_policy(policy).with_options(LedgerOptions {
        reject_negative_amounts: args.strict_amounts,
    }))
}

/// Opens (creating if needed) the sled store under `data_dir`.
fn open_store(data_dir: &Path) -> Result<SledStore> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open ledger state at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), keys = store.len(), "ledger state opened");
    Ok(store)
}

/// Prints version information to stdout.
fn print_version() {
    println!("tally-node {}", env!("CARGO_PKG_VERSION"));
    println!("contract   {}", tally_protocol::config::CONTRACT_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ledger_args(data_dir: PathBuf) -> LedgerArgs {
        LedgerArgs {
            data_dir,
            security_token: None,
            callers: None,
            strict_amounts: false,
            log_format: logging::LogFormat::Pretty,
        }
    }

    #[test]
    fn policy_requires_configuration() {
        let dir = tempfile::tempdir().unwrap();
        assert!(build_policy(&ledger_args(dir.path().to_path_buf())).is_err());
    }

    #[test]
    fn caller_table_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("callers.json");
        std::fs::write(&table, br#"{"teller":"alpha"}"#).unwrap();

        let mut args = ledger_args(dir.path().to_path_buf());
        args.security_token = Some("shared".into());
        args.callers = Some(table);

        let policy = build_policy(&args).unwrap();
        assert_eq!(policy.name(), "caller-token");
    }

    #[test]
    fn local_invocations_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = ledger_args(dir.path().to_path_buf());
        args.security_token = Some("s3cret".into());
        let ledger = build_ledger(&args).unwrap();

        {
            let store = open_store(&args.data_dir).unwrap();
            commit_with(&store, |s| ledger.invoke(s, "init", &[], None)).unwrap();
            let ids = vec![r#"["alice"]"#.to_string()];
            commit_with(&store, |s| ledger.invoke(s, "registerAccounts", &ids, None)).unwrap();

            let bad = ["alice", "alice", "1", "nope"].map(String::from);
            assert!(commit_with(&store, |s| ledger.invoke(s, "transfer", &bad, None)).is_err());
        }

        let store = open_store(&args.data_dir).unwrap();
        let registry = ledger.get_all_account_ids(&store).unwrap();
        assert!(registry.is_registered("alice"));
    }
}

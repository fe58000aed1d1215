//! bullion - command-line front end for the bullion back-office API.
//!
//! Signs in, issues authenticated requests and prints registry statements.
//! Expired access tokens are refreshed silently by the core client; when the
//! session cannot be recovered the command waits for the session reset and
//! exits with status 2.

mod cli;
mod commands;
mod presenter;

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bullion_core::{ApiClient, ApiError, Config};
use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use presenter::ConsolePresenter;

// ============================================================================
// Constants
// ============================================================================

/// Prefix for the daily rolling log file in the cache directory
const LOG_FILE_PREFIX: &str = "bullion.log";

/// Extra time allowed for the delayed session reset before exiting anyway
const RESTART_GRACE_MS: u64 = 500;

/// Exit status when the session is over and the user must log in again
const EXIT_SESSION_EXPIRED: u8 = 2;

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file when dropped.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.cache_dir() {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("warning: {:#}, using defaults", e);
            Config::default()
        }
    };
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }

    let _guard = init_tracing(&config);
    info!(api = %config.base_url(), "bullion starting");

    let client = match ApiClient::builder(config)
        .presenter(Arc::new(ConsolePresenter))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &client).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if is_session_expired(&e) => {
            wait_for_session_reset(&client).await;
            ExitCode::from(EXIT_SESSION_EXPIRED)
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, client: &ApiClient) -> Result<()> {
    match command {
        Command::Login { username } => commands::login(client, username).await,
        Command::Logout => commands::logout(client).await,
        Command::Status => {
            commands::status(client);
            Ok(())
        }
        Command::Request {
            method,
            path,
            query,
            data,
        } => commands::request(client, &method, &path, query, data).await,
        Command::Statement { path, query } => commands::statement(client, &path, query).await,
    }
}

fn is_session_expired(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_session_expired)
}

/// Let the warning stay up and the reset run before the process exits.
async fn wait_for_session_reset(client: &ApiClient) {
    let notifier = client.notifier();
    let mut restarts = notifier.subscribe();
    if !notifier.is_pending() {
        return;
    }

    let limit = client.config().warning_duration() + Duration::from_millis(RESTART_GRACE_MS);
    if tokio::time::timeout(limit, restarts.changed()).await.is_err() {
        debug!("Session reset did not complete in time");
    }
}

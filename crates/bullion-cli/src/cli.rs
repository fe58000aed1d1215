use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bullion", version, about = "Command-line client for the bullion back-office API")]
pub struct Cli {
    /// Override the API base URL for this invocation
    #[arg(long, global = true, env = "BULLION_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the access token
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Close the server session and forget the stored token
    Logout,
    /// Show configuration and whether a token is stored
    Status,
    /// Send a request through the authenticated client
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// API path relative to the base URL, e.g. /cost-centers
        path: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Print a registry statement with running balances, newest first
    Statement {
        /// Registry endpoint, e.g. /registry or /reports/order-statement
        path: String,
        #[arg(short, long = "query", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
}

pub fn parse_key_value(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err(anyhow!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

//! Sahha CLI - Issue authenticated requests against the Sahha backend.
//!
//! # Usage
//!
//! ```bash
//! # List orders for the logged-in customer
//! sahha-cli --access-token "$T" --refresh-token "$R" request GET /orders
//!
//! # Add a product to the cart
//! sahha-cli request POST /carts/add-to-cart --body '{"productId": 42, "quantity": 1}'
//!
//! # Call an endpoint that must not carry a bearer token
//! sahha-cli request POST /auth/login --anonymous --body '{"phone": "0500000000"}'
//!
//! # Force a token refresh
//! sahha-cli refresh
//! ```
//!
//! # Commands
//!
//! - `request` - Send a request, refreshing the access token once on a 401
//! - `refresh` - Exchange the refresh token for a new access token
//!
//! # Environment Variables
//!
//! - `SAHHA_ACCESS_TOKEN` / `SAHHA_REFRESH_TOKEN` - Credentials (or pass the flags)
//!
//! All of these may also be set in a `.env` file.
//! - `SAHHA_API_BASE_URL` and the other client variables, see `sahha_client::config`
//! - `RUST_LOG` - Log filter (default: `sahha_cli=info,sahha_client=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sahha_client::{ApiClient, ClientConfig, CredentialStore, MemoryCredentialStore};
use sahha_core::Credentials;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "sahha-cli")]
#[command(author, version, about = "Sahha API client tools")]
struct Cli {
    /// Access token to start with
    #[arg(long, env = "SAHHA_ACCESS_TOKEN", hide_env_values = true, global = true)]
    access_token: Option<String>,

    /// Refresh token used when the access token is rejected
    #[arg(long, env = "SAHHA_REFRESH_TOKEN", hide_env_values = true, global = true)]
    refresh_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a request to the backend
    Request(commands::request::RequestArgs),
    /// Refresh the access token
    Refresh,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout carries only response bodies
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sahha_cli=info,sahha_client=info".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    // Load .env before parsing so clap's env fallbacks can see it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let store = Arc::new(credential_store(cli.access_token, cli.refresh_token)?);
    let client = ApiClient::new(config, store.clone())?;

    let was_authenticated = store.auth_state().is_authenticated();
    let result = match cli.command {
        Commands::Request(args) => commands::request::run(&client, args).await,
        Commands::Refresh => commands::refresh::run(&client).await,
    };

    if was_authenticated && store.access_token().is_none() {
        tracing::warn!("Session ended: credentials were cleared, log in again");
    }

    result
}

/// Build the credential store from command-line credentials.
fn credential_store(
    access_token: Option<String>,
    refresh_token: Option<String>,
) -> Result<MemoryCredentialStore, CliError> {
    match (access_token, refresh_token) {
        (Some(access), Some(refresh)) => Ok(MemoryCredentialStore::with_credentials(
            Credentials::new(access, refresh),
        )),
        (None, None) => Ok(MemoryCredentialStore::new()),
        _ => Err(CliError::IncompleteCredentials),
    }
}

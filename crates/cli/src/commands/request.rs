//! Send a single request.
//!
//! # Usage
//!
//! ```bash
//! sahha-cli request GET /orders --query page=2 --query status=delivered
//! sahha-cli request POST /favourites --body '{"productId": 42}'
//! ```

use clap::Args;
use reqwest::Method;
use sahha_client::ApiClient;

use super::CliError;

/// Arguments for `sahha-cli request`.
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE, ...)
    pub method: String,

    /// Path relative to the API base URL (e.g., /orders)
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub body: Option<String>,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_name = "KEY=VALUE")]
    pub queries: Vec<String>,

    /// Send without a bearer token
    #[arg(long)]
    pub anonymous: bool,
}

/// Send the request and print the response body to stdout.
///
/// # Errors
///
/// Returns `CliError` if the arguments are invalid or the request fails.
pub async fn run(client: &ApiClient, args: RequestArgs) -> Result<(), CliError> {
    let method = parse_method(&args.method)?;
    let mut request = client.request(method.clone(), &args.path);

    for raw in &args.queries {
        let (key, value) = parse_query(raw)?;
        request = request.query(key, value);
    }

    if let Some(body) = &args.body {
        let body: serde_json::Value = serde_json::from_str(body)?;
        request = request.json(&body);
    }

    if args.anonymous {
        request = request.without_credential();
    }

    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await.map_err(sahha_client::ClientError::from)?;

    tracing::info!(%method, path = %args.path, %status, "Request complete");

    #[allow(clippy::print_stdout)]
    {
        println!("{}", pretty(&body));
    }

    Ok(())
}

/// Parse an HTTP method, case-insensitively.
fn parse_method(raw: &str) -> Result<Method, CliError> {
    Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::InvalidMethod(raw.to_string()))
}

/// Split a `key=value` query argument.
fn parse_query(raw: &str) -> Result<(&str, &str), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => Err(CliError::InvalidQuery(raw.to_string())),
    }
}

/// Pretty-print JSON bodies; pass anything else through.
fn pretty(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| body.to_string())
}

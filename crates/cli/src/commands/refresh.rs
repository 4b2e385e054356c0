//! Force an access token refresh.
//!
//! Useful to check that a refresh token is still accepted. Tokens are never
//! printed.

use sahha_client::ApiClient;

use super::CliError;

/// Exchange the configured refresh token for a new access token.
///
/// # Errors
///
/// Returns `CliError::Client` if the refresh fails; the session is cleared.
pub async fn run(client: &ApiClient) -> Result<(), CliError> {
    client.refresh().await?;
    tracing::info!("Access token refreshed");
    Ok(())
}

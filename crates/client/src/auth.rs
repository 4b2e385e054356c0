//! Token refresh endpoint.
//!
//! Exchanges a refresh token for a new access token. The call is sent
//! straight to the transport: it never carries a bearer token and a 401 from
//! it is a refresh failure, not a trigger for another refresh.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use sahha_core::{AccessToken, RefreshToken};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::error::RefreshError;
use crate::transport::Transport;

/// Tokens returned by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    /// New bearer token for API requests.
    pub access_token: AccessToken,
    /// Rotated refresh token, if the backend issued one.
    pub refresh_token: Option<RefreshToken>,
}

/// Request body for the refresh endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response from the refresh endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Refresh an access token using a refresh token.
///
/// # Arguments
///
/// * `http` - Client used to build the request
/// * `transport` - Transport that sends it
/// * `endpoint` - Absolute URL of the refresh endpoint
/// * `refresh_token` - The refresh token from the credential store
///
/// # Errors
///
/// Returns `RefreshError::Rejected` if the backend answers with a non-2xx
/// status, `RefreshError::Transport` if no response was received, and
/// `RefreshError::InvalidResponse` if the body is not a token pair.
#[instrument(skip(http, transport, refresh_token), fields(endpoint = %endpoint))]
pub async fn refresh_access_token(
    http: &reqwest::Client,
    transport: &dyn Transport,
    endpoint: Url,
    refresh_token: &RefreshToken,
) -> Result<RefreshedToken, RefreshError> {
    let request = http
        .post(endpoint)
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json")
        .json(&RefreshRequest {
            refresh_token: refresh_token.expose(),
        })
        .build()
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    let response = transport
        .execute(request)
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RefreshError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(RefreshError::Rejected { status, body });
    }

    let refreshed: RefreshResponse =
        serde_json::from_str(&body).map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

    if refreshed.access_token.is_empty() {
        return Err(RefreshError::InvalidResponse(
            "empty access token".to_string(),
        ));
    }

    Ok(RefreshedToken {
        access_token: AccessToken::new(refreshed.access_token),
        refresh_token: refreshed
            .refresh_token
            .filter(|token| !token.is_empty())
            .map(RefreshToken::new),
    })
}

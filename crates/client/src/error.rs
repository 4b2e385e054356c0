//! Errors surfaced by the API client.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when calling the Sahha backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{url} returned status {status}{}", format_body(.body))]
    Status {
        /// Response status.
        status: StatusCode,
        /// Request URL.
        url: String,
        /// Response body, possibly empty.
        body: String,
    },

    /// The access token could not be refreshed; the session has been cleared.
    #[error("Session expired: {0}")]
    Refresh(#[from] RefreshError),

    /// Waiting for another request's token refresh took too long.
    #[error("Timed out after {0:?} waiting for token refresh")]
    RefreshTimedOut(Duration),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request path could not be joined onto the base URL.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Response status, if the backend answered.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }

    /// Whether this error means the caller is no longer authenticated.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Refresh(_)) || self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

/// Errors from the token refresh endpoint.
///
/// `Clone` so a single failure can be delivered to every queued request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The credential store holds no refresh token.
    #[error("No refresh token available - login required")]
    MissingRefreshToken,

    /// The refresh endpoint answered with a non-success status.
    #[error("Token refresh rejected with status {status}{}", format_body(.body))]
    Rejected {
        /// Response status.
        status: StatusCode,
        /// Response body, possibly empty.
        body: String,
    },

    /// The refresh request failed before a response was received.
    #[error("Token refresh request failed: {0}")]
    Transport(String),

    /// The refresh endpoint answered 2xx with an unexpected body.
    #[error("Invalid token refresh response: {0}")]
    InvalidResponse(String),

    /// The request driving the refresh was dropped before it finished.
    #[error("Token refresh was abandoned")]
    Abandoned,
}

fn format_body(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

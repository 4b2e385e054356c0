//! Integration tests for the Sahha API client.
//!
//! Every test runs the real `reqwest` transport against a `wiremock` server
//! standing in for the Sahha backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sahha-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `token_refresh` - Refresh-and-retry protocol, single-flight, logout
//! - `request_decoration` - Bearer attachment, opt-out, pass-through errors

use std::sync::Arc;
use std::time::Duration;

use sahha_client::{ApiClient, ClientConfig, MemoryCredentialStore};
use sahha_core::Credentials;
use url::Url;
use wiremock::MockServer;

/// Path of the refresh endpoint on the mock backend.
pub const REFRESH_PATH: &str = "/auth/token/refresh";

/// Client configuration pointing at `server`.
///
/// # Panics
///
/// Panics if the mock server URI is not a valid URL.
#[must_use]
#[allow(clippy::expect_used)]
pub fn config_for(server: &MockServer) -> ClientConfig {
    let mut config =
        ClientConfig::new(Url::parse(&server.uri()).expect("mock server URI is a URL"));
    config.request_timeout = Duration::from_secs(5);
    config.refresh_wait_timeout = Duration::from_secs(5);
    config
}

/// A store holding `access`/`refresh`.
#[must_use]
pub fn logged_in(access: &str, refresh: &str) -> Arc<MemoryCredentialStore> {
    Arc::new(MemoryCredentialStore::with_credentials(Credentials::new(
        access, refresh,
    )))
}

/// Client for `server` reading from `store`.
///
/// # Panics
///
/// Panics if the HTTP client cannot be created.
#[must_use]
#[allow(clippy::expect_used)]
pub fn client_for(server: &MockServer, store: Arc<MemoryCredentialStore>) -> ApiClient {
    ApiClient::new(config_for(server), store).expect("client builds")
}

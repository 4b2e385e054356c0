//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SAHHA_API_BASE_URL` - Base URL of the Sahha backend (e.g., `https://api.sahha.example/v1`)
//!
//! ## Optional
//! - `SAHHA_API_TIMEOUT_SECS` - Per-request timeout in seconds (default: 30)
//! - `SAHHA_REFRESH_WAIT_SECS` - How long a queued request waits for an in-flight
//!   token refresh before giving up (default: 30)
//! - `SAHHA_REFRESH_PATH` - Token refresh endpoint path (default: `/auth/token/refresh`)
//! - `SAHHA_USER_AGENT` - User agent sent with every request (default: `Sahha/1.0`)

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_WAIT_SECS: u64 = 30;
const DEFAULT_REFRESH_PATH: &str = "/auth/token/refresh";
const DEFAULT_USER_AGENT: &str = "Sahha/1.0";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// API client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every request path is resolved against
    pub base_url: Url,
    /// Timeout applied to each HTTP request, including the refresh call
    pub request_timeout: Duration,
    /// Upper bound on how long a queued request waits for a refresh to settle
    pub refresh_wait_timeout: Duration,
    /// Path of the token refresh endpoint, relative to `base_url`
    pub refresh_path: String,
    /// User agent header value
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the base URL.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            refresh_wait_timeout: Duration::from_secs(DEFAULT_REFRESH_WAIT_SECS),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = get_required(&lookup, "SAHHA_API_BASE_URL")?;
        let base_url = Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("SAHHA_API_BASE_URL".to_string(), e.to_string())
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "SAHHA_API_BASE_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let request_timeout = get_secs(&lookup, "SAHHA_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let refresh_wait_timeout =
            get_secs(&lookup, "SAHHA_REFRESH_WAIT_SECS", DEFAULT_REFRESH_WAIT_SECS)?;

        let refresh_path = lookup("SAHHA_REFRESH_PATH")
            .unwrap_or_else(|| DEFAULT_REFRESH_PATH.to_string());
        let user_agent =
            lookup("SAHHA_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        Ok(Self {
            base_url,
            request_timeout,
            refresh_wait_timeout,
            refresh_path,
            user_agent,
        })
    }

    /// Resolve a request path against the base URL.
    ///
    /// Paths are appended to the base URL's path, so a base of
    /// `https://api.test/v1` and a path of `/orders` yields
    /// `https://api.test/v1/orders`.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
    }

    /// URL of the token refresh endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn refresh_endpoint(&self) -> Result<Url, url::ParseError> {
        self.endpoint(&self.refresh_path)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required variable.
fn get_required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a duration in whole seconds with a default value.
fn get_secs<F>(lookup: &F, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(Duration::from_secs(default));
    };
    let secs = raw
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("SAHHA_API_BASE_URL", "https://api.test")]))
                .unwrap();
        assert_eq!(config.base_url.as_str(), "https://api.test/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_wait_timeout, Duration::from_secs(30));
        assert_eq!(config.refresh_path, "/auth/token/refresh");
        assert_eq!(config.user_agent, "Sahha/1.0");
    }

    #[test]
    fn test_missing_base_url() {
        let result = ClientConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref k)) if k == "SAHHA_API_BASE_URL"));
    }

    #[test]
    fn test_invalid_base_url() {
        let result =
            ClientConfig::from_lookup(lookup_from(&[("SAHHA_API_BASE_URL", "not a url")]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_invalid_timeout() {
        let result = ClientConfig::from_lookup(lookup_from(&[
            ("SAHHA_API_BASE_URL", "https://api.test"),
            ("SAHHA_API_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(ref k, _)) if k == "SAHHA_API_TIMEOUT_SECS"));
    }

    #[test]
    fn test_zero_refresh_wait_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[
            ("SAHHA_API_BASE_URL", "https://api.test"),
            ("SAHHA_REFRESH_WAIT_SECS", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SAHHA_API_BASE_URL", "https://api.test/v1"),
            ("SAHHA_API_TIMEOUT_SECS", "5"),
            ("SAHHA_REFRESH_WAIT_SECS", "2"),
            ("SAHHA_REFRESH_PATH", "/oauth/refresh"),
            ("SAHHA_USER_AGENT", "SahhaApp/2.3"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.refresh_wait_timeout, Duration::from_secs(2));
        assert_eq!(
            config.refresh_endpoint().unwrap().as_str(),
            "https://api.test/v1/oauth/refresh"
        );
        assert_eq!(config.user_agent, "SahhaApp/2.3");
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let config = ClientConfig::new(Url::parse("https://api.test/v1/").unwrap());
        assert_eq!(
            config.endpoint("/orders").unwrap().as_str(),
            "https://api.test/v1/orders"
        );
        assert_eq!(
            config.endpoint("carts/add-to-cart").unwrap().as_str(),
            "https://api.test/v1/carts/add-to-cart"
        );
    }
}

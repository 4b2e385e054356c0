//! CLI subcommands.

pub mod refresh;
pub mod request;

use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Client configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] sahha_client::ConfigError),

    /// The request or refresh failed.
    #[error(transparent)]
    Client(#[from] sahha_client::ClientError),

    /// Only one of the access/refresh tokens was given.
    #[error("Both --access-token and --refresh-token are required to authenticate")]
    IncompleteCredentials,

    /// The HTTP method is not valid.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A `--query` argument is not `key=value`.
    #[error("Invalid query parameter {0:?}, expected key=value")]
    InvalidQuery(String),

    /// The `--body` argument is not JSON.
    #[error("Invalid JSON body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

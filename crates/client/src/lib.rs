//! Sahha backend API client.
//!
//! Wraps outbound HTTP calls to the Sahha REST backend, attaches the current
//! bearer token to every request, and recovers transparently from an expired
//! access token.
//!
//! # Architecture
//!
//! - Credentials live in an injected [`CredentialStore`], never in a global
//! - Every request is decorated with `Authorization: Bearer <token>` unless it
//!   opts out with [`ApiRequest::without_credential`]
//! - A 401 on a first attempt triggers a single coordinated refresh: one
//!   caller performs it, every other 401 in the meantime queues behind it and
//!   is re-issued in FIFO order with the new token
//! - A failed refresh clears the store (logout) and rejects every waiter
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sahha_client::{ApiClient, ClientConfig, MemoryCredentialStore};
//! use sahha_core::Credentials;
//!
//! let store = Arc::new(MemoryCredentialStore::with_credentials(
//!     Credentials::new(access_token, refresh_token),
//! ));
//! let client = ApiClient::new(ClientConfig::from_env()?, store)?;
//!
//! let orders: Vec<Order> = client.get("/orders").send_json().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod refresh;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{ApiClient, ApiRequest};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, RefreshError};
pub use store::{CredentialStore, MemoryCredentialStore};
pub use transport::Transport;

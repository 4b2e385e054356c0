//! Core types for Sahha.
//!
//! This module provides type-safe wrappers for authentication concepts.

pub mod credential;
pub mod state;

pub use credential::{AccessToken, Credentials, RefreshToken};
pub use state::AuthState;

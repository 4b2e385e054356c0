//! Sahha Core - Shared credential types.
//!
//! This crate provides the types shared by every Sahha component that talks
//! to the backend:
//! - `client` - Authenticated HTTP client with token refresh
//! - `cli` - Command-line tool for issuing authenticated requests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no global
//! state. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Secret token newtypes, the credential pair, and authentication state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

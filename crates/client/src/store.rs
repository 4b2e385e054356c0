//! Credential storage.
//!
//! The client never owns credentials itself: it reads the current pair from a
//! [`CredentialStore`] before every request, replaces it after a successful
//! refresh, and clears it when a refresh fails.

use std::sync::{PoisonError, RwLock};

use sahha_core::{AccessToken, AuthState, Credentials, RefreshToken};
use tokio::sync::watch;

/// Process-wide holder of the access/refresh token pair.
///
/// Implementations must be cheap to read; `access_token` is called before
/// every outbound request.
pub trait CredentialStore: Send + Sync {
    /// Current access token, if authenticated.
    fn access_token(&self) -> Option<AccessToken>;

    /// Current refresh token, if authenticated.
    fn refresh_token(&self) -> Option<RefreshToken>;

    /// Overwrite both tokens and mark the store authenticated.
    fn set_credentials(&self, credentials: Credentials);

    /// Drop both tokens and mark the store unauthenticated.
    fn clear_credentials(&self);
}

/// In-memory credential store.
///
/// Publishes every authentication state transition on a watch channel so the
/// application can react to a forced logout.
pub struct MemoryCredentialStore {
    credentials: RwLock<Option<Credentials>>,
    state: watch::Sender<AuthState>,
}

impl MemoryCredentialStore {
    /// Create an empty, unauthenticated store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            credentials: RwLock::new(None),
            state: watch::Sender::new(AuthState::Unauthenticated),
        }
    }

    /// Create a store already holding a credential pair (e.g., after login).
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            credentials: RwLock::new(Some(credentials)),
            state: watch::Sender::new(AuthState::Authenticated),
        }
    }

    /// Current credential pair (if set).
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current authentication state.
    pub fn auth_state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Subscribe to authentication state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn access_token(&self) -> Option<AccessToken> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.access_token.clone())
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.refresh_token.clone())
    }

    fn set_credentials(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
        self.state.send_replace(AuthState::Authenticated);
    }

    fn clear_credentials(&self) {
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.state.send_replace(AuthState::Unauthenticated);
    }
}

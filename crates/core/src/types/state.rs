//! Authentication state.

use serde::{Deserialize, Serialize};

/// Whether a credential store currently holds a usable credential pair.
///
/// A transition to `Unauthenticated` after a failed refresh is the
/// "logged out" signal the rest of the application reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Authenticated,
    #[default]
    Unauthenticated,
}

impl AuthState {
    /// Returns true if credentials are present.
    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticated => write!(f, "authenticated"),
            Self::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}

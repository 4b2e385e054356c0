//! Credential types.
//!
//! Type-safe wrappers for the bearer credentials issued by the Sahha backend.
//! Token values are held in [`SecretString`] so they never leak through
//! `Debug` output or structured logs.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

/// Macro to define a secret token wrapper.
///
/// Creates a newtype wrapper around [`SecretString`] with:
/// - `Clone` and a redacting `Debug`
/// - Accessors: `new()`, `expose()`, `matches()`
/// - `From<String>` and `From<&str>` implementations
macro_rules! define_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(SecretString);

        impl $name {
            /// Wrap a raw token value.
            #[must_use]
            pub fn new(token: impl Into<String>) -> Self {
                Self(SecretString::from(token.into()))
            }

            /// Expose the raw token value.
            ///
            /// Only call this at the point the token goes on the wire.
            #[must_use]
            pub fn expose(&self) -> &str {
                self.0.expose_secret()
            }

            /// Whether both tokens carry the same value.
            #[must_use]
            pub fn matches(&self, other: &Self) -> bool {
                self.expose() == other.expose()
            }
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(concat!(stringify!($name), "([REDACTED])"))
            }
        }

        impl From<String> for $name {
            fn from(token: String) -> Self {
                Self::new(token)
            }
        }

        impl From<&str> for $name {
            fn from(token: &str) -> Self {
                Self::new(token)
            }
        }
    };
}

define_token!(
    /// Short-lived bearer credential attached to outbound requests.
    AccessToken
);

define_token!(
    /// Longer-lived credential used solely to obtain a new access token.
    RefreshToken
);

/// Access/refresh token pair held by a credential store.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Bearer token for API requests.
    pub access_token: AccessToken,
    /// Token exchanged at the refresh endpoint for a new access token.
    pub refresh_token: RefreshToken,
    /// When this pair was issued (login or refresh).
    pub obtained_at: DateTime<Utc>,
}

impl Credentials {
    /// Create a credential pair stamped with the current time.
    #[must_use]
    pub fn new(access_token: impl Into<AccessToken>, refresh_token: impl Into<RefreshToken>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            obtained_at: Utc::now(),
        }
    }

    /// Build the pair that follows a refresh.
    ///
    /// The refresh token returned by the backend is authoritative when
    /// present; otherwise the previous one is retained.
    #[must_use]
    pub fn rotated(
        access_token: AccessToken,
        new_refresh_token: Option<RefreshToken>,
        previous_refresh_token: RefreshToken,
    ) -> Self {
        Self {
            access_token,
            refresh_token: new_refresh_token.unwrap_or(previous_refresh_token),
            obtained_at: Utc::now(),
        }
    }
}

//! Error types for token acquisition.
//!
//! A single [`AuthError`] struct carries an [`AuthErrorCode`] so callers can
//! branch on the category without matching on message text.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// The category of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    /// No authenticated principal when a refresh was attempted.
    NoSession,
    /// The identity provider refused to issue a token.
    AuthenticationFailed,
    /// A downstream API rejected the credential.
    AuthorizationFailure,
    /// The identity provider did not answer within the refresh timeout.
    Timeout,
    /// Transport failure talking to the identity provider.
    Network,
    /// The identity provider answered with something we could not decode.
    InvalidResponse,
    /// The key-value store could not be read or written.
    Storage,
    /// Missing or invalid configuration.
    Configuration,
    /// Unexpected internal state.
    Internal,
}

impl AuthErrorCode {
    /// Returns true when a later attempt could succeed without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network)
    }

    /// Returns true when the only way forward is signing in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::NoSession | Self::AuthenticationFailed | Self::AuthorizationFailure
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailure => "authorization_failure",
            Self::Timeout => "timeout",
            Self::Network => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::Storage => "storage_error",
            Self::Configuration => "configuration_error",
            Self::Internal => "internal_error",
        }
    }
}

impl fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while acquiring or storing an access token.
///
/// Cloneable so that a single refresh outcome can be handed to every task
/// waiting on it.
#[derive(Debug, Clone, Error)]
pub struct AuthError {
    code: AuthErrorCode,
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    pub fn new(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn no_session() -> Self {
        Self::new(AuthErrorCode::NoSession, "no signed-in user")
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::AuthenticationFailed, message)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::AuthorizationFailure, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Network, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::InvalidResponse, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Storage, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Configuration, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AuthErrorCode::Internal, message)
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn code(&self) -> AuthErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn requires_login(&self) -> bool {
        self.code.requires_login()
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string()).with_source(err)
    }
}

/// Result alias for token operations.
pub type AuthResult<T> = Result<T, AuthError>;

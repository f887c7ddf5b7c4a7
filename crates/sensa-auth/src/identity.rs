//! Identity provider seam.
//!
//! The [`IdentityProvider`] trait is the only thing the token manager knows
//! about authentication: who is signed in, and how to obtain an access token
//! for them.

use std::future::Future;
use std::pin::Pin;

use crate::error::{AuthError, AuthResult};

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Provider-assigned user id.
    pub uid: String,
    /// Email address, when the provider knows one.
    pub email: Option<String>,
}

impl Principal {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// A human label: the email when present, otherwise the uid.
    pub fn label(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.uid)
    }
}

/// Source of the signed-in principal and its access tokens.
///
/// # Implementation Notes
///
/// - `current_user` must be cheap and must not block on I/O; the token
///   manager calls it on every token request.
/// - `id_token` with `force_refresh = true` must bypass any cache held by
///   the provider itself.
pub trait IdentityProvider: Send + Sync {
    /// Returns the name of this provider (e.g. `"firebase"`).
    fn name(&self) -> &str;

    /// The currently signed-in principal, if any.
    fn current_user(&self) -> Option<Principal>;

    /// Issues an access token for `principal`.
    ///
    /// # Errors
    ///
    /// Fails with [`AuthErrorCode::AuthenticationFailed`](crate::AuthErrorCode)
    /// when the session is no longer valid on the provider side.
    fn id_token<'a>(
        &'a self,
        principal: &'a Principal,
        force_refresh: bool,
    ) -> BoxFuture<'a, AuthResult<String>>;
}

/// A provider with nobody signed in.
///
/// Used when no identity backend is configured.
#[derive(Debug, Default)]
pub struct SignedOutIdentity;

impl IdentityProvider for SignedOutIdentity {
    fn name(&self) -> &str {
        "signed-out"
    }

    fn current_user(&self) -> Option<Principal> {
        None
    }

    fn id_token<'a>(
        &'a self,
        _principal: &'a Principal,
        _force_refresh: bool,
    ) -> BoxFuture<'a, AuthResult<String>> {
        Box::pin(async { Err(AuthError::no_session()) })
    }
}

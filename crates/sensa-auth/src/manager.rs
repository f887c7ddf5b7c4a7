//! Access-token lifecycle manager.
//!
//! [`TokenManager`] hands out a token it believes to be valid and reacts to
//! downstream authorization failures. Validity is checked optimistically
//! against a locally computed expiry; no network call happens while the stored
//! token is within its TTL. When the server disagrees, callers report the
//! failure through [`TokenManager::handle_api_error`] and retry.
//!
//! # Refresh de-duplication
//!
//! At most one refresh runs at a time. The first caller to need one installs
//! a shared future in the refresh slot; every caller arriving while it is
//! pending awaits that same future. The slot returns to idle as soon as the
//! refresh resolves, whatever the outcome.
//!
//! ```text
//!            get_valid_token ──► stored & fresh? ──yes──► token
//!                                     │ no
//!                                     ▼
//!   Idle ──first caller──► Refreshing(shared) ◄──later callers join
//!    ▲                            │
//!    └────────resolved────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use sensa_core::EpochMillis;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::classify::is_authorization_failure;
use crate::error::{AuthError, AuthResult};
use crate::identity::{IdentityProvider, Principal};
use crate::session::{SessionEvent, SessionEvents};
use crate::state::{self, StoredToken, TokenSnapshot};
use crate::store::KeyValueStore;

/// Lifetime assumed for every issued token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Upper bound on a single identity-provider refresh call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for [`TokenManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    /// Fixed TTL used to compute the stored expiry. This is a client-side
    /// assumption and is not read from the issued token.
    pub ttl: Duration,
    /// Timeout around the identity-provider call; `None` waits forever.
    pub refresh_timeout: Option<Duration>,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TOKEN_TTL,
            refresh_timeout: Some(DEFAULT_REFRESH_TIMEOUT),
        }
    }
}

impl TokenSettings {
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_timeout = timeout;
        self
    }
}

type RefreshFuture = Shared<BoxFuture<'static, AuthResult<String>>>;

enum RefreshState {
    Idle,
    Refreshing(RefreshFuture),
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn KeyValueStore>,
    settings: TokenSettings,
    refresh: Mutex<RefreshState>,
    events: SessionEvents,
}

/// Owns the client's single access token.
///
/// Construct one at start-up and clone it into every API caller; clones share
/// state.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("identity", &self.inner.identity.name())
            .field("settings", &self.inner.settings)
            .field("refreshing", &self.is_refreshing())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_settings(identity, store, TokenSettings::default())
    }

    pub fn with_settings(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn KeyValueStore>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                identity,
                store,
                settings,
                refresh: Mutex::new(RefreshState::Idle),
                events: SessionEvents::default(),
            }),
        }
    }

    /// The signed-in principal, as reported by the identity provider.
    pub fn current_user(&self) -> Option<Principal> {
        self.inner.identity.current_user()
    }

    /// Subscribes to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Returns a token believed to be valid, or `None` when not signed in.
    ///
    /// The stored token is returned without any network call while it is
    /// within its TTL. Otherwise a refresh is performed (or joined). Refresh
    /// failures are logged and reported as `None`.
    pub async fn get_valid_token(&self) -> Option<String> {
        if self.inner.identity.current_user().is_none() {
            debug!("no signed-in user, not issuing a token");
            return None;
        }

        match state::load(self.inner.store.as_ref()) {
            Some(stored) if !stored.is_expired_at(EpochMillis::now()) => {
                return Some(stored.token);
            }
            Some(stored) => debug!("stored token expired at {}", stored.expires_at),
            None => debug!("no stored token"),
        }

        match self.refresh_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("could not obtain an access token: {}", e);
                None
            }
        }
    }

    /// Forces a refresh, joining one already in flight.
    ///
    /// On failure the stored token state has been cleared.
    pub async fn refresh_token(&self) -> AuthResult<String> {
        let refresh = {
            let mut slot = self
                .inner
                .refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match &*slot {
                RefreshState::Refreshing(pending) => {
                    debug!("joining in-flight token refresh");
                    pending.clone()
                }
                RefreshState::Idle => {
                    let pending = Inner::start_refresh(Arc::clone(&self.inner));
                    *slot = RefreshState::Refreshing(pending.clone());
                    pending
                }
            }
        };
        refresh.await
    }

    /// Decides whether a failed downstream request should be retried.
    ///
    /// Returns `true` only when `error` is an authorization failure and a
    /// fresh token was obtained. When the refresh itself fails, token state
    /// is cleared and [`SessionEvent::Expired`] is published.
    pub async fn handle_api_error(&self, error: &Value) -> bool {
        if !is_authorization_failure(error) {
            debug!("api error is not an authorization failure");
            return false;
        }

        info!("access token rejected by api, refreshing");
        match self.refresh_token().await {
            Ok(_) => true,
            Err(e) => {
                let escalated = AuthError::authorization(format!(
                    "access token rejected and refresh failed: {}",
                    e
                ))
                .with_source(e);
                error!("session expired: {}", escalated);
                self.clear_tokens();
                self.inner.events.publish(SessionEvent::expired());
                false
            }
        }
    }

    /// Removes the stored token and expiry.
    pub fn clear_tokens(&self) {
        state::clear(self.inner.store.as_ref());
        debug!("cleared stored token");
    }

    /// Snapshot of the stored token state.
    pub fn token_state(&self) -> TokenSnapshot {
        TokenSnapshot::capture(self.inner.store.as_ref(), EpochMillis::now())
    }

    /// True while a refresh is pending.
    pub fn is_refreshing(&self) -> bool {
        matches!(
            *self
                .inner
                .refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
            RefreshState::Refreshing(_)
        )
    }
}

impl Inner {
    fn start_refresh(inner: Arc<Self>) -> RefreshFuture {
        async move {
            let result = inner.perform_refresh().await;
            *inner.refresh.lock().unwrap_or_else(PoisonError::into_inner) = RefreshState::Idle;
            result
        }
        .boxed()
        .shared()
    }

    async fn perform_refresh(&self) -> AuthResult<String> {
        match self.issue_token().await {
            Ok(token) => {
                let stored = StoredToken::new(token, EpochMillis::from_now(self.settings.ttl));
                if let Err(e) = state::save(self.store.as_ref(), &stored) {
                    warn!("refreshed token could not be persisted: {}", e);
                }
                info!("access token refreshed, valid until {}", stored.expires_at);
                self.events.publish(SessionEvent::Refreshed {
                    expires_at: stored.expires_at,
                });
                Ok(stored.token)
            }
            Err(e) => {
                state::clear(self.store.as_ref());
                Err(e)
            }
        }
    }

    async fn issue_token(&self) -> AuthResult<String> {
        let principal = self
            .identity
            .current_user()
            .ok_or_else(AuthError::no_session)?;

        debug!("requesting forced token refresh for {}", principal.label());
        let request = self.identity.id_token(&principal, true);
        match self.settings.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                AuthError::timeout(format!(
                    "{} did not issue a token within {:?}",
                    self.identity.name(),
                    limit
                ))
            })?,
            None => request.await,
        }
    }
}

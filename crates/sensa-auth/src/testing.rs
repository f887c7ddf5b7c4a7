//! Test doubles shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{AuthError, AuthResult};
use crate::identity::{BoxFuture, IdentityProvider, Principal};

/// Identity provider answering token requests from a script.
pub(crate) struct ScriptedIdentity {
    user: Option<Principal>,
    responses: Mutex<VecDeque<AuthResult<String>>>,
    delay: Option<Duration>,
    hang: bool,
    forced: AtomicUsize,
    total: AtomicUsize,
}

impl ScriptedIdentity {
    pub(crate) fn signed_in() -> Self {
        Self::with_user(Some(Principal::new("uid-1").with_email("ada@example.com")))
    }

    pub(crate) fn signed_out() -> Self {
        Self::with_user(None)
    }

    fn with_user(user: Option<Principal>) -> Self {
        Self {
            user,
            responses: Mutex::new(VecDeque::new()),
            delay: None,
            hang: false,
            forced: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    pub(crate) fn respond_ok(self, token: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(token.to_string()));
        self
    }

    pub(crate) fn respond_err(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(AuthError::authentication(message)));
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Calls made with `force_refresh = true`.
    pub(crate) fn forced_calls(&self) -> usize {
        self.forced.load(Ordering::SeqCst)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for ScriptedIdentity {
    fn name(&self) -> &str {
        "scripted"
    }

    fn current_user(&self) -> Option<Principal> {
        self.user.clone()
    }

    fn id_token<'a>(
        &'a self,
        _principal: &'a Principal,
        force_refresh: bool,
    ) -> BoxFuture<'a, AuthResult<String>> {
        Box::pin(async move {
            self.total.fetch_add(1, Ordering::SeqCst);
            if force_refresh {
                self.forced.fetch_add(1, Ordering::SeqCst);
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.hang {
                std::future::pending::<()>().await;
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AuthError::authentication("no scripted response")))
        })
    }
}

//! Session lifecycle notifications.
//!
//! The token manager never tears down the application itself. When a session
//! becomes unusable it publishes [`SessionEvent::Expired`] and leaves the
//! re-authentication flow to whoever is listening.

use sensa_core::EpochMillis;
use tokio::sync::broadcast;

/// User-facing notice attached to [`SessionEvent::Expired`].
pub const SESSION_EXPIRED_NOTICE: &str = "Session expired, please log in again";

const CHANNEL_CAPACITY: usize = 16;

/// A change in the session observed by the token manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A fresh token was issued and stored.
    Refreshed { expires_at: EpochMillis },
    /// The identity provider refused to issue a token after a downstream
    /// authorization failure. Token state has been cleared.
    Expired { notice: String },
}

impl SessionEvent {
    pub fn expired() -> Self {
        Self::Expired {
            notice: SESSION_EXPIRED_NOTICE.to_string(),
        }
    }
}

/// Fan-out of [`SessionEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl SessionEvents {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event. Having no subscribers is fine.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }
}

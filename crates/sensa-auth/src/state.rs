//! Persisted token state.
//!
//! The access token and its expiry live under two keys of a
//! [`KeyValueStore`]. They are always written together and cleared together.

use sensa_core::EpochMillis;
use tracing::warn;

use crate::error::AuthResult;
use crate::store::KeyValueStore;

/// Store key holding the access token.
pub const TOKEN_KEY: &str = "accessToken";

/// Store key holding the expiry as decimal epoch milliseconds.
pub const EXPIRY_KEY: &str = "tokenExpiry";

/// A token together with its locally computed expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: EpochMillis,
}

impl StoredToken {
    pub fn new(token: impl Into<String>, expires_at: EpochMillis) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// True once `now` has reached the expiry.
    pub fn is_expired_at(&self, now: EpochMillis) -> bool {
        self.expires_at.is_reached(now)
    }
}

/// Reads the stored token.
///
/// Returns `None` if either half is missing or the expiry does not parse.
pub fn load(store: &dyn KeyValueStore) -> Option<StoredToken> {
    let token = store.get(TOKEN_KEY)?;
    let raw_expiry = store.get(EXPIRY_KEY)?;
    match raw_expiry.parse::<EpochMillis>() {
        Ok(expires_at) => Some(StoredToken { token, expires_at }),
        Err(e) => {
            warn!("ignoring unparsable token expiry {:?}: {}", raw_expiry, e);
            None
        }
    }
}

/// Writes both halves.
///
/// If either write fails, both keys are removed before the error is returned.
pub fn save(store: &dyn KeyValueStore, stored: &StoredToken) -> AuthResult<()> {
    let result = store
        .set(TOKEN_KEY, &stored.token)
        .and_then(|()| store.set(EXPIRY_KEY, &stored.expires_at.as_millis().to_string()));

    if let Err(e) = result {
        clear(store);
        return Err(e);
    }
    Ok(())
}

/// Removes both halves, logging (not returning) removal failures.
pub fn clear(store: &dyn KeyValueStore) {
    for key in [TOKEN_KEY, EXPIRY_KEY] {
        if let Err(e) = store.remove(key) {
            warn!("failed to remove {} from store: {}", key, e);
        }
    }
}

/// Read-only view of the persisted state, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub has_token: bool,
    pub expires_at: Option<EpochMillis>,
    pub expired: bool,
}

impl TokenSnapshot {
    pub fn capture(store: &dyn KeyValueStore, now: EpochMillis) -> Self {
        match load(store) {
            Some(stored) => Self {
                has_token: true,
                expires_at: Some(stored.expires_at),
                expired: stored.is_expired_at(now),
            },
            None => Self {
                has_token: false,
                expires_at: None,
                expired: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::store::MemoryStore;

    #[test]
    fn save_then_load() {
        let store = MemoryStore::new();
        let stored = StoredToken::new("T1", EpochMillis::new(5_000));
        save(&store, &stored).unwrap();

        assert_eq!(store.get(TOKEN_KEY).as_deref(), Some("T1"));
        assert_eq!(store.get(EXPIRY_KEY).as_deref(), Some("5000"));
        assert_eq!(load(&store), Some(stored));
    }

    #[test]
    fn half_written_state_is_absent() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "T1").unwrap();
        assert!(load(&store).is_none());

        let store = MemoryStore::new();
        store.set(EXPIRY_KEY, "5000").unwrap();
        assert!(load(&store).is_none());
    }

    #[test]
    fn garbage_expiry_is_absent() {
        let store = MemoryStore::new();
        store.set(TOKEN_KEY, "T1").unwrap();
        store.set(EXPIRY_KEY, "tomorrow").unwrap();
        assert!(load(&store).is_none());
    }

    #[test]
    fn clear_removes_both() {
        let store = MemoryStore::new();
        save(&store, &StoredToken::new("T1", EpochMillis::new(1))).unwrap();
        clear(&store);
        assert!(store.is_empty());
    }

    /// Accepts the token write, rejects the expiry write.
    struct FailingExpiryStore(MemoryStore);

    impl KeyValueStore for FailingExpiryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> AuthResult<()> {
            if key == EXPIRY_KEY {
                return Err(AuthError::storage("disk full"));
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> AuthResult<()> {
            self.0.remove(key)
        }
    }

    #[test]
    fn partial_write_failure_leaves_nothing_behind() {
        let store = FailingExpiryStore(MemoryStore::new());
        let result = save(&store, &StoredToken::new("T1", EpochMillis::new(1)));

        assert!(result.is_err());
        assert!(store.get(TOKEN_KEY).is_none());
        assert!(store.get(EXPIRY_KEY).is_none());
    }

    #[test]
    fn snapshot_reports_expiry() {
        let store = MemoryStore::new();
        let empty = TokenSnapshot::capture(&store, EpochMillis::new(0));
        assert!(!empty.has_token);
        assert!(empty.expires_at.is_none());

        save(&store, &StoredToken::new("T1", EpochMillis::new(1_000))).unwrap();
        let fresh = TokenSnapshot::capture(&store, EpochMillis::new(500));
        assert!(fresh.has_token);
        assert!(!fresh.expired);

        let stale = TokenSnapshot::capture(&store, EpochMillis::new(1_000));
        assert!(stale.expired);
    }
}

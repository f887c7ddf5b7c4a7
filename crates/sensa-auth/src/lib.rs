//! Access-token lifecycle for Google API callers.
//!
//! This crate keeps a short-lived bearer token available to the code that
//! talks to Calendar and Gmail:
//!
//! - [`TokenManager`] - Serves cached tokens, refreshes them once per burst of callers
//! - [`IdentityProvider`] - Seam to the identity service that mints tokens
//! - [`KeyValueStore`] - Seam to the persistent store holding the cached token
//! - [`is_authorization_failure`] - Decides whether an API error means "bad token"
//! - [`call_with_token`] - Fetch, send, refresh and retry once
//!
//! # Architecture
//!
//! ```text
//!   API wrappers ──► call_with_token ──► TokenManager ──► IdentityProvider
//!                                              │              (Firebase)
//!                                              ▼
//!                                        KeyValueStore
//!                                   (accessToken, tokenExpiry)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sensa_auth::{FileStore, TokenManager};
//! use sensa_auth::firebase::{FirebaseConfig, FirebaseIdentity};
//!
//! let sessions = Arc::new(FileStore::open("session.json")?);
//! let identity = FirebaseIdentity::new(FirebaseConfig::new(api_key), sessions)?;
//! let manager = TokenManager::new(Arc::new(identity), Arc::new(FileStore::open("tokens.json")?));
//!
//! if let Some(token) = manager.get_valid_token().await {
//!     // call the API with `Authorization: Bearer {token}`
//! }
//! ```

pub mod call;
pub mod classify;
pub mod error;
#[cfg(feature = "firebase")]
pub mod firebase;
pub mod identity;
pub mod manager;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
mod testing;

pub use call::{CallError, call_with_token};
pub use classify::is_authorization_failure;
pub use error::{AuthError, AuthErrorCode, AuthResult};
pub use identity::{BoxFuture, IdentityProvider, Principal, SignedOutIdentity};
pub use manager::{DEFAULT_REFRESH_TIMEOUT, DEFAULT_TOKEN_TTL, TokenManager, TokenSettings};
pub use session::{SESSION_EXPIRED_NOTICE, SessionEvent};
pub use state::{StoredToken, TokenSnapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};

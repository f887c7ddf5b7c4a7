//! Firebase Authentication identity provider.
//!
//! [`FirebaseIdentity`] talks to the Firebase Auth REST endpoints:
//!
//! - `accounts:signInWithPassword` on the Identity Toolkit API to sign in
//! - `token` on the Secure Token API to exchange the refresh token for a
//!   fresh ID token
//!
//! The signed-in user (uid, email, refresh token, cached ID token) is kept in
//! a [`KeyValueStore`](crate::KeyValueStore) under a key derived from the API
//! key, so a file-backed store keeps the session across restarts.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sensa_auth::firebase::{FirebaseConfig, FirebaseIdentity};
//! use sensa_auth::{FileStore, TokenManager};
//!
//! let store = Arc::new(FileStore::open("session.json")?);
//! let identity = Arc::new(FirebaseIdentity::new(FirebaseConfig::new(api_key), store.clone())?);
//! identity.sign_in_with_password("ada@example.com", "secret").await?;
//!
//! let manager = TokenManager::new(identity, store);
//! let token = manager.get_valid_token().await;
//! ```

mod api;
mod config;
mod provider;

pub use api::{FirebaseApi, RefreshResponse, SignInResponse};
pub use config::FirebaseConfig;
pub use provider::{FirebaseIdentity, FirebaseUser};

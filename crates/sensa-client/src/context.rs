//! Wiring of the identity provider, stores and token manager for commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sensa_auth::{
    FileStore, IdentityProvider, KeyValueStore, SignedOutIdentity, TokenManager, TokenSettings,
};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Everything a command needs to act on the session.
pub struct Context {
    pub manager: TokenManager,
    /// The Firebase provider when `[firebase]` is configured.
    #[cfg(feature = "firebase")]
    pub firebase: Option<Arc<sensa_auth::firebase::FirebaseIdentity>>,
}

impl Context {
    /// Opens the stores named in `config` and builds the token manager.
    ///
    /// When the session and token paths name the same file, both use one
    /// store. Without a `[firebase]` section the manager runs signed out.
    pub fn open(config: &ClientConfig) -> ClientResult<Self> {
        let settings = config.tokens.to_settings()?;
        let store = Arc::new(FileStore::open(config.tokens.store_path())?);
        debug!("token store at {}", store.path().display());

        #[cfg(feature = "firebase")]
        if let Some(ref firebase) = config.firebase {
            let session_path = firebase.session_path();
            let sessions = if same_file(&session_path, store.path()) {
                debug!("firebase session shares the token store");
                Arc::clone(&store)
            } else {
                let sessions = Arc::new(FileStore::open(session_path)?);
                debug!("firebase session at {}", sessions.path().display());
                sessions
            };
            let identity = Arc::new(sensa_auth::firebase::FirebaseIdentity::new(
                firebase.to_provider_config()?,
                sessions,
            )?);
            return Ok(Self {
                manager: TokenManager::with_settings(identity.clone(), store, settings),
                firebase: Some(identity),
            });
        }

        Ok(Self::with_identity(Arc::new(SignedOutIdentity), store, settings))
    }

    /// Builds a context around an arbitrary identity provider.
    pub fn with_identity(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn KeyValueStore>,
        settings: TokenSettings,
    ) -> Self {
        Self {
            manager: TokenManager::with_settings(identity, store, settings),
            #[cfg(feature = "firebase")]
            firebase: None,
        }
    }
}

/// True when both paths resolve to the same file, existing or not.
fn same_file(a: &Path, b: &Path) -> bool {
    resolve(a) == resolve(b)
}

fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|parent| parent.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

//! [`IdentityProvider`] implementation backed by Firebase Auth.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use sensa_core::EpochMillis;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::identity::{BoxFuture, IdentityProvider, Principal};
use crate::store::KeyValueStore;

use super::api::{FirebaseApi, parse_expires_in};
use super::config::FirebaseConfig;

/// Cached ID tokens are reissued this long before they expire.
const ID_TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Lifetime assumed when Firebase omits or garbles `expires_in`.
const FALLBACK_ID_TOKEN_LIFETIME: u64 = 3600;

/// The persisted Firebase user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseUser {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub refresh_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub id_token_expires_at: Option<EpochMillis>,
}

impl FirebaseUser {
    fn principal(&self) -> Principal {
        let principal = Principal::new(&self.uid);
        match self.email {
            Some(ref email) => principal.with_email(email),
            None => principal,
        }
    }

    /// The cached ID token, if it is not close to expiry.
    fn cached_id_token(&self, now: EpochMillis) -> Option<&str> {
        let expires_at = self.id_token_expires_at?;
        if expires_at.saturating_sub(ID_TOKEN_REFRESH_MARGIN).is_reached(now) {
            return None;
        }
        self.id_token.as_deref()
    }

    fn store_id_token(&mut self, id_token: String, expires_in: &str) {
        let lifetime = parse_expires_in(expires_in).unwrap_or(FALLBACK_ID_TOKEN_LIFETIME);
        self.id_token = Some(id_token);
        self.id_token_expires_at = Some(EpochMillis::from_now(Duration::from_secs(lifetime)));
    }
}

/// Firebase Auth identity provider.
pub struct FirebaseIdentity {
    api: FirebaseApi,
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
    user: RwLock<Option<FirebaseUser>>,
}

impl std::fmt::Debug for FirebaseIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseIdentity")
            .field("storage_key", &self.storage_key)
            .field("signed_in", &self.current_user().is_some())
            .finish_non_exhaustive()
    }
}

impl FirebaseIdentity {
    /// Creates the provider, restoring a previously persisted user.
    ///
    /// A persisted user that cannot be decoded is discarded with a warning.
    pub fn new(config: FirebaseConfig, store: Arc<dyn KeyValueStore>) -> AuthResult<Self> {
        config.validate().map_err(AuthError::configuration)?;
        let storage_key = config.user_storage_key();

        let user = match store.get(&storage_key) {
            Some(raw) => match serde_json::from_str::<FirebaseUser>(&raw) {
                Ok(user) => {
                    info!("restored firebase session for {}", user.uid);
                    Some(user)
                }
                Err(e) => {
                    warn!("discarding unreadable firebase session: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            api: FirebaseApi::new(config)?,
            store,
            storage_key,
            user: RwLock::new(user),
        })
    }

    /// Signs in with email and password, replacing any current user.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<Principal> {
        let response = self.api.sign_in_with_password(email, password).await?;

        let mut user = FirebaseUser {
            uid: response.local_id,
            email: response.email.or_else(|| Some(email.to_string())),
            refresh_token: response.refresh_token,
            id_token: None,
            id_token_expires_at: None,
        };
        user.store_id_token(response.id_token, &response.expires_in);

        let principal = user.principal();
        self.replace_user(Some(user))?;
        Ok(principal)
    }

    /// Forgets the current user, locally and in the store.
    pub fn sign_out(&self) -> AuthResult<()> {
        info!("signing out of firebase");
        self.replace_user(None)
    }

    fn replace_user(&self, user: Option<FirebaseUser>) -> AuthResult<()> {
        let mut current = self.user.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(user.as_ref())?;
        *current = user;
        Ok(())
    }

    /// Stores a refreshed copy of the current user.
    ///
    /// Returns `false` without writing anything when that user is no longer
    /// signed in.
    fn update_current_user(&self, user: FirebaseUser) -> AuthResult<bool> {
        let mut current = self.user.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().map(|u| u.uid.as_str()) != Some(user.uid.as_str()) {
            return Ok(false);
        }
        self.persist(Some(&user))?;
        *current = Some(user);
        Ok(true)
    }

    fn forget_if_current(&self, uid: &str) -> AuthResult<()> {
        let mut current = self.user.write().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|u| u.uid == uid) {
            self.persist(None)?;
            *current = None;
        }
        Ok(())
    }

    fn persist(&self, user: Option<&FirebaseUser>) -> AuthResult<()> {
        match user {
            Some(user) => {
                let raw = serde_json::to_string(user).map_err(|e| {
                    AuthError::internal(format!("failed to serialize firebase user: {}", e))
                })?;
                self.store.set(&self.storage_key, &raw)
            }
            None => self.store.remove(&self.storage_key),
        }
    }

    fn snapshot(&self) -> Option<FirebaseUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn issue_id_token(
        &self,
        principal: &Principal,
        force_refresh: bool,
    ) -> AuthResult<String> {
        let mut user = self
            .snapshot()
            .filter(|user| user.uid == principal.uid)
            .ok_or_else(AuthError::no_session)?;

        if !force_refresh {
            if let Some(token) = user.cached_id_token(EpochMillis::now()) {
                return Ok(token.to_string());
            }
        }

        debug!("exchanging refresh token for {}", user.uid);
        let response = match self.api.refresh(&user.refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                if e.requires_login() {
                    warn!("firebase rejected the session, signing out: {}", e);
                    if let Err(clear_err) = self.forget_if_current(&user.uid) {
                        warn!("failed to clear firebase session: {}", clear_err);
                    }
                }
                return Err(e);
            }
        };

        user.refresh_token = response.refresh_token;
        user.store_id_token(response.id_token.clone(), &response.expires_in);
        match self.update_current_user(user) {
            Ok(true) => {}
            Ok(false) => {
                debug!("signed out during token refresh, discarding the new token");
                return Err(AuthError::no_session());
            }
            Err(e) => warn!("refreshed firebase session could not be persisted: {}", e),
        }
        Ok(response.id_token)
    }
}

impl IdentityProvider for FirebaseIdentity {
    fn name(&self) -> &str {
        "firebase"
    }

    fn current_user(&self) -> Option<Principal> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(FirebaseUser::principal)
    }

    fn id_token<'a>(
        &'a self,
        principal: &'a Principal,
        force_refresh: bool,
    ) -> BoxFuture<'a, AuthResult<String>> {
        Box::pin(self.issue_id_token(principal, force_refresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthErrorCode;
    use crate::store::MemoryStore;

    fn user() -> FirebaseUser {
        FirebaseUser {
            uid: "uid-1".to_string(),
            email: Some("ada@example.com".to_string()),
            refresh_token: "refresh-1".to_string(),
            id_token: Some("id-1".to_string()),
            id_token_expires_at: Some(EpochMillis::from_now(Duration::from_secs(3600))),
        }
    }

    fn identity_with(store: Arc<MemoryStore>) -> FirebaseIdentity {
        FirebaseIdentity::new(
            FirebaseConfig::new("AIzaTest").with_emulator("127.0.0.1:9"),
            store,
        )
        .unwrap()
    }

    #[test]
    fn restores_persisted_user() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "firebase:authUser:AIzaTest",
                &serde_json::to_string(&user()).unwrap(),
            )
            .unwrap();

        let identity = identity_with(store);
        let principal = identity.current_user().unwrap();
        assert_eq!(principal.uid, "uid-1");
        assert_eq!(principal.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn unreadable_session_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.set("firebase:authUser:AIzaTest", "{oops").unwrap();

        assert!(identity_with(store).current_user().is_none());
    }

    #[test]
    fn rejects_empty_api_key() {
        let err = FirebaseIdentity::new(FirebaseConfig::new(""), Arc::new(MemoryStore::new()))
            .unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::Configuration);
    }

    #[test]
    fn sign_out_clears_store() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "firebase:authUser:AIzaTest",
                &serde_json::to_string(&user()).unwrap(),
            )
            .unwrap();
        let identity = identity_with(store.clone());

        identity.sign_out().unwrap();

        assert!(identity.current_user().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn cached_id_token_served_without_network() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "firebase:authUser:AIzaTest",
                &serde_json::to_string(&user()).unwrap(),
            )
            .unwrap();
        let identity = identity_with(store);
        let principal = identity.current_user().unwrap();

        let token = identity.id_token(&principal, false).await.unwrap();
        assert_eq!(token, "id-1");
    }

    #[tokio::test]
    async fn other_principal_has_no_session() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                "firebase:authUser:AIzaTest",
                &serde_json::to_string(&user()).unwrap(),
            )
            .unwrap();
        let identity = identity_with(store);

        let stranger = Principal::new("uid-2");
        let err = identity.id_token(&stranger, false).await.unwrap_err();
        assert_eq!(err.code(), AuthErrorCode::NoSession);
    }

    #[test]
    fn cached_token_near_expiry_is_ignored() {
        let mut user = user();
        let now = EpochMillis::now();
        user.id_token_expires_at = Some(now.saturating_add(Duration::from_secs(60)));
        assert!(user.cached_id_token(now).is_none());

        user.id_token_expires_at = Some(now.saturating_add(Duration::from_secs(600)));
        assert_eq!(user.cached_id_token(now), Some("id-1"));
    }

    #[test]
    fn unparsable_lifetime_falls_back_to_an_hour() {
        let mut user = user();
        let before = EpochMillis::now();
        user.store_id_token("id-2".to_string(), "n/a");

        let expires_at = user.id_token_expires_at.unwrap();
        let delta = expires_at.as_millis() - before.as_millis();
        assert!((3_600_000..3_605_000).contains(&delta));
        assert_eq!(user.id_token.as_deref(), Some("id-2"));
    }

    mod http {
        use serde_json::json;
        use wiremock::matchers::{body_partial_json, body_string_contains, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::*;

        const SIGN_IN_PATH: &str = "/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword";
        const TOKEN_PATH: &str = "/securetoken.googleapis.com/v1/token";
        const USER_KEY: &str = "firebase:authUser:AIzaTest";

        fn identity_on(server: &MockServer, store: Arc<MemoryStore>) -> FirebaseIdentity {
            let config = FirebaseConfig::new("AIzaTest").with_emulator(&server.address().to_string());
            FirebaseIdentity::new(config, store).unwrap()
        }

        fn seeded_store() -> Arc<MemoryStore> {
            let store = Arc::new(MemoryStore::new());
            store
                .set(USER_KEY, &serde_json::to_string(&user()).unwrap())
                .unwrap();
            store
        }

        fn stored_user(store: &MemoryStore) -> FirebaseUser {
            serde_json::from_str(&store.get(USER_KEY).unwrap()).unwrap()
        }

        fn refresh_reply(id_token: &str, refresh_token: &str) -> ResponseTemplate {
            ResponseTemplate::new(200).set_body_json(json!({
                "access_token": id_token,
                "expires_in": "3600",
                "token_type": "Bearer",
                "refresh_token": refresh_token,
                "id_token": id_token,
                "user_id": "uid-1",
                "project_id": "1234"
            }))
        }

        fn firebase_error(status: u16, code: &str) -> ResponseTemplate {
            ResponseTemplate::new(status).set_body_json(json!({
                "error": { "code": status, "message": code, "status": "INVALID_ARGUMENT" }
            }))
        }

        #[tokio::test]
        async fn sign_in_persists_user() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(SIGN_IN_PATH))
                .and(query_param("key", "AIzaTest"))
                .and(body_partial_json(json!({
                    "email": "ada@example.com",
                    "password": "hunter2",
                    "returnSecureToken": true
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "localId": "uid-1",
                    "email": "ada@example.com",
                    "idToken": "id-1",
                    "refreshToken": "refresh-1",
                    "expiresIn": "3600"
                })))
                .expect(1)
                .mount(&server)
                .await;
            let store = Arc::new(MemoryStore::new());
            let identity = identity_on(&server, store.clone());

            let principal = identity
                .sign_in_with_password("ada@example.com", "hunter2")
                .await
                .unwrap();

            assert_eq!(principal.uid, "uid-1");
            assert_eq!(identity.current_user(), Some(principal));
            let saved = stored_user(&store);
            assert_eq!(saved.refresh_token, "refresh-1");
            assert_eq!(saved.id_token.as_deref(), Some("id-1"));
        }

        #[tokio::test]
        async fn wrong_password_is_authentication_failure() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(SIGN_IN_PATH))
                .respond_with(firebase_error(400, "INVALID_LOGIN_CREDENTIALS"))
                .mount(&server)
                .await;
            let store = Arc::new(MemoryStore::new());
            let identity = identity_on(&server, store.clone());

            let err = identity
                .sign_in_with_password("ada@example.com", "wrong")
                .await
                .unwrap_err();

            assert_eq!(err.code(), AuthErrorCode::AuthenticationFailed);
            assert!(identity.current_user().is_none());
            assert!(store.is_empty());
        }

        #[tokio::test]
        async fn undecodable_success_body_is_invalid_response() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(SIGN_IN_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
                .mount(&server)
                .await;
            let identity = identity_on(&server, Arc::new(MemoryStore::new()));

            let err = identity
                .sign_in_with_password("ada@example.com", "hunter2")
                .await
                .unwrap_err();

            assert_eq!(err.code(), AuthErrorCode::InvalidResponse);
        }

        #[tokio::test]
        async fn forced_refresh_rotates_refresh_token() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TOKEN_PATH))
                .and(query_param("key", "AIzaTest"))
                .and(body_string_contains("grant_type=refresh_token"))
                .and(body_string_contains("refresh_token=refresh-1"))
                .respond_with(refresh_reply("id-2", "refresh-2"))
                .expect(1)
                .mount(&server)
                .await;
            let store = seeded_store();
            let identity = identity_on(&server, store.clone());
            let principal = identity.current_user().unwrap();

            let token = identity.id_token(&principal, true).await.unwrap();

            assert_eq!(token, "id-2");
            let saved = stored_user(&store);
            assert_eq!(saved.refresh_token, "refresh-2");
            assert_eq!(saved.id_token.as_deref(), Some("id-2"));
        }

        #[tokio::test]
        async fn stale_cached_token_is_refreshed() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TOKEN_PATH))
                .respond_with(refresh_reply("id-2", "refresh-2"))
                .expect(1)
                .mount(&server)
                .await;
            let mut stale = user();
            stale.id_token_expires_at = Some(EpochMillis::new(0));
            let store = Arc::new(MemoryStore::new());
            store
                .set(USER_KEY, &serde_json::to_string(&stale).unwrap())
                .unwrap();
            let identity = identity_on(&server, store);
            let principal = identity.current_user().unwrap();

            assert_eq!(identity.id_token(&principal, false).await.unwrap(), "id-2");
        }

        #[tokio::test]
        async fn rejected_refresh_token_signs_out() {
            for code in ["TOKEN_EXPIRED", "USER_DISABLED"] {
                let server = MockServer::start().await;
                Mock::given(method("POST"))
                    .and(path(TOKEN_PATH))
                    .respond_with(firebase_error(400, code))
                    .mount(&server)
                    .await;
                let store = seeded_store();
                let identity = identity_on(&server, store.clone());
                let principal = identity.current_user().unwrap();

                let err = identity.id_token(&principal, true).await.unwrap_err();

                assert_eq!(err.code(), AuthErrorCode::AuthenticationFailed, "{}", code);
                assert!(identity.current_user().is_none(), "{}", code);
                assert!(store.is_empty(), "{}", code);
            }
        }

        #[tokio::test]
        async fn throttling_and_outages_keep_the_session() {
            for status in [429, 503] {
                let server = MockServer::start().await;
                Mock::given(method("POST"))
                    .and(path(TOKEN_PATH))
                    .respond_with(ResponseTemplate::new(status).set_body_string("try later"))
                    .mount(&server)
                    .await;
                let store = seeded_store();
                let identity = identity_on(&server, store.clone());
                let principal = identity.current_user().unwrap();

                let err = identity.id_token(&principal, true).await.unwrap_err();

                assert_eq!(err.code(), AuthErrorCode::Network, "{}", status);
                assert!(identity.current_user().is_some(), "{}", status);
                assert_eq!(stored_user(&store).refresh_token, "refresh-1", "{}", status);
            }
        }

        #[tokio::test]
        async fn sign_out_during_refresh_is_not_undone() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path(TOKEN_PATH))
                .respond_with(
                    refresh_reply("id-2", "refresh-2").set_delay(Duration::from_millis(300)),
                )
                .mount(&server)
                .await;
            let store = seeded_store();
            let identity = identity_on(&server, store.clone());
            let principal = identity.current_user().unwrap();

            let (result, ()) = tokio::join!(identity.id_token(&principal, true), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                identity.sign_out().unwrap();
            });

            assert_eq!(result.unwrap_err().code(), AuthErrorCode::NoSession);
            assert!(identity.current_user().is_none());
            assert!(store.is_empty());
        }
    }
}

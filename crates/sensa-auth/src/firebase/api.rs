//! Firebase Auth REST calls.

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AuthError, AuthErrorCode, AuthResult};

use super::config::FirebaseConfig;

/// Response of `accounts:signInWithPassword`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Lifetime of `id_token` in seconds, as a decimal string.
    pub expires_in: String,
}

/// Response of the Secure Token `token` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub id_token: String,
    pub refresh_token: String,
    /// Lifetime of `id_token` in seconds, as a decimal string.
    pub expires_in: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Thin client over the Identity Toolkit and Secure Token APIs.
#[derive(Debug, Clone)]
pub struct FirebaseApi {
    http: reqwest::Client,
    config: FirebaseConfig,
}

impl FirebaseApi {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error if the TLS backend cannot be set up.
    pub fn new(config: FirebaseConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AuthError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;
        Ok(Self { http, config })
    }

    /// Signs in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> AuthResult<SignInResponse> {
        let url = format!(
            "{}/accounts:signInWithPassword",
            self.config.identity_toolkit_url
        );
        debug!("signing in {} via {}", email, url);

        let body = serde_json::json!({
            "email": email,
            "password": password,
            "returnSecureToken": true,
        });
        let request = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body);

        let response: SignInResponse = self.send(request, "sign-in").await?;
        info!("signed in as {}", response.local_id);
        Ok(response)
    }

    /// Exchanges a refresh token for a new ID token.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshResponse> {
        let url = format!("{}/token", self.config.secure_token_url);
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let request = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .form(&params);

        let response: RefreshResponse = self.send(request, "token refresh").await?;
        debug!("refreshed id token for {}", response.user_id);
        Ok(response)
    }

    async fn send<T>(&self, request: reqwest::RequestBuilder, what: &str) -> AuthResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = request.send().await.map_err(|e| {
            let err = if e.is_timeout() {
                AuthError::timeout(format!("{} request timed out", what))
            } else {
                AuthError::network(format!("{} request failed: {}", what, e))
            };
            err.with_source(e)
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::network(format!("failed to read {} response: {}", what, e)))?;

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            AuthError::invalid_response(format!("invalid {} response: {}", what, e))
        })
    }
}

/// Maps a non-success Firebase response to an [`AuthError`].
///
/// Firebase reports failures as `{"error": {"code": 400, "message": "CODE"}}`
/// where `CODE` may carry a suffix such as `" : details"`.
pub(crate) fn error_from_response(status: u16, body: &str) -> AuthError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_default();
    let code = message
        .split(|c: char| c == ' ' || c == ':')
        .next()
        .unwrap_or_default();

    let category = match (status, code) {
        (429, _) | (_, "TOO_MANY_ATTEMPTS_TRY_LATER") => AuthErrorCode::Network,
        (500..=599, _) => AuthErrorCode::Network,
        (
            _,
            "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN"
            | "INVALID_GRANT_TYPE" | "MISSING_REFRESH_TOKEN" | "INVALID_PASSWORD"
            | "EMAIL_NOT_FOUND" | "INVALID_LOGIN_CREDENTIALS" | "INVALID_EMAIL"
            | "PROJECT_NUMBER_MISMATCH",
        ) => AuthErrorCode::AuthenticationFailed,
        (_, "API_KEY_INVALID" | "INVALID_API_KEY") => AuthErrorCode::Configuration,
        (400 | 401 | 403, _) => AuthErrorCode::AuthenticationFailed,
        _ => AuthErrorCode::InvalidResponse,
    };

    let detail = if message.is_empty() {
        body.trim().to_string()
    } else {
        message
    };
    AuthError::new(category, format!("firebase returned {}: {}", status, detail))
}

/// Parses Firebase's `expires_in` (seconds as a string).
pub(crate) fn parse_expires_in(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

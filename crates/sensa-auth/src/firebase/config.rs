//! Firebase provider configuration.

use std::time::Duration;

/// Production Identity Toolkit endpoint.
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Production Secure Token endpoint.
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`FirebaseIdentity`](super::FirebaseIdentity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    /// Web API key of the Firebase project.
    pub api_key: String,
    /// HTTP timeout for each request.
    pub timeout: Duration,
    /// Base URL of the Identity Toolkit API.
    pub identity_toolkit_url: String,
    /// Base URL of the Secure Token API.
    pub secure_token_url: String,
}

impl FirebaseConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            identity_toolkit_url: IDENTITY_TOOLKIT_URL.to_string(),
            secure_token_url: SECURE_TOKEN_URL.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Points both APIs at a local Auth emulator, e.g. `localhost:9099`.
    pub fn with_emulator(mut self, host: &str) -> Self {
        let host = host.trim_end_matches('/');
        self.identity_toolkit_url = format!("http://{}/identitytoolkit.googleapis.com/v1", host);
        self.secure_token_url = format!("http://{}/securetoken.googleapis.com/v1", host);
        self
    }

    /// Store key under which the signed-in user is persisted.
    pub fn user_storage_key(&self) -> String {
        format!("firebase:authUser:{}", self.api_key)
    }

    /// Checks the API key looks usable.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.api_key.is_empty() {
            return Err("api_key is required");
        }
        if self.api_key.chars().any(char::is_whitespace) {
            return Err("api_key must not contain whitespace");
        }
        Ok(())
    }
}

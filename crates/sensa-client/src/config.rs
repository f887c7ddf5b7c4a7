//! Client configuration.
//!
//! All settings live in `config.toml`, by default at
//! `~/.config/sensa/config.toml`. The Firebase `api_key` accepts secret
//! references (`env::VAR`, `pass::entry`), see [`crate::secret`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use sensa_auth::TokenSettings;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Configuration for the `sensa` client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Debug mode.
    pub debug: bool,

    /// Firebase identity settings.
    pub firebase: Option<FirebaseSettings>,

    /// Access-token settings.
    pub tokens: TokenConfig,
}

/// `[firebase]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FirebaseSettings {
    /// Web API key (supports `env::` and `pass::` prefixes).
    pub api_key: Option<String>,

    /// Where the signed-in Firebase user is kept.
    pub session_path: Option<PathBuf>,

    /// Auth emulator host, e.g. `localhost:9099`.
    pub emulator_host: Option<String>,

    /// HTTP timeout for each Firebase request, in seconds.
    pub timeout_secs: Option<u64>,
}

/// `[tokens]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Assumed lifetime of an issued token, in seconds.
    pub ttl_secs: u64,

    /// Timeout for one refresh, in seconds. `0` disables it.
    pub refresh_timeout_secs: u64,

    /// Where `accessToken` and `tokenExpiry` are kept.
    pub store_path: Option<PathBuf>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        let defaults = TokenSettings::default();
        Self {
            ttl_secs: defaults.ttl.as_secs(),
            refresh_timeout_secs: defaults
                .refresh_timeout
                .map(|t| t.as_secs())
                .unwrap_or_default(),
            store_path: None,
        }
    }
}

impl TokenConfig {
    /// Converts to token manager settings.
    pub fn to_settings(&self) -> ClientResult<TokenSettings> {
        if self.ttl_secs == 0 {
            return Err(ClientError::Config(
                "tokens.ttl_secs must be greater than zero".to_string(),
            ));
        }
        let refresh_timeout =
            (self.refresh_timeout_secs > 0).then(|| Duration::from_secs(self.refresh_timeout_secs));
        Ok(TokenSettings::default()
            .with_ttl(Duration::from_secs(self.ttl_secs))
            .with_refresh_timeout(refresh_timeout))
    }

    /// Token store location, falling back to the data directory.
    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("tokens.json"))
    }
}

impl FirebaseSettings {
    /// Session file location, falling back to the data directory.
    pub fn session_path(&self) -> PathBuf {
        self.session_path
            .clone()
            .unwrap_or_else(|| ClientConfig::default_data_dir().join("session.json"))
    }

    /// Resolves the API key, expanding secret references.
    pub fn resolve_api_key(&self) -> ClientResult<String> {
        let raw = self.api_key.as_deref().ok_or_else(|| {
            ClientError::Config(format!(
                "Firebase API key not found. Add to {}:\n  \
                 [firebase]\n  \
                 api_key = \"env::SENSA_FIREBASE_API_KEY\"",
                ClientConfig::default_path().display()
            ))
        })?;
        crate::secret::resolve(raw)
            .map_err(|e| ClientError::Config(format!("failed to resolve api_key: {}", e)))
    }

    /// Builds the Firebase provider configuration.
    #[cfg(feature = "firebase")]
    pub fn to_provider_config(&self) -> ClientResult<sensa_auth::firebase::FirebaseConfig> {
        let mut config = sensa_auth::firebase::FirebaseConfig::new(self.resolve_api_key()?);
        if let Some(ref host) = self.emulator_host {
            config = config.with_emulator(host);
        }
        if let Some(secs) = self.timeout_secs {
            if secs == 0 {
                return Err(ClientError::Config(
                    "firebase.timeout_secs must be greater than zero".to_string(),
                ));
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid [firebase] section: {}", e)))?;
        Ok(config)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it is absent.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> ClientResult<Self> {
        toml::from_str(content)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sensa")
    }

    /// Returns the default data directory.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sensa")
    }
}

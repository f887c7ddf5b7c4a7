//! Configuration commands.

use std::io::Write;
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::secret::SecretRef;

/// Dumps the effective configuration as TOML.
///
/// Secret references are printed as written, never resolved.
pub fn dump(config: &ClientConfig, source: &Path, out: &mut impl Write) -> ClientResult<()> {
    let text = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    writeln!(out, "# config.toml ({})", source.display())?;
    writeln!(out, "{}", text)?;
    Ok(())
}

/// Validates the configuration, resolving the API key.
pub fn validate(config: &ClientConfig, out: &mut impl Write) -> ClientResult<()> {
    config.tokens.to_settings()?;

    match config.firebase {
        Some(ref firebase) => {
            let raw = firebase.api_key.as_deref().unwrap_or_default();
            firebase.resolve_api_key()?;
            #[cfg(feature = "firebase")]
            firebase.to_provider_config()?;
            writeln!(
                out,
                "Firebase api_key resolved from {}.",
                SecretRef::parse(raw).describe()
            )?;
        }
        None => writeln!(out, "No [firebase] section; `sensa login` is unavailable.")?,
    }

    writeln!(out, "Configuration is valid.")?;
    Ok(())
}

/// Shows the configuration and data file paths.
pub fn path(config: &ClientConfig, source: &Path, out: &mut impl Write) -> ClientResult<()> {
    writeln!(out, "config:  {}", source.display())?;
    writeln!(out, "tokens:  {}", config.tokens.store_path().display())?;
    if let Some(ref firebase) = config.firebase {
        writeln!(out, "session: {}", firebase.session_path().display())?;
    }
    Ok(())
}

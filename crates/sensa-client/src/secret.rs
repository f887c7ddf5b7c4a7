//! Secret references in configuration values.
//!
//! A value such as the Firebase API key may point outside `config.toml`:
//!
//! - `env::VAR` reads `$VAR`
//! - `pass::entry` reads the first line of `pass show entry`
//! - anything else is the literal value

use std::process::Command;

/// A parsed configuration value that may reference a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRef<'a> {
    Plain(&'a str),
    Env(&'a str),
    Pass(&'a str),
}

impl<'a> SecretRef<'a> {
    pub fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(entry) = value.strip_prefix("pass::") {
            Self::Pass(entry)
        } else {
            Self::Plain(value)
        }
    }

    /// Human-readable origin, safe to print.
    pub fn describe(&self) -> String {
        match self {
            Self::Plain(_) => "inline value".to_string(),
            Self::Env(var) => format!("environment variable {}", var),
            Self::Pass(entry) => format!("pass entry {}", entry),
        }
    }

    /// Produces the secret value.
    pub fn resolve(&self) -> Result<String, String> {
        match *self {
            Self::Plain(value) => Ok(value.to_string()),
            Self::Env(var) => {
                let value = std::env::var(var)
                    .map_err(|_| format!("environment variable `{}` is not set", var))?;
                non_empty(value, || format!("environment variable `{}` is empty", var))
            }
            Self::Pass(entry) => read_pass_entry(entry),
        }
    }
}

/// Resolves `value` through [`SecretRef`].
pub fn resolve(value: &str) -> Result<String, String> {
    SecretRef::parse(value).resolve()
}

fn read_pass_entry(entry: &str) -> Result<String, String> {
    let output = Command::new("pass")
        .args(["show", entry])
        .output()
        .map_err(|e| format!("could not run `pass show {}`: {}", entry, e))?;

    if !output.status.success() {
        return Err(format!(
            "`pass show {}` exited with {}: {}",
            entry,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let first_line = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    non_empty(first_line, || format!("`pass show {}` returned nothing", entry))
}

fn non_empty(value: String, err: impl FnOnce() -> String) -> Result<String, String> {
    if value.is_empty() { Err(err()) } else { Ok(value) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixes() {
        assert_eq!(SecretRef::parse("AIzaKey"), SecretRef::Plain("AIzaKey"));
        assert_eq!(SecretRef::parse("env::API_KEY"), SecretRef::Env("API_KEY"));
        assert_eq!(
            SecretRef::parse("pass::firebase/api-key"),
            SecretRef::Pass("firebase/api-key")
        );
    }

    #[test]
    fn describe_never_reveals_plain_values() {
        assert_eq!(SecretRef::parse("AIzaKey").describe(), "inline value");
        assert_eq!(
            SecretRef::parse("env::API_KEY").describe(),
            "environment variable API_KEY"
        );
    }

    #[test]
    fn plain_value_is_returned() {
        assert_eq!(resolve("AIzaKey").unwrap(), "AIzaKey");
    }

    #[test]
    fn env_value_is_read() {
        unsafe {
            std::env::set_var("_SENSA_TEST_SECRET", "from-env");
        }
        assert_eq!(resolve("env::_SENSA_TEST_SECRET").unwrap(), "from-env");
        unsafe {
            std::env::remove_var("_SENSA_TEST_SECRET");
        }
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let err = resolve("env::_SENSA_TEST_SECRET_UNSET_4821").unwrap_err();
        assert!(err.contains("not set"));
    }

    #[test]
    fn unknown_pass_entry_is_an_error() {
        assert!(resolve("pass::sensa/does/not/exist/4821").is_err());
    }
}

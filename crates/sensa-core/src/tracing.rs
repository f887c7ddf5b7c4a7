//! Logging setup for sensa binaries.
//!
//! Every crate logs through the `tracing` macros; this module installs the
//! global subscriber once at start-up.
//!
//! ```ignore
//! use sensa_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::for_cli(debug))?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber is already installed.
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The filter directive could not be parsed.
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line human format.
    #[default]
    Compact,
    /// Multi-line human format.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to the `sensa` targets when `RUST_LOG` is unset.
    pub level: Level,
    /// Output format.
    pub format: LogFormat,
    /// Include file and line of the call site.
    pub with_location: bool,
    /// Include the module path of the call site.
    pub with_target: bool,
    /// Explicit filter directive; wins over both `RUST_LOG` and `level`.
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            with_location: false,
            with_target: false,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Configuration for the `sensa` CLI.
    ///
    /// Quiet (warnings only) unless `debug` is set, in which case everything
    /// down to `DEBUG` is shown together with call-site locations.
    #[must_use]
    pub fn for_cli(debug: bool) -> Self {
        if debug {
            Self {
                level: Level::DEBUG,
                with_location: true,
                with_target: true,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The directive used when neither `filter` nor `RUST_LOG` is set.
    pub fn default_directive(&self) -> String {
        format!("sensa={}", self.level)
    }

    fn env_filter(&self) -> Result<EnvFilter, TracingError> {
        match self.filter {
            Some(ref filter) => Ok(EnvFilter::try_new(filter)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the explicit filter is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.env_filter()?;
    let layer = fmt::layer()
        .with_file(config.with_location)
        .with_line_number(config.with_location)
        .with_target(config.with_target)
        .with_writer(std::io::stderr);

    let layer = match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

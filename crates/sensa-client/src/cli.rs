//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// sensa - Access tokens for Google API callers
#[derive(Debug, Parser)]
#[command(name = "sensa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SENSA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password, then fetch an access token
    #[cfg(feature = "firebase")]
    Login {
        /// Account email
        #[arg(long, short)]
        email: String,

        /// Account password
        #[arg(long, env = "SENSA_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored access token
    Logout,

    /// Print a valid access token, refreshing it when needed
    Token,

    /// Show the signed-in user and stored token state
    Status,

    /// Report whether an API error body would trigger a token refresh
    Classify {
        /// Error body as JSON, e.g. '{"status": 401}'
        json: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

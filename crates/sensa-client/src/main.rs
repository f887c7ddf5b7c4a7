//! sensa CLI entry point.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use sensa_client::cli::{Cli, Command, ConfigAction};
use sensa_client::commands;
use sensa_client::config::ClientConfig;
use sensa_client::context::Context;
use sensa_client::error::ClientResult;
use sensa_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => ClientConfig::load_from(path),
        None => ClientConfig::load(),
    };

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    if let Err(e) = init_tracing(TracingConfig::for_cli(debug)) {
        eprintln!("warning: logging disabled: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli, config: ClientConfig) -> ClientResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    debug!("using configuration from {}", config_path.display());

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path, &mut out),
            ConfigAction::Validate => commands::config::validate(&config, &mut out),
            ConfigAction::Path => commands::config::path(&config, &config_path, &mut out),
        },
        #[cfg(feature = "firebase")]
        Command::Login { email, password } => {
            let context = Context::open(&config)?;
            commands::auth::login(&context, &email, &password, &mut out).await
        }
        Command::Logout => commands::auth::logout(&Context::open(&config)?, &mut out),
        Command::Token => commands::token::token(&Context::open(&config)?, &mut out).await,
        Command::Status => commands::token::status(&Context::open(&config)?, &mut out),
        Command::Classify { json } => {
            let context = Context::open(&config)?;
            commands::token::classify(&context, &json, &mut out).await
        }
    }
}

//! Token commands: print, inspect and classify.

use std::io::Write;

use sensa_core::EpochMillis;
use serde_json::Value;

use crate::context::Context;
use crate::error::{ClientError, ClientResult};

/// Prints a valid access token.
pub async fn token(context: &Context, out: &mut impl Write) -> ClientResult<()> {
    let token = context
        .manager
        .get_valid_token()
        .await
        .ok_or_else(|| ClientError::NotSignedIn("run `sensa login` first".to_string()))?;
    writeln!(out, "{}", token)?;
    Ok(())
}

/// Prints the principal and the stored token state.
pub fn status(context: &Context, out: &mut impl Write) -> ClientResult<()> {
    match context.manager.current_user() {
        Some(user) => writeln!(out, "user:    {} ({})", user.label(), user.uid)?,
        None => writeln!(out, "user:    signed out")?,
    }

    let state = context.manager.token_state();
    let token = match (state.has_token, state.expired) {
        (false, _) => "none",
        (true, true) => "expired",
        (true, false) => "valid",
    };
    writeln!(out, "token:   {}", token)?;

    if let Some(expires_at) = state.expires_at {
        let remaining = expires_at
            .remaining(EpochMillis::now())
            .map(|left| format!(" ({}m left)", left.as_secs() / 60))
            .unwrap_or_default();
        writeln!(out, "expires: {}{}", expires_at, remaining)?;
    }
    Ok(())
}

/// Feeds a JSON error body to the token manager and prints the verdict.
///
/// An authorization failure triggers a real refresh, exactly as an API
/// caller would.
pub async fn classify(context: &Context, json: &str, out: &mut impl Write) -> ClientResult<()> {
    let body: Value = serde_json::from_str(json)
        .map_err(|e| ClientError::Input(format!("error body is not JSON: {}", e)))?;

    let retry = context.manager.handle_api_error(&body).await;
    writeln!(out, "{}", if retry { "retry" } else { "no-retry" })?;
    Ok(())
}

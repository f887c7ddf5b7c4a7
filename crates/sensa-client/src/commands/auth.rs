//! Sign-in and sign-out commands.

use std::io::Write;

use crate::context::Context;
#[cfg(feature = "firebase")]
use crate::error::ClientError;
use crate::error::ClientResult;

/// Signs in with email and password, then stores a fresh access token.
///
/// Sign-in already returns an ID token, but the stored token is taken from
/// a forced [`TokenManager::refresh_token`] so that its expiry and
/// persistence follow the manager's refresh path. This costs a second
/// request to the token endpoint.
///
/// [`TokenManager::refresh_token`]: sensa_auth::TokenManager::refresh_token
#[cfg(feature = "firebase")]
pub async fn login(
    context: &Context,
    email: &str,
    password: &str,
    out: &mut impl Write,
) -> ClientResult<()> {
    let firebase = context.firebase.as_ref().ok_or_else(|| {
        ClientError::Config("login needs a [firebase] section with an api_key".to_string())
    })?;

    let principal = firebase.sign_in_with_password(email, password).await?;
    tracing::info!("signed in as {}", principal.uid);

    context.manager.refresh_token().await?;
    let state = context.manager.token_state();

    writeln!(out, "Signed in as {}.", principal.label())?;
    if let Some(expires_at) = state.expires_at {
        writeln!(out, "Access token valid until {}.", expires_at)?;
    }
    Ok(())
}

/// Signs out and clears the stored access token.
pub fn logout(context: &Context, out: &mut impl Write) -> ClientResult<()> {
    let user = context.manager.current_user();
    #[cfg(feature = "firebase")]
    if let Some(ref firebase) = context.firebase {
        firebase.sign_out()?;
    }
    context.manager.clear_tokens();

    match user {
        Some(user) => writeln!(out, "Signed out {}.", user.label())?,
        None => writeln!(out, "Not signed in; cleared stored token.")?,
    }
    Ok(())
}

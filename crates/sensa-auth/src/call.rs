//! Authorized request helper for API callers.
//!
//! Wraps the pattern every Calendar/Gmail wrapper follows: fetch a token,
//! send the request, and on an authorization failure refresh and send it once
//! more.

use std::future::Future;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::manager::TokenManager;

/// Why an authorized call did not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// No token could be obtained; the user has to sign in.
    #[error("not signed in")]
    NotSignedIn,
    /// The request failed for a reason the token manager does not handle.
    #[error("request failed: {0}")]
    Api(Value),
}

/// Runs `request` with a valid token, retrying once after a token refresh.
///
/// `request` receives the bearer token and returns the downstream error body
/// on failure. The second attempt's failure is returned as-is.
pub async fn call_with_token<T, F, Fut>(
    manager: &TokenManager,
    mut request: F,
) -> Result<T, CallError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, Value>>,
{
    let token = manager
        .get_valid_token()
        .await
        .ok_or(CallError::NotSignedIn)?;

    let body = match request(token).await {
        Ok(value) => return Ok(value),
        Err(body) => body,
    };

    if !manager.handle_api_error(&body).await {
        return Err(CallError::Api(body));
    }

    debug!("retrying request with refreshed token");
    let token = manager
        .get_valid_token()
        .await
        .ok_or(CallError::NotSignedIn)?;
    request(token).await.map_err(CallError::Api)
}

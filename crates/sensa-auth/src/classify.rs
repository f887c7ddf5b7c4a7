//! Classification of downstream API failures.
//!
//! Calendar and Gmail wrappers hand back whatever error body the REST call
//! produced. Shapes vary by caller, so detection is a heuristic over a
//! handful of well-known fields.

use serde_json::Value;

const AUTH_MESSAGES: [&str; 2] = ["Invalid Credentials", "Unauthorized"];

const UNAUTHORIZED_STATUS: f64 = 401.0;

/// Returns true when `error` looks like a rejected credential.
///
/// Messages are read from `message`, `error` (when a string),
/// `error.message` and `result.error.message`; a match on either
/// `"Invalid Credentials"` or `"Unauthorized"` qualifies. Numeric status is
/// read from `status`, `error.code` and `result.error.code`; 401 qualifies.
pub fn is_authorization_failure(error: &Value) -> bool {
    let messages = [
        error.get("message"),
        error.get("error").filter(|v| v.is_string()),
        error.pointer("/error/message"),
        error.pointer("/result/error/message"),
    ];
    let message_match = messages
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .any(|msg| AUTH_MESSAGES.iter().any(|needle| msg.contains(needle)));

    if message_match {
        return true;
    }

    let statuses = [
        error.get("status"),
        error.pointer("/error/code"),
        error.pointer("/result/error/code"),
    ];
    statuses
        .into_iter()
        .flatten()
        .filter_map(Value::as_f64)
        .any(|status| status == UNAUTHORIZED_STATUS)
}

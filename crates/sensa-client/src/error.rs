//! Client error types.

use sensa_auth::AuthError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error reported by the token manager or identity provider.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The command needs a signed-in user.
    #[error("not signed in: {0}")]
    NotSignedIn(String),

    /// Bad command-line input.
    #[error("invalid input: {0}")]
    Input(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Process exit code for this error.
    ///
    /// `2` is reserved for usage errors reported by the argument parser.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NotSignedIn(_) => 1,
            Self::Auth(e) if e.requires_login() => 1,
            Self::Input(_) => 2,
            _ => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_out_errors_exit_with_one() {
        assert_eq!(ClientError::NotSignedIn("run `sensa login`".into()).exit_code(), 1);
        assert_eq!(ClientError::Auth(AuthError::no_session()).exit_code(), 1);
    }

    #[test]
    fn other_errors_exit_with_three() {
        assert_eq!(ClientError::Config("bad".into()).exit_code(), 3);
        assert_eq!(ClientError::Auth(AuthError::network("down")).exit_code(), 3);
        assert_eq!(ClientError::Input("bad json".into()).exit_code(), 2);
    }

    #[test]
    fn auth_errors_display_transparently() {
        let err = ClientError::from(AuthError::timeout("token refresh timed out"));
        assert_eq!(err.to_string(), AuthError::timeout("token refresh timed out").to_string());
    }
}

//! Client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The session token is missing, expired or rejected.
    #[error("not authenticated")]
    Unauthenticated,

    /// The practice's free trial has ended. The session is still valid;
    /// only the lockout screen should be shown.
    #[error("trial period has expired")]
    TrialExpired,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("session storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

//! Authentication error types.

use gpm_core::error::GpmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is inactive")]
    AccountInactive,

    #[error("trial period has expired")]
    TrialExpired,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("password must be at least {0} characters")]
    WeakPassword(usize),

    #[error("reset token is invalid or has expired")]
    ResetTokenInvalid,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for GpmError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => GpmError::AuthenticationFailed {
                reason: err.to_string(),
            },
            AuthError::TrialExpired => GpmError::TrialExpired,
            AuthError::WeakPassword(_) | AuthError::ResetTokenInvalid => GpmError::Validation {
                message: err.to_string(),
            },
            AuthError::Crypto(msg) => GpmError::Crypto(msg),
        }
    }
}

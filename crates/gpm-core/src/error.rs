//! Error types for the GP practice manager.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpmError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// The practice's free trial has elapsed. Kept apart from
    /// `AuthenticationFailed` so callers can show a lockout instead of a
    /// login prompt.
    #[error("Trial period has expired")]
    TrialExpired,

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type GpmResult<T> = Result<T, GpmError>;

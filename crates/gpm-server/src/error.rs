//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gpm_core::error::GpmError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors returned by handlers and middleware.
///
/// Every variant renders as `{"error": <message>, "code": <CODE>}`.
/// Internal details are logged and never sent to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, expired or invalid bearer token.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Login failed. Unknown email, wrong password and disabled accounts
    /// all look the same.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("trial expired")]
    TrialExpired,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::TrialExpired => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::TrialExpired => "TRIAL_EXPIRED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthenticated => "Unauthenticated".into(),
            Self::InvalidCredentials => "Invalid credentials".into(),
            Self::TrialExpired => {
                "Your free trial has ended. Please contact us to continue using the service."
                    .into()
            }
            Self::BadRequest(msg) | Self::Conflict(msg) => msg.clone(),
            Self::NotFound => "Not found".into(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl From<GpmError> for ApiError {
    fn from(err: GpmError) -> Self {
        match err {
            GpmError::AuthenticationFailed { .. } => Self::InvalidCredentials,
            GpmError::TrialExpired => Self::TrialExpired,
            GpmError::Validation { message } => Self::BadRequest(message),
            GpmError::NotFound { .. } => Self::NotFound,
            GpmError::AlreadyExists { entity } => Self::Conflict(format!("{entity} already exists")),
            GpmError::Database(msg) | GpmError::Crypto(msg) | GpmError::Internal(msg) => {
                Self::Internal(msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(error = %detail, "request failed");
        }
        let body = json!({ "error": self.message(), "code": self.code() });
        (self.status_code(), Json(body)).into_response()
    }
}

//! Bearer authentication and the trial guard.
//!
//! `require_session` runs on every protected route and stores an
//! [`AuthContext`] in the request extensions. `trial_guard` runs after it
//! on guarded routes only; exempt routes (trial status, logout) skip it so
//! a locked-out practice can still see why and sign out.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use gpm_auth::{AuthError, SessionClaims, token};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the client's device fingerprint.
pub const FINGERPRINT_HEADER: &str = "x-device-fingerprint";

/// Authenticated caller, available to handlers via `Extension`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: SessionClaims,
    /// Device fingerprint; empty when the header was absent.
    pub fingerprint: String,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn fingerprint(headers: &HeaderMap) -> String {
    headers
        .get(FINGERPRINT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = bearer_token(req.headers()).ok_or(ApiError::Unauthenticated)?;
    let claims = token::authenticate(raw, state.auth.config()).map_err(|e| {
        match &e {
            AuthError::TokenExpired => debug!("rejected expired session token"),
            other => debug!(error = %other, "rejected session token"),
        }
        ApiError::Unauthenticated
    })?;

    let ctx = AuthContext {
        claims,
        fingerprint: fingerprint(req.headers()),
    };
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

pub async fn trial_guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx = req
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or(ApiError::Unauthenticated)?;

    let status = state
        .auth
        .check_access(&ctx.claims, false, Utc::now())
        .await
        .map_err(|e| {
            debug!(user_id = %ctx.claims.sub, error = %e, "trial guard rejected request");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(status);
    Ok(next.run(req).await)
}

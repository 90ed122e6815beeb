//! HTTP routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use gpm_auth::{LoginInput, TrialStatus, UserProfile};
use gpm_core::error::GpmError;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::middleware::{AuthContext, fingerprint, require_session, trial_guard};
use crate::state::AppState;

const MAX_BODY_SIZE: usize = 64 * 1024;

/// Reply to every forgot-password request, whether or not the account
/// exists.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset link has been sent.";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password));

    // Layers run bottom-up: the session check wraps the trial guard.
    let guarded = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(from_fn_with_state(state.clone(), trial_guard))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    let exempt = Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/practice/trial-status", get(trial_status))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public)
        .merge(guarded)
        .merge(exempt)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(b)| b)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request: {}", e.body_text())))
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let req = body(payload)?;
    let ip_address = header_str(&headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|s| s.trim().to_string()));

    let out = state
        .auth
        .login(LoginInput {
            email: req.email,
            password: req.password,
            fingerprint: fingerprint(&headers),
            ip_address,
            user_agent: header_str(&headers, header::USER_AGENT.as_str()),
        })
        .await?;

    Ok(Json(LoginResponse {
        access_token: out.access_token,
        expires_in: out.expires_in,
        user: out.user,
    }))
}

/// POST /api/auth/forgot-password
async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = body(payload)?;
    state.auth.request_password_reset(&req.email).await;
    Ok(MessageResponse::new(FORGOT_PASSWORD_MESSAGE))
}

/// POST /api/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let req = body(payload)?;
    state.auth.reset_password(&req.token, &req.password).await?;
    Ok(MessageResponse::new("Password has been reset"))
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.auth.profile(&ctx.claims).await.map_err(|e| match e {
        // The token outlived the account it names.
        GpmError::AuthenticationFailed { .. } => ApiError::Unauthenticated,
        other => other.into(),
    })?;
    Ok(Json(profile))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
async fn logout(Extension(ctx): Extension<AuthContext>) -> Json<MessageResponse> {
    info!(
        user_id = %ctx.claims.sub,
        practice_id = %ctx.claims.tenant_id,
        has_fingerprint = !ctx.fingerprint.is_empty(),
        "user logged out"
    );
    MessageResponse::new("Logged out")
}

/// GET /api/practice/trial-status
async fn trial_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<TrialStatus>, ApiError> {
    let status = state
        .auth
        .trial_status(ctx.claims.tenant_id, Utc::now())
        .await?;
    Ok(Json(status))
}

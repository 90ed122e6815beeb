//! Session token issuance/authentication and opaque token helpers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use gpm_core::models::user::UserRole;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Identity carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID).
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    /// Practice (tenant) the user belongs to.
    pub tenant_id: Uuid,
}

/// Full JWT payload: the session identity plus registered claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(flatten)]
    pub session: SessionClaims,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID.
    pub jti: String,
}

/// Issue a signed HS256 access token for `claims`.
pub fn issue(claims: &SessionClaims, config: &AuthConfig) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let exp = i64::try_from(config.access_token_lifetime_secs)
        .ok()
        .and_then(|secs| now.checked_add(secs))
        .ok_or_else(|| AuthError::Crypto("access token lifetime out of range".into()))?;
    let payload = AccessTokenClaims {
        session: claims.clone(),
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp,
        jti: Uuid::new_v4().to_string(),
    };
    encode(&payload, config)
}

pub(crate) fn encode(payload: &AccessTokenClaims, config: &AuthConfig) -> Result<String, AuthError> {
    if config.jwt_secret.is_empty() {
        return Err(AuthError::Crypto("JWT secret is not configured".into()));
    }
    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), payload, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

/// Decode and verify an access token, returning the full payload.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Verify a token's signature, issuer and expiry and return the session
/// identity it carries.
///
/// Purely stateless: there is no revocation list, so a token stays valid
/// until it expires.
pub fn authenticate(token: &str, config: &AuthConfig) -> Result<SessionClaims, AuthError> {
    decode_access_token(token, config).map(|claims| claims.session)
}

/// Generate a cryptographically random opaque token
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_opaque_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of an opaque token, hex-encoded. This is the form that
/// gets persisted.
pub fn hash_opaque_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

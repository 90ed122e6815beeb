//! Authentication configuration.

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify session tokens (HS256).
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 28_800 = one working day).
    pub access_token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing and
    /// verification.
    pub pepper: Option<String>,
    /// Minimum password length accepted by password reset.
    pub min_password_length: usize,
    /// Accept base64-encoded seed credentials. Disabling this makes every
    /// legacy account fail verification.
    pub allow_legacy_credentials: bool,
    /// Rewrite a legacy credential as an Argon2id hash after it verifies.
    pub rehash_legacy_on_login: bool,
    /// Password reset token lifetime in seconds (default: 3600 = 1 hour).
    pub password_reset_lifetime_secs: u64,
    /// Base URL of the web app, used to build reset links.
    pub app_base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "gpm".into(),
            access_token_lifetime_secs: 28_800,
            pepper: None,
            min_password_length: 8,
            allow_legacy_credentials: true,
            rehash_legacy_on_login: false,
            password_reset_lifetime_secs: 3600,
            app_base_url: "http://localhost:3000".into(),
        }
    }
}

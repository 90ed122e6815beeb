//! TOML configuration for the server binary.
//!
//! Every section is optional; missing keys fall back to the same defaults
//! the library crates use. The JWT secret may come from the file or from
//! the `JWT_SECRET` environment variable, which wins when both are set.

use std::fs;
use std::path::Path;

use gpm_auth::AuthConfig;
use gpm_db::DbConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

const MIN_SECRET_LEN: usize = 32;

/// Upper bound for any configured lifetime (one year).
const MAX_LIFETIME_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ServerSection {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let d = DbConfig::default();
        Self {
            url: d.url,
            namespace: d.namespace,
            database: d.database,
            username: d.username,
            password: d.password,
        }
    }
}

impl From<&DatabaseSection> for DbConfig {
    fn from(s: &DatabaseSection) -> Self {
        DbConfig {
            url: s.url.clone(),
            namespace: s.namespace.clone(),
            database: s.database.clone(),
            username: s.username.clone(),
            password: s.password.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// HMAC key for session tokens. Prefer `JWT_SECRET`.
    pub jwt_secret: Option<String>,
    pub jwt_issuer: String,
    pub access_token_lifetime_secs: u64,
    pub pepper: Option<String>,
    pub min_password_length: usize,
    pub allow_legacy_credentials: bool,
    pub rehash_legacy_on_login: bool,
    pub password_reset_lifetime_secs: u64,
    pub app_base_url: String,
}

impl Default for AuthSection {
    fn default() -> Self {
        let d = AuthConfig::default();
        Self {
            jwt_secret: None,
            jwt_issuer: d.jwt_issuer,
            access_token_lifetime_secs: d.access_token_lifetime_secs,
            pepper: d.pepper,
            min_password_length: d.min_password_length,
            allow_legacy_credentials: d.allow_legacy_credentials,
            rehash_legacy_on_login: d.rehash_legacy_on_login,
            password_reset_lifetime_secs: d.password_reset_lifetime_secs,
            app_base_url: d.app_base_url,
        }
    }
}

impl AuthSection {
    /// `JWT_SECRET` takes priority over the file. Empty values count as
    /// unset.
    pub fn resolved_jwt_secret(&self) -> Option<String> {
        pick_secret(std::env::var("JWT_SECRET").ok(), self.jwt_secret.clone())
    }

    fn to_auth_config(&self, jwt_secret: String) -> AuthConfig {
        AuthConfig {
            jwt_secret,
            jwt_issuer: self.jwt_issuer.clone(),
            access_token_lifetime_secs: self.access_token_lifetime_secs,
            pepper: self.pepper.clone().filter(|p| !p.is_empty()),
            min_password_length: self.min_password_length,
            allow_legacy_credentials: self.allow_legacy_credentials,
            rehash_legacy_on_login: self.rehash_legacy_on_login,
            password_reset_lifetime_secs: self.password_reset_lifetime_secs,
            app_base_url: self.app_base_url.clone(),
        }
    }
}

fn pick_secret(env: Option<String>, file: Option<String>) -> Option<String> {
    env.filter(|s| !s.is_empty())
        .or(file)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub auth: AuthSection,
}

impl AppConfig {
    /// Build the auth service configuration, resolving the secret.
    pub fn auth_config(&self) -> Result<AuthConfig, ConfigError> {
        let secret = self.auth.resolved_jwt_secret().ok_or_else(missing_secret)?;
        Ok(self.auth.to_auth_config(secret))
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::from(&self.database)
    }
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    info!(path = %path.display(), "Loading configuration");
    let contents = fs::read_to_string(path)?;
    let config = parse_config(&contents)?;
    validate_config(&config)?;
    info!("Configuration validated");
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(contents)?;
    debug!(
        bind = %config.server.addr(),
        database = %config.database.url,
        "Configuration parsed"
    );
    Ok(config)
}

fn check_lifetime(name: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 || secs > MAX_LIFETIME_SECS {
        return Err(ConfigError::Invalid(format!(
            "{name} must be between 1 and {MAX_LIFETIME_SECS} seconds"
        )));
    }
    Ok(())
}

pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_with_secret(config, config.auth.resolved_jwt_secret().as_deref())
}

fn validate_with_secret(config: &AppConfig, secret: Option<&str>) -> Result<(), ConfigError> {
    check_lifetime(
        "access_token_lifetime_secs",
        config.auth.access_token_lifetime_secs,
    )?;
    check_lifetime(
        "password_reset_lifetime_secs",
        config.auth.password_reset_lifetime_secs,
    )?;

    match secret {
        None => return Err(missing_secret()),
        Some(s) if s.len() < MIN_SECRET_LEN => {
            return Err(ConfigError::Invalid(format!(
                "jwt_secret must be at least {MIN_SECRET_LEN} characters long"
            )));
        }
        _ => {}
    }

    Ok(())
}

fn missing_secret() -> ConfigError {
    ConfigError::Invalid(
        "jwt_secret must be set via the JWT_SECRET env var or auth.jwt_secret".into(),
    )
}

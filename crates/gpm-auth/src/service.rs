//! Authentication service: login, password reset and trial checks.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use gpm_core::error::{GpmError, GpmResult};
use gpm_core::models::password_reset::CreatePasswordReset;
use gpm_core::models::user::{User, UserRole, UserStatus};
use gpm_core::repository::{PasswordResetRepository, PracticeRepository, UserRepository};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::credential;
use crate::error::AuthError;
use crate::notify::ResetNotifier;
use crate::token::{self, SessionClaims};
use crate::trial::{self, TrialStatus};

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    /// Device fingerprint header value; empty when the client sent none.
    pub fingerprint: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserProfile,
}

/// The subset of a user returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub practice_id: Uuid,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            practice_id: user.practice_id,
        }
    }
}

/// Normalise an email for lookup: surrounding whitespace and case are not
/// significant.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer has no
/// dependency on the database crate.
pub struct AuthService<U, P, R>
where
    U: UserRepository,
    P: PracticeRepository,
    R: PasswordResetRepository,
{
    user_repo: U,
    practice_repo: P,
    reset_repo: R,
    notifier: Arc<dyn ResetNotifier>,
    config: AuthConfig,
}

impl<U, P, R> AuthService<U, P, R>
where
    U: UserRepository,
    P: PracticeRepository,
    R: PasswordResetRepository,
{
    pub fn new(
        user_repo: U,
        practice_repo: P,
        reset_repo: R,
        notifier: Arc<dyn ResetNotifier>,
        config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            practice_repo,
            reset_repo,
            notifier,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate a user with email + password and issue a session token.
    ///
    /// Every credential failure (unknown email, wrong password, rejected
    /// legacy credential) surfaces as the same `invalid credentials` error.
    pub async fn login(&self, input: LoginInput) -> GpmResult<LoginOutput> {
        let email = normalize_email(&input.email);

        // 1. Look up the account.
        let user = match self.user_repo.find_by_email(&email).await {
            Ok(u) => u,
            Err(GpmError::NotFound { .. }) => {
                credential::verify_dummy(&input.password);
                debug!("login rejected: unknown account");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 2. Verify the credential.
        let valid = credential::verify(
            &user.credential,
            &input.password,
            self.config.pepper.as_deref(),
            self.config.allow_legacy_credentials,
        )?;
        if !valid {
            debug!(user_id = %user.id, "login rejected: credential mismatch");
            return Err(AuthError::InvalidCredentials.into());
        }

        // 3. Account and practice must both be enabled.
        if user.status != UserStatus::Active {
            return Err(AuthError::AccountInactive.into());
        }
        let practice = self.practice_repo.get_by_id(user.practice_id).await?;
        if !practice.is_active {
            return Err(AuthError::AccountInactive.into());
        }

        // 4. Optional upgrade of seed credentials.
        if user.credential.is_legacy() && self.config.rehash_legacy_on_login {
            self.upgrade_legacy_credential(&user, &input.password).await;
        }

        // 5. Last-login bookkeeping must not block sign-in.
        if let Err(e) = self
            .user_repo
            .record_login(user.practice_id, user.id, Utc::now())
            .await
        {
            warn!(user_id = %user.id, error = %e, "failed to record last login");
        }

        // 6. Issue the session token.
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.practice_id,
        };
        let access_token = token::issue(&claims, &self.config)?;

        info!(
            user_id = %user.id,
            practice_id = %user.practice_id,
            has_fingerprint = !input.fingerprint.is_empty(),
            ip = input.ip_address.as_deref().unwrap_or("-"),
            "user logged in"
        );

        Ok(LoginOutput {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
            user: UserProfile::from(&user),
        })
    }

    async fn upgrade_legacy_credential(&self, user: &User, password: &str) {
        let upgraded = match credential::new_credential(password, self.config.pepper.as_deref()) {
            Ok(c) => c,
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "failed to hash legacy credential");
                return;
            }
        };
        match self
            .user_repo
            .set_credential(user.practice_id, user.id, upgraded)
            .await
        {
            Ok(()) => info!(user_id = %user.id, "legacy credential upgraded to argon2id"),
            Err(e) => warn!(user_id = %user.id, error = %e, "failed to store upgraded credential"),
        }
    }

    /// Start a password reset for `email`.
    ///
    /// Always succeeds from the caller's point of view, whether or not the
    /// account exists and whether or not delivery worked.
    pub async fn request_password_reset(&self, email: &str) {
        let email = normalize_email(email);
        match self.try_request_password_reset(&email).await {
            Ok(true) => debug!("password reset issued"),
            Ok(false) => debug!("password reset requested for unknown account"),
            Err(e) => warn!(error = %e, "password reset request failed"),
        }
    }

    async fn try_request_password_reset(&self, email: &str) -> GpmResult<bool> {
        let user = match self.user_repo.find_by_email(email).await {
            Ok(u) => u,
            Err(GpmError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };
        if user.status != UserStatus::Active {
            return Ok(false);
        }

        let raw = token::generate_opaque_token();
        let expires_at = i64::try_from(self.config.password_reset_lifetime_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| GpmError::Internal("password reset lifetime out of range".into()))?;
        self.reset_repo
            .create(CreatePasswordReset {
                practice_id: user.practice_id,
                user_id: user.id,
                token_hash: token::hash_opaque_token(&raw),
                expires_at,
            })
            .await?;

        let link = format!(
            "{}/reset-password?token={raw}",
            self.config.app_base_url.trim_end_matches('/')
        );
        self.notifier.send_reset_link(&user.email, &link)?;
        Ok(true)
    }

    /// Complete a password reset with the emailed token.
    ///
    /// Tokens are single-use; a second attempt with the same token fails.
    /// The token is spent as soon as it is accepted: if the account has
    /// been deactivated since, or the credential write fails, the user has
    /// to request a new link.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> GpmResult<()> {
        if new_password.chars().count() < self.config.min_password_length {
            return Err(AuthError::WeakPassword(self.config.min_password_length).into());
        }
        let credential = credential::new_credential(new_password, self.config.pepper.as_deref())?;

        let reset = self
            .reset_repo
            .consume(&token::hash_opaque_token(raw_token), Utc::now())
            .await
            .map_err(|e| match e {
                GpmError::NotFound { .. } => AuthError::ResetTokenInvalid.into(),
                other => other,
            })?;

        let user = self
            .user_repo
            .get_by_id(reset.practice_id, reset.user_id)
            .await
            .map_err(|e| match e {
                GpmError::NotFound { .. } => AuthError::ResetTokenInvalid.into(),
                other => other,
            })?;
        if user.status != UserStatus::Active {
            warn!(user_id = %user.id, "password reset refused for inactive account");
            return Err(AuthError::ResetTokenInvalid.into());
        }

        self.user_repo
            .set_credential(reset.practice_id, reset.user_id, credential)
            .await?;

        info!(user_id = %reset.user_id, "password reset completed");
        Ok(())
    }

    /// Current profile of the authenticated user.
    pub async fn profile(&self, claims: &SessionClaims) -> GpmResult<UserProfile> {
        let user = self
            .user_repo
            .get_by_id(claims.tenant_id, claims.sub)
            .await
            .map_err(|e| match e {
                GpmError::NotFound { .. } => {
                    AuthError::TokenInvalid("subject no longer exists".into()).into()
                }
                other => other,
            })?;
        if user.status != UserStatus::Active {
            return Err(AuthError::AccountInactive.into());
        }
        Ok(UserProfile::from(&user))
    }

    /// Trial status of a practice at `now`.
    pub async fn trial_status(&self, practice_id: Uuid, now: DateTime<Utc>) -> GpmResult<TrialStatus> {
        let practice = self.practice_repo.get_by_id(practice_id).await?;
        Ok(TrialStatus::evaluate(&practice, now))
    }

    /// Trial gate for a protected request. Returns the evaluated status so
    /// callers can attach it to the request.
    pub async fn check_access(
        &self,
        claims: &SessionClaims,
        exempt: bool,
        now: DateTime<Utc>,
    ) -> GpmResult<TrialStatus> {
        let status = self.trial_status(claims.tenant_id, now).await?;
        trial::enforce(&status, claims.role, exempt)?;
        Ok(status)
    }
}

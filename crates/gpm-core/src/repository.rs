//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Practice-scoped queries take a
//! `practice_id` to enforce tenant isolation; the login path is the one
//! exception, since it resolves the practice from the user's email.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::GpmResult;
use crate::models::{
    credential::Credential,
    password_reset::{CreatePasswordReset, PasswordReset},
    practice::{CreatePractice, Practice, UpdatePractice},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Practice (global scope)
// ---------------------------------------------------------------------------

pub trait PracticeRepository: Send + Sync {
    fn create(&self, input: CreatePractice) -> impl Future<Output = GpmResult<Practice>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = GpmResult<Practice>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = GpmResult<Practice>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePractice,
    ) -> impl Future<Output = GpmResult<Practice>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = GpmResult<PaginatedResult<Practice>>> + Send;
}

// ---------------------------------------------------------------------------
// Practice-scoped repositories
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = GpmResult<User>> + Send;
    fn get_by_id(
        &self,
        practice_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = GpmResult<User>> + Send;
    /// Look up a user by login email across all practices.
    ///
    /// Returns `GpmError::NotFound` when no account matches.
    fn find_by_email(&self, email: &str) -> impl Future<Output = GpmResult<User>> + Send;
    fn update(
        &self,
        practice_id: Uuid,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = GpmResult<User>> + Send;
    /// Replace the stored credential (password change, reset, or legacy
    /// upgrade).
    fn set_credential(
        &self,
        practice_id: Uuid,
        id: Uuid,
        credential: Credential,
    ) -> impl Future<Output = GpmResult<()>> + Send;
    fn record_login(
        &self,
        practice_id: Uuid,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = GpmResult<()>> + Send;
    fn list(
        &self,
        practice_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = GpmResult<PaginatedResult<User>>> + Send;
}

pub trait PasswordResetRepository: Send + Sync {
    fn create(
        &self,
        input: CreatePasswordReset,
    ) -> impl Future<Output = GpmResult<PasswordReset>> + Send;
    /// Atomically mark the reset matching `token_hash` as used, provided it
    /// is unused and unexpired at `now`.
    ///
    /// Returns `GpmError::NotFound` when no such reset exists.
    fn consume(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = GpmResult<PasswordReset>> + Send;
}

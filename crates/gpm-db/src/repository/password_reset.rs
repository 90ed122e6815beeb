//! SurrealDB implementation of [`PasswordResetRepository`].

use chrono::{DateTime, Utc};
use gpm_core::error::GpmResult;
use gpm_core::models::password_reset::{CreatePasswordReset, PasswordReset};
use gpm_core::repository::PasswordResetRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::write_error;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PasswordResetRow {
    practice_id: String,
    user_id: String,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct RecordIdRow {
    record_id: String,
}

fn row_to_reset(row: PasswordResetRow, id: Uuid) -> Result<PasswordReset, DbError> {
    let practice_id = Uuid::parse_str(&row.practice_id)
        .map_err(|e| DbError::Corrupt(format!("invalid practice UUID: {e}")))?;
    let user_id = Uuid::parse_str(&row.user_id)
        .map_err(|e| DbError::Corrupt(format!("invalid user UUID: {e}")))?;
    Ok(PasswordReset {
        id,
        practice_id,
        user_id,
        token_hash: row.token_hash,
        expires_at: row.expires_at,
        used_at: row.used_at,
        created_at: row.created_at,
    })
}

fn not_found() -> DbError {
    DbError::NotFound {
        entity: "password_reset".into(),
        id: "token".into(),
    }
}

/// SurrealDB implementation of the password reset repository.
#[derive(Clone)]
pub struct SurrealPasswordResetRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPasswordResetRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PasswordResetRepository for SurrealPasswordResetRepository<C> {
    async fn create(&self, input: CreatePasswordReset) -> GpmResult<PasswordReset> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('password_reset', $id) SET \
                 practice_id = $practice_id, \
                 user_id = $user_id, \
                 token_hash = $token_hash, \
                 expires_at = $expires_at, \
                 used_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("practice_id", input.practice_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| write_error("password_reset", e))?;

        let rows: Vec<PasswordResetRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "password_reset".into(),
            id: id_str,
        })?;

        Ok(row_to_reset(row, id)?)
    }

    async fn consume(&self, token_hash: &str, now: DateTime<Utc>) -> GpmResult<PasswordReset> {
        // 1. Resolve the record id from the token digest.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id FROM password_reset \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<RecordIdRow> = result.take(0).map_err(DbError::from)?;
        let record_id = ids.into_iter().next().ok_or_else(not_found)?.record_id;
        let id = Uuid::parse_str(&record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;

        // 2. Conditional update: only one caller can flip `used_at`.
        let result = self
            .db
            .query(
                "UPDATE type::record('password_reset', $id) SET used_at = $now \
                 WHERE used_at = NONE AND expires_at > $now",
            )
            .bind(("id", record_id))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| write_error("password_reset", e))?;

        let rows: Vec<PasswordResetRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(not_found)?;

        Ok(row_to_reset(row, id)?)
    }
}

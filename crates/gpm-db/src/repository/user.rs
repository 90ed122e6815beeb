//! SurrealDB implementation of [`UserRepository`].
//!
//! The `password_hash` column holds whatever credential form the account
//! has (Argon2 PHC string or legacy base64). It is classified into a
//! [`Credential`] variant here, at load time, and never re-inspected by
//! callers.

use chrono::{DateTime, Utc};
use gpm_core::error::GpmResult;
use gpm_core::models::credential::Credential;
use gpm_core::models::user::{CreateUser, UpdateUser, User, UserRole, UserStatus};
use gpm_core::repository::{PaginatedResult, Pagination, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::write_error;
use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    practice_id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    password_hash: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    practice_id: String,
    email: String,
    first_name: String,
    last_name: String,
    role: String,
    password_hash: String,
    status: String,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<UserStatus, DbError> {
    match s {
        "Active" => Ok(UserStatus::Active),
        "Inactive" => Ok(UserStatus::Inactive),
        other => Err(DbError::Corrupt(format!("unknown user status: {other}"))),
    }
}

fn status_to_string(s: &UserStatus) -> &'static str {
    match s {
        UserStatus::Active => "Active",
        UserStatus::Inactive => "Inactive",
    }
}

fn parse_role(s: &str) -> Result<UserRole, DbError> {
    UserRole::parse(s).ok_or_else(|| DbError::Corrupt(format!("unknown user role: {s}")))
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        let practice_id = Uuid::parse_str(&self.practice_id)
            .map_err(|e| DbError::Corrupt(format!("invalid practice UUID: {e}")))?;
        Ok(User {
            id,
            practice_id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role: parse_role(&self.role)?,
            credential: Credential::from(self.password_hash),
            status: parse_status(&self.status)?,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        UserRow {
            practice_id: self.practice_id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            password_hash: self.password_hash,
            status: self.status,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_user(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> GpmResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 practice_id = $practice_id, \
                 email = $email, \
                 first_name = $first_name, last_name = $last_name, \
                 role = $role, \
                 password_hash = $password_hash, \
                 status = 'Active', \
                 last_login_at = NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("practice_id", input.practice_id.to_string()))
            .bind(("email", normalize_email(&input.email)))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("password_hash", String::from(input.credential)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| write_error("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn get_by_id(&self, practice_id: Uuid, id: Uuid) -> GpmResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('user', $id) \
                 WHERE practice_id = $practice_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("practice_id", practice_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn find_by_email(&self, email: &str) -> GpmResult<User> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE email = $email",
            )
            .bind(("email", normalize_email(email)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: "email".into(),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn update(&self, practice_id: Uuid, id: Uuid, input: UpdateUser) -> GpmResult<User> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.status.is_some() {
            sets.push("status = $status");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('user', $id) SET {} \
             WHERE practice_id = $practice_id",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("practice_id", practice_id.to_string()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(ref status) = input.status {
            builder = builder.bind(("status", status_to_string(status).to_string()));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result.check().map_err(|e| write_error("user", e))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn set_credential(
        &self,
        practice_id: Uuid,
        id: Uuid,
        credential: Credential,
    ) -> GpmResult<()> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 password_hash = $password_hash, updated_at = time::now() \
                 WHERE practice_id = $practice_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("practice_id", practice_id.to_string()))
            .bind(("password_hash", String::from(credential)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| write_error("user", e))?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "user".into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }

    async fn record_login(&self, practice_id: Uuid, id: Uuid, at: DateTime<Utc>) -> GpmResult<()> {
        self.db
            .query(
                "UPDATE type::record('user', $id) SET last_login_at = $at \
                 WHERE practice_id = $practice_id",
            )
            .bind(("id", id.to_string()))
            .bind(("practice_id", practice_id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| write_error("user", e))?;

        Ok(())
    }

    async fn list(
        &self,
        practice_id: Uuid,
        pagination: Pagination,
    ) -> GpmResult<PaginatedResult<User>> {
        let practice_id_str = practice_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE practice_id = $practice_id GROUP ALL",
            )
            .bind(("practice_id", practice_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE practice_id = $practice_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("practice_id", practice_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_user())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

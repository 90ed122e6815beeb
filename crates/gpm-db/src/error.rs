//! Database-specific error types and conversions.

use gpm_core::error::GpmError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate record: {0}")]
    Duplicate(String),
}

impl From<DbError> for GpmError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => GpmError::NotFound { entity, id },
            DbError::Duplicate(entity) => GpmError::AlreadyExists { entity },
            other => GpmError::Database(other.to_string()),
        }
    }
}

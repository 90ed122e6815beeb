//! SurrealDB repository implementations.

mod password_reset;
mod practice;
mod user;

pub use password_reset::SurrealPasswordResetRepository;
pub use practice::SurrealPracticeRepository;
pub use user::SurrealUserRepository;

use crate::error::DbError;

/// Classify a failed write statement. Unique index violations become
/// [`DbError::Duplicate`] so callers can report a conflict.
fn write_error(entity: &str, err: surrealdb::Error) -> DbError {
    if err.to_string().contains("already contains") {
        DbError::Duplicate(entity.to_string())
    } else {
        DbError::Surreal(err)
    }
}

//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct AppliedVersion {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1: practices, staff accounts and password resets
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Practices (tenants, global scope)
-- =======================================================================
DEFINE TABLE practice SCHEMAFULL;
DEFINE FIELD name ON TABLE practice TYPE string;
DEFINE FIELD slug ON TABLE practice TYPE string;
DEFINE FIELD is_trial ON TABLE practice TYPE bool DEFAULT false;
DEFINE FIELD trial_ends_at ON TABLE practice TYPE option<datetime>;
DEFINE FIELD subscription_tier ON TABLE practice TYPE string \
    ASSERT $value IN ['trial', 'starter', 'professional', 'enterprise'];
DEFINE FIELD is_active ON TABLE practice TYPE bool DEFAULT true;
DEFINE FIELD metadata ON TABLE practice TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE practice TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE practice TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_practice_slug ON TABLE practice \
    COLUMNS slug UNIQUE;

-- =======================================================================
-- Users (practice scope; email is the global login key)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD practice_id ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD first_name ON TABLE user TYPE string;
DEFINE FIELD last_name ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['admin', 'practice_manager', 'doctor', 'nurse', \
    'receptionist'];
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD status ON TABLE user TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD last_login_at ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user \
    COLUMNS email UNIQUE;
DEFINE INDEX idx_user_practice ON TABLE user \
    COLUMNS practice_id;

-- =======================================================================
-- Password resets (practice scope)
-- =======================================================================
DEFINE TABLE password_reset SCHEMAFULL;
DEFINE FIELD practice_id ON TABLE password_reset TYPE string;
DEFINE FIELD user_id ON TABLE password_reset TYPE string;
DEFINE FIELD token_hash ON TABLE password_reset TYPE string;
DEFINE FIELD expires_at ON TABLE password_reset TYPE datetime;
DEFINE FIELD used_at ON TABLE password_reset TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE password_reset TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_password_reset_token ON TABLE password_reset \
    COLUMNS token_hash UNIQUE;
";

/// Bring the database up to the latest schema version.
///
/// Returns how many migrations were applied. Each migration's DDL and its
/// `_migration` record are sent as one request.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<usize, DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(format!("tracking table: {e}")))?;

    let applied = latest_applied(db).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        info!(version = applied, "schema up to date");
        return Ok(0);
    }

    for migration in &pending {
        info!(version = migration.version, name = migration.name, "applying migration");
        db.query(migration.sql)
            .query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!("v{} {}: {e}", migration.version, migration.name))
            })?;
    }

    Ok(pending.len())
}

async fn latest_applied<C: Connection>(db: &Surreal<C>) -> Result<u32, DbError> {
    let rows: Vec<AppliedVersion> = db.query("SELECT version FROM _migration").await?.take(0)?;
    Ok(rows.iter().map(|r| r.version).max().unwrap_or(0))
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_defines_auth_tables() {
        for table in ["practice", "user", "password_reset"] {
            assert!(
                SCHEMA_V1.contains(&format!("DEFINE TABLE {table} SCHEMAFULL")),
                "missing table {table}"
            );
        }
    }

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }
}

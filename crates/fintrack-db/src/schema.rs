//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings and
//! timestamps as Unix seconds. Tables holding one-shot secrets are keyed
//! by their owner so that "one live secret per account" is enforced by
//! the record id itself.

use serde::Deserialize;
use surrealdb::{Connection, Surreal};
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

#[derive(Debug, Deserialize)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "seed_roles",
        sql: SEED_ROLES,
    },
];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Principals (registered accounts)
-- =======================================================================
DEFINE TABLE principal SCHEMAFULL;
DEFINE FIELD name ON TABLE principal TYPE string;
DEFINE FIELD email ON TABLE principal TYPE string;
DEFINE FIELD password_hash ON TABLE principal TYPE string;
DEFINE FIELD email_verified ON TABLE principal TYPE bool DEFAULT false;
DEFINE FIELD verification_token_hash ON TABLE principal \
    TYPE option<string>;
DEFINE FIELD verification_expires_at ON TABLE principal TYPE option<int>;
DEFINE FIELD roles ON TABLE principal TYPE array<string>;
DEFINE FIELD currency ON TABLE principal TYPE string DEFAULT 'USD';
DEFINE FIELD created_at ON TABLE principal TYPE int;
DEFINE FIELD updated_at ON TABLE principal TYPE int;
DEFINE INDEX idx_principal_email ON TABLE principal COLUMNS email UNIQUE;
DEFINE INDEX idx_principal_verification ON TABLE principal \
    COLUMNS verification_token_hash;

-- =======================================================================
-- Roles
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

-- =======================================================================
-- Step-up challenges (record id = owner id)
-- =======================================================================
DEFINE TABLE challenge SCHEMAFULL;
DEFINE FIELD challenge_id ON TABLE challenge TYPE string;
DEFINE FIELD owner_id ON TABLE challenge TYPE string;
DEFINE FIELD code_hash ON TABLE challenge TYPE string;
DEFINE FIELD purpose ON TABLE challenge TYPE string \
    ASSERT $value IN ['Login', 'PasswordReset'];
DEFINE FIELD expires_at ON TABLE challenge TYPE int;
DEFINE FIELD created_at ON TABLE challenge TYPE int;

-- =======================================================================
-- Password-reset link tokens (record id = owner id)
-- =======================================================================
DEFINE TABLE recovery_token SCHEMAFULL;
DEFINE FIELD owner_id ON TABLE recovery_token TYPE string;
DEFINE FIELD token_hash ON TABLE recovery_token TYPE string;
DEFINE FIELD expires_at ON TABLE recovery_token TYPE int;
DEFINE FIELD created_at ON TABLE recovery_token TYPE int;
DEFINE INDEX idx_recovery_token_hash ON TABLE recovery_token \
    COLUMNS token_hash UNIQUE;

-- =======================================================================
-- Revoked bearer tokens (record id = SHA-256 of the token)
-- =======================================================================
DEFINE TABLE revoked_token SCHEMAFULL;
DEFINE FIELD revoked_at ON TABLE revoked_token TYPE int;
";

const SEED_ROLES: &str = "\
CREATE role:user SET name = 'ROLE_USER', description = 'Regular account';
CREATE role:admin SET name = 'ROLE_ADMIN', description = 'Administrator';
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_ordered() {
        for window in MIGRATIONS.windows(2) {
            assert!(
                window[0].version < window[1].version,
                "Migrations must be in ascending version order"
            );
        }
    }

    #[test]
    fn seeded_user_role_matches_signup_role() {
        assert!(SEED_ROLES.contains(&format!("'{}'", fintrack_core::models::role::ROLE_USER)));
    }
}

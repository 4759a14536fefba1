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
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
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
// Schema v1: initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Tenants (control plane)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD slug ON TABLE tenant TYPE string;
DEFINE FIELD database_name ON TABLE tenant TYPE string;
DEFINE FIELD description ON TABLE tenant TYPE option<string>;
DEFINE FIELD email ON TABLE tenant TYPE option<string>;
DEFINE FIELD phone ON TABLE tenant TYPE option<string>;
DEFINE FIELD address ON TABLE tenant TYPE option<string>;
DEFINE FIELD website ON TABLE tenant TYPE option<string>;
DEFINE FIELD owner_id ON TABLE tenant TYPE string;
DEFINE FIELD status ON TABLE tenant TYPE string \
    ASSERT $value IN ['Active', 'Inactive', 'Suspended', 'Deleted'];
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_tenant_slug ON TABLE tenant COLUMNS slug UNIQUE;
DEFINE INDEX idx_tenant_database_name ON TABLE tenant \
    COLUMNS database_name UNIQUE;

-- =======================================================================
-- Tenant memberships (control plane)
-- =======================================================================
DEFINE TABLE tenant_membership SCHEMAFULL;
DEFINE FIELD user_id ON TABLE tenant_membership TYPE string;
DEFINE FIELD tenant_id ON TABLE tenant_membership TYPE string;
DEFINE FIELD role ON TABLE tenant_membership TYPE string \
    ASSERT $value IN ['Admin', 'Instructor', 'Student'];
DEFINE FIELD status ON TABLE tenant_membership TYPE string \
    ASSERT $value IN ['Pending', 'Active', 'Inactive', 'Rejected'];
DEFINE FIELD invited_by ON TABLE tenant_membership TYPE option<string>;
DEFINE FIELD invited_at ON TABLE tenant_membership TYPE option<datetime>;
DEFINE FIELD joined_at ON TABLE tenant_membership TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE tenant_membership TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant_membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_user_tenant ON TABLE tenant_membership \
    COLUMNS user_id, tenant_id UNIQUE;
DEFINE INDEX idx_membership_tenant ON TABLE tenant_membership \
    COLUMNS tenant_id;

-- =======================================================================
-- Users (control plane)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD current_tenant_id ON TABLE user TYPE option<string>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;

-- =======================================================================
-- Courses (tenant scope, owned by the course catalogue)
-- =======================================================================
DEFINE TABLE course SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE course TYPE string;
DEFINE FIELD title ON TABLE course TYPE string;
DEFINE FIELD average_rating ON TABLE course TYPE float DEFAULT 0.0;
DEFINE FIELD total_reviews ON TABLE course TYPE int DEFAULT 0;
DEFINE FIELD created_at ON TABLE course TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE course TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_course_tenant ON TABLE course COLUMNS tenant_id;

-- =======================================================================
-- Reviews (tenant scope, soft-deleted)
--
-- deletion_marker is '' while the review is live and the review id once
-- deleted, so the unique index allows one live review per user and
-- course while keeping any number of deleted ones.
-- =======================================================================
DEFINE TABLE review SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE review TYPE string;
DEFINE FIELD course_id ON TABLE review TYPE string;
DEFINE FIELD user_id ON TABLE review TYPE string;
DEFINE FIELD rating ON TABLE review TYPE int \
    ASSERT $value >= 1 AND $value <= 5;
DEFINE FIELD title ON TABLE review TYPE option<string>;
DEFINE FIELD comment ON TABLE review TYPE option<string>;
DEFINE FIELD is_public ON TABLE review TYPE bool DEFAULT true;
DEFINE FIELD is_edited ON TABLE review TYPE bool DEFAULT false;
DEFINE FIELD is_deleted ON TABLE review TYPE bool DEFAULT false;
DEFINE FIELD deletion_marker ON TABLE review TYPE string DEFAULT '';
DEFINE FIELD deleted_at ON TABLE review TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE review TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE review TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_review_live_author ON TABLE review \
    COLUMNS tenant_id, user_id, course_id, deletion_marker UNIQUE;
DEFINE INDEX idx_review_course ON TABLE review \
    COLUMNS tenant_id, course_id;

-- =======================================================================
-- Course rating aggregate (tenant scope, one row per course)
-- =======================================================================
DEFINE TABLE course_rating SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE course_rating TYPE string;
DEFINE FIELD course_id ON TABLE course_rating TYPE string;
DEFINE FIELD average_rating ON TABLE course_rating TYPE float;
DEFINE FIELD total_reviews ON TABLE course_rating TYPE int;
DEFINE FIELD rating_1 ON TABLE course_rating TYPE int;
DEFINE FIELD rating_2 ON TABLE course_rating TYPE int;
DEFINE FIELD rating_3 ON TABLE course_rating TYPE int;
DEFINE FIELD rating_4 ON TABLE course_rating TYPE int;
DEFINE FIELD rating_5 ON TABLE course_rating TYPE int;
DEFINE FIELD updated_at ON TABLE course_rating TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_course_rating_course ON TABLE course_rating \
    COLUMNS tenant_id, course_id UNIQUE;

-- =======================================================================
-- Helpful votes (tenant scope)
-- =======================================================================
DEFINE TABLE review_helpful SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE review_helpful TYPE string;
DEFINE FIELD review_id ON TABLE review_helpful TYPE string;
DEFINE FIELD user_id ON TABLE review_helpful TYPE string;
DEFINE FIELD is_helpful ON TABLE review_helpful TYPE bool;
DEFINE FIELD created_at ON TABLE review_helpful TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE review_helpful TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_review_helpful_voter ON TABLE review_helpful \
    COLUMNS review_id, user_id UNIQUE;

-- =======================================================================
-- Review reports (tenant scope)
-- =======================================================================
DEFINE TABLE review_report SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE review_report TYPE string;
DEFINE FIELD review_id ON TABLE review_report TYPE string;
DEFINE FIELD reporter_id ON TABLE review_report TYPE string;
DEFINE FIELD reason ON TABLE review_report TYPE string;
DEFINE FIELD status ON TABLE review_report TYPE string \
    ASSERT $value IN ['Pending', 'Approved', 'Rejected'];
DEFINE FIELD reviewed_by ON TABLE review_report TYPE option<string>;
DEFINE FIELD created_at ON TABLE review_report TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE review_report TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_review_report_reporter ON TABLE review_report \
    COLUMNS review_id, reporter_id UNIQUE;
DEFINE INDEX idx_review_report_status ON TABLE review_report \
    COLUMNS tenant_id, status;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
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

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
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

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_v1_is_nonempty() {
        assert!(!SCHEMA_V1.is_empty());
    }

    #[test]
    fn schema_v1_defines_every_table() {
        for table in [
            "tenant",
            "tenant_membership",
            "user",
            "course",
            "review",
            "course_rating",
            "review_helpful",
            "review_report",
        ] {
            let ddl = format!("DEFINE TABLE {table} SCHEMAFULL;");
            assert!(SCHEMA_V1.contains(&ddl), "missing table {table}");
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

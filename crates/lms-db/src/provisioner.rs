//! Per-tenant database provisioning.
//!
//! Each tenant gets its own SurrealDB database inside the shared
//! namespace. Database names are interpolated into DDL, so they are
//! validated against a strict identifier pattern first.

use lms_core::error::{LmsError, LmsResult};
use lms_core::repository::{MAX_DATABASE_NAME_LENGTH, TenantDatabaseProvisioner};
use surrealdb::{Connection, Surreal};
use tracing::info;

/// Provisions tenant databases on the SurrealDB instance the control
/// database lives on.
#[derive(Clone)]
pub struct SurrealTenantProvisioner<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantProvisioner<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn execute(&self, ddl: String) -> LmsResult<()> {
        let result = self
            .db
            .query(&ddl)
            .await
            .map_err(|e| LmsError::Provisioning(e.to_string()))?;
        result
            .check()
            .map_err(|e| LmsError::Provisioning(e.to_string()))?;
        Ok(())
    }
}

/// `[a-z][a-z0-9_]*`, at most `MAX_DATABASE_NAME_LENGTH` characters.
fn validate_database_name(name: &str) -> LmsResult<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && name.len() <= MAX_DATABASE_NAME_LENGTH;

    if valid {
        Ok(())
    } else {
        Err(LmsError::Provisioning(format!(
            "invalid database name: {name:?}"
        )))
    }
}

impl<C: Connection> TenantDatabaseProvisioner for SurrealTenantProvisioner<C> {
    async fn provision(&self, database_name: &str) -> LmsResult<()> {
        validate_database_name(database_name)?;
        self.execute(format!("DEFINE DATABASE IF NOT EXISTS {database_name};"))
            .await?;

        info!(database = %database_name, "Tenant database provisioned");
        Ok(())
    }

    async fn drop_database(&self, database_name: &str) -> LmsResult<()> {
        validate_database_name(database_name)?;
        self.execute(format!("REMOVE DATABASE IF EXISTS {database_name};"))
            .await?;

        info!(database = %database_name, "Tenant database removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_generated_names() {
        assert!(validate_database_name("tenant_acme").is_ok());
        assert!(validate_database_name("tenant_acme_school_2").is_ok());
    }

    #[test]
    fn rejects_unsafe_names() {
        for name in ["", "1tenant", "Tenant", "tenant-acme", "tenant;REMOVE", "t enant"] {
            assert!(
                matches!(validate_database_name(name), Err(LmsError::Provisioning(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_database_name(&"a".repeat(64)).is_err());
    }
}

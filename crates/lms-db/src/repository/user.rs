//! SurrealDB implementation of [`UserRepository`].

use chrono::{DateTime, Utc};
use lms_core::error::LmsResult;
use lms_core::models::user::{CreateUser, User};
use lms_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{parse_optional_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
pub(crate) struct UserRow {
    record_id: String,
    name: String,
    email: String,
    current_tenant_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            name: self.name,
            email: self.email,
            current_tenant_id: parse_optional_uuid(
                self.current_tenant_id.as_deref(),
                "current tenant",
            )?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
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
    async fn create(&self, input: CreateUser) -> LmsResult<User> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 name = $name, email = $email; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('user', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "user"))?;

        let rows: Vec<UserRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_id(&self, id: Uuid) -> LmsResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", id_str))?;

        Ok(row.try_into_user()?)
    }

    async fn get_by_email(&self, email: &str) -> LmsResult<User> {
        let email_owned = email.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM user WHERE email = $email")
            .bind(("email", email_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("user", format!("email={email_owned}")))?;

        Ok(row.try_into_user()?)
    }

    async fn update_current_tenant(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> LmsResult<()> {
        let id_str = user_id.to_string();

        // A NONE binding removes the field, which reads back as "no
        // active tenant".
        let result = self
            .db
            .query(
                "UPDATE type::record('user', $id) SET \
                 current_tenant_id = $tenant_id, updated_at = time::now() \
                 RETURN NONE; \
                 SELECT count() AS total FROM type::record('user', $id) GROUP ALL;",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.map(|t| t.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "user"))?;

        let rows: Vec<super::CountRow> = result.take(1).map_err(DbError::from)?;
        if super::first_count(&rows) == 0 {
            return Err(DbError::not_found("user", id_str).into());
        }

        debug!(user_id = %user_id, tenant_id = ?tenant_id, "Current tenant updated");

        Ok(())
    }
}

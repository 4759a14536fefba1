//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use lms_core::error::LmsResult;
use lms_core::models::tenant::{CreateTenant, Tenant, TenantStatus, UpdateTenant};
use lms_core::repository::TenantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, info};
use uuid::Uuid;

use super::{CountRow, first_count, parse_enum, parse_uuid};
use crate::error::DbError;

/// DB-side row struct; the record ID is selected via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(crate) struct TenantRow {
    record_id: String,
    name: String,
    slug: String,
    database_name: String,
    description: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    website: Option<String>,
    owner_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TenantRow {
    pub(crate) fn try_into_tenant(self) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id: parse_uuid(&self.record_id, "tenant")?,
            name: self.name,
            slug: self.slug,
            database_name: self.database_name,
            description: self.description,
            email: self.email,
            phone: self.phone,
            address: self.address,
            website: self.website,
            owner_id: parse_uuid(&self.owner_id, "owner")?,
            status: parse_enum(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Tenant repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id_str: String) -> Result<Tenant, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('tenant', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<TenantRow> = result.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", id_str))?;

        row.try_into_tenant()
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> LmsResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let membership_id = Uuid::new_v4().to_string();

        // Tenant and owner membership commit or roll back together.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('tenant', $id) SET \
                 name = $name, slug = $slug, \
                 database_name = $database_name, \
                 description = $description, email = $email, \
                 phone = $phone, address = $address, website = $website, \
                 owner_id = $owner_id, status = 'Active'; \
                 CREATE type::record('tenant_membership', $membership_id) SET \
                 user_id = $owner_id, tenant_id = $id, \
                 role = 'Admin', status = 'Active', \
                 joined_at = time::now(); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str.clone()))
            .bind(("membership_id", membership_id))
            .bind(("name", input.name))
            .bind(("slug", input.slug.clone()))
            .bind(("database_name", input.database_name))
            .bind(("description", input.description))
            .bind(("email", input.email))
            .bind(("phone", input.phone))
            .bind(("address", input.address))
            .bind(("website", input.website))
            .bind(("owner_id", input.owner_id.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement(e, "tenant"))?;

        info!(tenant_id = %id, slug = %input.slug, owner_id = %input.owner_id, "Tenant created");

        Ok(self.fetch(id_str).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> LmsResult<Tenant> {
        Ok(self.fetch(id.to_string()).await?)
    }

    async fn get_by_slug(&self, slug: &str) -> LmsResult<Tenant> {
        let slug_owned = slug.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tenant WHERE slug = $slug",
            )
            .bind(("slug", slug_owned.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TenantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("tenant", format!("slug={slug_owned}")))?;

        Ok(row.try_into_tenant()?)
    }

    async fn exists_by_slug(&self, slug: &str) -> LmsResult<bool> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM tenant WHERE slug = $slug GROUP ALL")
            .bind(("slug", slug.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(first_count(&rows) > 0)
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> LmsResult<Tenant> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.email.is_some() {
            sets.push("email = $email");
        }
        if input.phone.is_some() {
            sets.push("phone = $phone");
        }
        if input.address.is_some() {
            sets.push("address = $address");
        }
        if input.website.is_some() {
            sets.push("website = $website");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('tenant', $id) SET {} RETURN NONE",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(email) = input.email {
            builder = builder.bind(("email", email));
        }
        if let Some(phone) = input.phone {
            builder = builder.bind(("phone", phone));
        }
        if let Some(address) = input.address {
            builder = builder.bind(("address", address));
        }
        if let Some(website) = input.website {
            builder = builder.bind(("website", website));
        }

        let result = builder.await.map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::from_statement(e, "tenant"))?;

        Ok(self.fetch(id_str).await?)
    }

    async fn update_status(&self, id: Uuid, status: TenantStatus) -> LmsResult<Tenant> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('tenant', $id) SET \
                 status = $status, updated_at = time::now() RETURN NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str().to_string()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::from_statement(e, "tenant"))?;

        debug!(tenant_id = %id, status = %status, "Tenant status updated");

        Ok(self.fetch(id_str).await?)
    }

    async fn delete(&self, id: Uuid) -> LmsResult<()> {
        // Memberships reference the tenant, so they go first.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE tenant_membership WHERE tenant_id = $id; \
                 DELETE type::record('tenant', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement(e, "tenant"))?;

        info!(tenant_id = %id, "Tenant deleted");

        Ok(())
    }
}

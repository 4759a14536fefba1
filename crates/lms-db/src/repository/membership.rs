//! SurrealDB implementation of [`MembershipRepository`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lms_core::error::LmsResult;
use lms_core::models::membership::{
    CreateMembership, MembershipStatus, PendingInvitation, TenantMembership, UserTenant,
};
use lms_core::models::tenant::Tenant;
use lms_core::models::user::User;
use lms_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::tenant::TenantRow;
use super::user::UserRow;
use super::{parse_enum, parse_optional_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    record_id: String,
    user_id: String,
    tenant_id: String,
    role: String,
    status: String,
    invited_by: Option<String>,
    invited_at: Option<DateTime<Utc>>,
    joined_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<TenantMembership, DbError> {
        Ok(TenantMembership {
            id: parse_uuid(&self.record_id, "membership")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            role: parse_enum(&self.role)?,
            status: parse_enum(&self.status)?,
            invited_by: parse_optional_uuid(self.invited_by.as_deref(), "inviter")?,
            invited_at: self.invited_at,
            joined_at: self.joined_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn collect_memberships(rows: Vec<MembershipRow>) -> Result<Vec<TenantMembership>, DbError> {
    rows.into_iter()
        .map(|row| row.try_into_membership())
        .collect()
}

fn index_tenants(rows: Vec<TenantRow>) -> Result<HashMap<Uuid, Tenant>, DbError> {
    rows.into_iter()
        .map(|row| row.try_into_tenant().map(|t| (t.id, t)))
        .collect()
}

fn index_users(rows: Vec<UserRow>) -> Result<HashMap<Uuid, User>, DbError> {
    rows.into_iter()
        .map(|row| row.try_into_user().map(|u| (u.id, u)))
        .collect()
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id_str: String) -> Result<TenantMembership, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('tenant_membership', $id)",
            )
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<MembershipRow> = result.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("membership", id_str))?;

        row.try_into_membership()
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn create(&self, input: CreateMembership) -> LmsResult<TenantMembership> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tenant_membership', $id) SET \
                 user_id = $user_id, tenant_id = $tenant_id, \
                 role = $role, status = $status, \
                 invited_by = $invited_by, invited_at = $invited_at, \
                 joined_at = $joined_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("role", input.role.as_str().to_string()))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("invited_by", input.invited_by.map(|u| u.to_string())))
            .bind(("invited_at", input.invited_at))
            .bind(("joined_at", input.joined_at))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement(e, "membership"))?;

        debug!(
            membership_id = %id_str,
            user_id = %input.user_id,
            tenant_id = %input.tenant_id,
            role = %input.role,
            status = %input.status,
            "Membership created"
        );

        Ok(self.fetch(id_str).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> LmsResult<TenantMembership> {
        Ok(self.fetch(id.to_string()).await?)
    }

    async fn get(&self, user_id: Uuid, tenant_id: Uuid) -> LmsResult<TenantMembership> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant_membership \
                 WHERE user_id = $user_id AND tenant_id = $tenant_id",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| {
            DbError::not_found("membership", format!("user={user_id},tenant={tenant_id}"))
        })?;

        Ok(row.try_into_membership()?)
    }

    async fn get_user_tenants(&self, user_id: Uuid) -> LmsResult<Vec<UserTenant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant_membership \
                 WHERE user_id = $user_id AND status = 'Active' \
                 ORDER BY joined_at DESC; \
                 SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE meta::id(id) INSIDE (\
                     SELECT VALUE tenant_id FROM tenant_membership \
                     WHERE user_id = $user_id AND status = 'Active'\
                 );",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let memberships: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let tenants: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        let mut tenants = index_tenants(tenants)?;

        let mut items = Vec::new();
        for membership in collect_memberships(memberships)? {
            // A membership whose tenant vanished is skipped, not an error.
            let Some(tenant) = tenants.remove(&membership.tenant_id) else {
                continue;
            };
            items.push(UserTenant {
                is_owner: tenant.owner_id == user_id,
                role: membership.role,
                joined_at: membership.joined_at,
                tenant,
            });
        }

        Ok(items)
    }

    async fn get_pending_invitations(&self, user_id: Uuid) -> LmsResult<Vec<PendingInvitation>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant_membership \
                 WHERE user_id = $user_id AND status = 'Pending' \
                 ORDER BY invited_at DESC; \
                 SELECT meta::id(id) AS record_id, * FROM tenant \
                 WHERE meta::id(id) INSIDE (\
                     SELECT VALUE tenant_id FROM tenant_membership \
                     WHERE user_id = $user_id AND status = 'Pending'\
                 ); \
                 SELECT meta::id(id) AS record_id, * FROM user \
                 WHERE meta::id(id) INSIDE (\
                     SELECT VALUE invited_by FROM tenant_membership \
                     WHERE user_id = $user_id AND status = 'Pending' \
                     AND invited_by != NONE\
                 );",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let memberships: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;
        let tenants: Vec<TenantRow> = result.take(1).map_err(DbError::from)?;
        let inviters: Vec<UserRow> = result.take(2).map_err(DbError::from)?;
        let tenants = index_tenants(tenants)?;
        let inviters = index_users(inviters)?;

        let mut items = Vec::new();
        for membership in collect_memberships(memberships)? {
            let Some(tenant) = tenants.get(&membership.tenant_id) else {
                continue;
            };
            let inviter = membership.invited_by.and_then(|id| inviters.get(&id));
            items.push(PendingInvitation {
                membership_id: membership.id,
                tenant_id: tenant.id,
                tenant_name: tenant.name.clone(),
                role: membership.role,
                invited_by: membership.invited_by,
                inviter_name: inviter.map(|u| u.name.clone()),
                inviter_email: inviter.map(|u| u.email.clone()),
                invited_at: membership.invited_at,
            });
        }

        Ok(items)
    }

    async fn update_status(&self, id: Uuid, status: MembershipStatus) -> LmsResult<TenantMembership> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('tenant_membership', $id) SET \
                 status = $status, updated_at = time::now() RETURN NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("status", status.as_str().to_string()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::from_statement(e, "membership"))?;

        debug!(membership_id = %id, status = %status, "Membership status updated");

        Ok(self.fetch(id_str).await?)
    }

    async fn update_joined_at(&self, id: Uuid) -> LmsResult<TenantMembership> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('tenant_membership', $id) SET \
                 joined_at = time::now(), updated_at = time::now() RETURN NONE",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::from_statement(e, "membership"))?;

        Ok(self.fetch(id_str).await?)
    }

    async fn get_tenant_members(&self, tenant_id: Uuid) -> LmsResult<Vec<TenantMembership>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM tenant_membership \
                 WHERE tenant_id = $tenant_id ORDER BY created_at DESC",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MembershipRow> = result.take(0).map_err(DbError::from)?;

        Ok(collect_memberships(rows)?)
    }
}

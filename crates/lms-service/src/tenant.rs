//! Tenant service: provisioning, invitations and tenant switching.

use chrono::Utc;
use lms_core::error::{LmsError, LmsResult};
use lms_core::models::membership::{
    CreateMembership, MembershipRole, MembershipStatus, PendingInvitation, TenantMembership,
    UserTenant,
};
use lms_core::models::tenant::{CreateTenant, Tenant};
use lms_core::repository::{
    MAX_DATABASE_NAME_LENGTH, MembershipRepository, TenantDatabaseProvisioner, TenantRepository,
    UserRepository,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::TenantConfig;

/// Input for tenant provisioning.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionTenantRequest {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub owner_id: Uuid,
}

/// Tenant service.
///
/// Generic over repository and provisioner implementations so the
/// service layer has no dependency on the database crate.
pub struct TenantService<T, M, U, P>
where
    T: TenantRepository,
    M: MembershipRepository,
    U: UserRepository,
    P: TenantDatabaseProvisioner,
{
    tenant_repo: T,
    membership_repo: M,
    user_repo: U,
    provisioner: P,
    config: TenantConfig,
}

impl<T, M, U, P> TenantService<T, M, U, P>
where
    T: TenantRepository,
    M: MembershipRepository,
    U: UserRepository,
    P: TenantDatabaseProvisioner,
{
    pub fn new(
        tenant_repo: T,
        membership_repo: M,
        user_repo: U,
        provisioner: P,
        config: TenantConfig,
    ) -> Self {
        Self {
            tenant_repo,
            membership_repo,
            user_repo,
            provisioner,
            config,
        }
    }

    /// Create a tenant with its owner as active admin and provision the
    /// tenant database.
    ///
    /// If provisioning fails, any partially created database is dropped,
    /// the tenant row (and with it the owner membership) is deleted again
    /// and the provisioning error returned.
    pub async fn provision_tenant(&self, request: ProvisionTenantRequest) -> LmsResult<Tenant> {
        let name = request.name.trim().to_string();
        validate_name(&name, &self.config)?;
        validate_slug(&request.slug, &self.config)?;

        if self.tenant_repo.exists_by_slug(&request.slug).await? {
            return Err(LmsError::AlreadyExists {
                entity: "tenant".into(),
            });
        }

        let database_name = self.config.database_name(&request.slug);
        let tenant = self
            .tenant_repo
            .create(CreateTenant {
                name,
                slug: request.slug,
                database_name,
                description: request.description,
                email: request.email,
                phone: request.phone,
                address: request.address,
                website: request.website,
                owner_id: request.owner_id,
            })
            .await?;

        if let Err(e) = self.provisioner.provision(&tenant.database_name).await {
            error!(
                tenant_id = %tenant.id,
                database = %tenant.database_name,
                error = %e,
                "Tenant database provisioning failed, rolling back"
            );
            if let Err(cleanup) = self.provisioner.drop_database(&tenant.database_name).await {
                warn!(
                    database = %tenant.database_name,
                    error = %cleanup,
                    "Failed to drop tenant database during rollback"
                );
            }
            if let Err(rollback) = self.tenant_repo.delete(tenant.id).await {
                error!(
                    tenant_id = %tenant.id,
                    error = %rollback,
                    "Failed to roll back tenant after provisioning failure"
                );
            }
            return Err(e);
        }

        if let Err(e) = self
            .user_repo
            .update_current_tenant(tenant.owner_id, Some(tenant.id))
            .await
        {
            warn!(
                user_id = %tenant.owner_id,
                tenant_id = %tenant.id,
                error = %e,
                "Failed to set owner's current tenant"
            );
        }

        info!(
            tenant_id = %tenant.id,
            slug = %tenant.slug,
            database = %tenant.database_name,
            "Tenant provisioned"
        );

        Ok(tenant)
    }

    /// Invite a user into a tenant. Only active admins may invite.
    pub async fn invite_member(
        &self,
        tenant_id: Uuid,
        inviter_id: Uuid,
        invitee_id: Uuid,
        role: MembershipRole,
    ) -> LmsResult<TenantMembership> {
        let inviter = match self.membership_repo.get(inviter_id, tenant_id).await {
            Ok(m) => m,
            Err(LmsError::NotFound { .. }) => {
                return Err(LmsError::denied("inviter is not a member of the tenant"));
            }
            Err(e) => return Err(e),
        };
        if !inviter.is_active_admin() {
            return Err(LmsError::denied("only active admins can invite members"));
        }

        match self.membership_repo.get(invitee_id, tenant_id).await {
            Ok(_) => {
                return Err(LmsError::AlreadyExists {
                    entity: "membership".into(),
                });
            }
            Err(LmsError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let membership = self
            .membership_repo
            .create(CreateMembership {
                user_id: invitee_id,
                tenant_id,
                role,
                status: MembershipStatus::Pending,
                invited_by: Some(inviter_id),
                invited_at: Some(Utc::now()),
                joined_at: None,
            })
            .await?;

        info!(
            tenant_id = %tenant_id,
            membership_id = %membership.id,
            invitee_id = %invitee_id,
            inviter_id = %inviter_id,
            role = %role,
            "Member invited"
        );

        Ok(membership)
    }

    /// Accept a pending invitation and make its tenant the user's
    /// current tenant.
    pub async fn accept_invitation(
        &self,
        user_id: Uuid,
        membership_id: Uuid,
    ) -> LmsResult<TenantMembership> {
        let membership = self.pending_invitation(user_id, membership_id).await?;

        self.membership_repo
            .update_status(membership.id, MembershipStatus::Active)
            .await?;
        let membership = self.membership_repo.update_joined_at(membership.id).await?;

        self.user_repo
            .update_current_tenant(user_id, Some(membership.tenant_id))
            .await?;

        info!(
            user_id = %user_id,
            tenant_id = %membership.tenant_id,
            membership_id = %membership.id,
            "Invitation accepted"
        );

        Ok(membership)
    }

    pub async fn decline_invitation(
        &self,
        user_id: Uuid,
        membership_id: Uuid,
    ) -> LmsResult<TenantMembership> {
        let membership = self.pending_invitation(user_id, membership_id).await?;

        let membership = self
            .membership_repo
            .update_status(membership.id, MembershipStatus::Rejected)
            .await?;

        info!(
            user_id = %user_id,
            tenant_id = %membership.tenant_id,
            membership_id = %membership.id,
            "Invitation declined"
        );

        Ok(membership)
    }

    /// Point the user at another tenant, or clear the current tenant
    /// with `None`. Switching requires an active membership.
    pub async fn switch_tenant(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> LmsResult<()> {
        if let Some(tenant_id) = tenant_id {
            let membership = match self.membership_repo.get(user_id, tenant_id).await {
                Ok(m) => m,
                Err(LmsError::NotFound { .. }) => {
                    return Err(LmsError::denied("user is not a member of the tenant"));
                }
                Err(e) => return Err(e),
            };
            if membership.status != MembershipStatus::Active {
                return Err(LmsError::denied("membership is not active"));
            }
        }

        self.user_repo
            .update_current_tenant(user_id, tenant_id)
            .await
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> LmsResult<Vec<UserTenant>> {
        self.membership_repo.get_user_tenants(user_id).await
    }

    pub async fn pending_invitations(&self, user_id: Uuid) -> LmsResult<Vec<PendingInvitation>> {
        self.membership_repo.get_pending_invitations(user_id).await
    }

    pub async fn tenant_members(&self, tenant_id: Uuid) -> LmsResult<Vec<TenantMembership>> {
        self.membership_repo.get_tenant_members(tenant_id).await
    }

    async fn pending_invitation(
        &self,
        user_id: Uuid,
        membership_id: Uuid,
    ) -> LmsResult<TenantMembership> {
        let membership = self.membership_repo.get_by_id(membership_id).await?;
        if membership.user_id != user_id {
            return Err(LmsError::denied("invitation belongs to another user"));
        }
        if membership.status != MembershipStatus::Pending {
            return Err(LmsError::validation("invitation is no longer pending"));
        }
        Ok(membership)
    }
}

fn validate_name(name: &str, config: &TenantConfig) -> LmsResult<()> {
    if name.is_empty() {
        return Err(LmsError::validation("tenant name is required"));
    }
    if name.chars().count() > config.max_name_length {
        return Err(LmsError::validation(format!(
            "tenant name must be at most {} characters",
            config.max_name_length
        )));
    }
    Ok(())
}

/// Slugs are lowercase ASCII letters, digits and `-`.
fn validate_slug(slug: &str, config: &TenantConfig) -> LmsResult<()> {
    let len = slug.len();
    if len < config.min_slug_length || len > config.max_slug_length {
        return Err(LmsError::validation(format!(
            "slug must be {}-{} characters",
            config.min_slug_length, config.max_slug_length
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(LmsError::validation(
            "slug may only contain lowercase letters, digits and '-'",
        ));
    }
    if config.database_name(slug).len() > MAX_DATABASE_NAME_LENGTH {
        return Err(LmsError::validation(format!(
            "slug is too long for a database name of at most {MAX_DATABASE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        let config = TenantConfig::default();
        assert!(validate_slug("acme-school", &config).is_ok());
        assert!(validate_slug("abc", &config).is_ok());
        assert!(validate_slug("ab", &config).is_err());
        assert!(validate_slug(&"a".repeat(64), &config).is_err());
        assert!(validate_slug("Acme", &config).is_err());
        assert!(validate_slug("acme_school", &config).is_err());
    }

    #[test]
    fn slug_must_fit_database_name() {
        let config = TenantConfig::default();
        // "tenant_" leaves room for 56 slug characters.
        assert!(validate_slug(&"a".repeat(56), &config).is_ok());
        assert!(matches!(
            validate_slug(&"a".repeat(57), &config),
            Err(LmsError::Validation { .. })
        ));
        assert!(validate_slug(&"a".repeat(63), &config).is_err());

        let short_prefix = TenantConfig {
            database_prefix: "t_".into(),
            ..TenantConfig::default()
        };
        assert!(validate_slug(&"a".repeat(61), &short_prefix).is_ok());
    }

    #[test]
    fn name_rules() {
        let config = TenantConfig::default();
        assert!(validate_name("Acme School", &config).is_ok());
        assert!(validate_name("", &config).is_err());
        assert!(validate_name(&"n".repeat(256), &config).is_err());
    }
}

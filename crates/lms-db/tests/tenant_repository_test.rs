//! Integration tests for the Tenant, Membership and User repository
//! implementations using in-memory SurrealDB.

use lms_core::error::LmsError;
use lms_core::models::membership::{CreateMembership, MembershipRole, MembershipStatus};
use lms_core::models::tenant::{CreateTenant, TenantStatus, UpdateTenant};
use lms_core::models::user::{CreateUser, User};
use lms_core::repository::{MembershipRepository, TenantRepository, UserRepository};
use lms_db::repository::{
    SurrealMembershipRepository, SurrealTenantRepository, SurrealUserRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

/// Helper: spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    lms_db::run_migrations(&db).await.unwrap();
    db
}

async fn create_user(db: &Surreal<Db>, name: &str) -> User {
    SurrealUserRepository::new(db.clone())
        .create(CreateUser {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
        })
        .await
        .unwrap()
}

fn tenant_input(slug: &str, owner: &User) -> CreateTenant {
    CreateTenant {
        name: format!("{slug} academy"),
        slug: slug.into(),
        database_name: format!("tenant_{}", slug.replace('-', "_")),
        description: Some("Test tenant".into()),
        email: None,
        phone: None,
        address: None,
        website: None,
        owner_id: owner.id,
    }
}

// -----------------------------------------------------------------------
// Tenant tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_tenant_with_owner_membership() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db);

    let tenant = tenants.create(tenant_input("acme", &owner)).await.unwrap();

    assert_eq!(tenant.slug, "acme");
    assert_eq!(tenant.database_name, "tenant_acme");
    assert_eq!(tenant.status, TenantStatus::Active);
    assert_eq!(tenant.owner_id, owner.id);

    let membership = memberships.get(owner.id, tenant.id).await.unwrap();
    assert_eq!(membership.role, MembershipRole::Admin);
    assert_eq!(membership.status, MembershipStatus::Active);
    assert!(membership.joined_at.is_some());
    assert!(membership.is_active_admin());
}

#[tokio::test]
async fn get_tenant_by_id_and_slug() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let repo = SurrealTenantRepository::new(db);

    let tenant = repo.create(tenant_input("lookup", &owner)).await.unwrap();

    let by_id = repo.get_by_id(tenant.id).await.unwrap();
    assert_eq!(by_id.slug, "lookup");

    let by_slug = repo.get_by_slug("lookup").await.unwrap();
    assert_eq!(by_slug.id, tenant.id);

    assert!(repo.exists_by_slug("lookup").await.unwrap());
    assert!(!repo.exists_by_slug("missing").await.unwrap());
}

#[tokio::test]
async fn duplicate_slug_leaves_no_partial_state() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let other = create_user(&db, "Other").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db);

    tenants.create(tenant_input("dup", &owner)).await.unwrap();

    let mut second = tenant_input("dup", &other);
    second.database_name = "tenant_dup_other".into();
    let err = tenants.create(second).await.unwrap_err();
    assert!(matches!(err, LmsError::AlreadyExists { .. }), "got {err:?}");

    // The failed transaction must not leave an orphaned membership.
    let other_tenants = memberships.get_user_tenants(other.id).await.unwrap();
    assert!(other_tenants.is_empty());
}

#[tokio::test]
async fn update_tenant_fields() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let repo = SurrealTenantRepository::new(db);

    let tenant = repo.create(tenant_input("upd", &owner)).await.unwrap();

    let updated = repo
        .update(
            tenant.id,
            UpdateTenant {
                name: Some("Renamed".into()),
                website: Some("https://upd.example.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.website.as_deref(), Some("https://upd.example.com"));
    assert_eq!(updated.description.as_deref(), Some("Test tenant"));
}

#[tokio::test]
async fn update_tenant_status() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let repo = SurrealTenantRepository::new(db);

    let tenant = repo.create(tenant_input("status", &owner)).await.unwrap();
    let suspended = repo
        .update_status(tenant.id, TenantStatus::Suspended)
        .await
        .unwrap();

    assert_eq!(suspended.status, TenantStatus::Suspended);
}

#[tokio::test]
async fn delete_tenant_removes_memberships() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db);

    let tenant = tenants.create(tenant_input("gone", &owner)).await.unwrap();
    tenants.delete(tenant.id).await.unwrap();

    assert!(tenants.get_by_id(tenant.id).await.unwrap_err().is_not_found());
    assert!(
        memberships
            .get(owner.id, tenant.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn get_missing_tenant_is_not_found() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let err = repo.get_by_id(uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(err.is_not_found());
}

// -----------------------------------------------------------------------
// Membership tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn invitation_lifecycle() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let invitee = create_user(&db, "Invitee").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db);

    let tenant = tenants.create(tenant_input("invites", &owner)).await.unwrap();

    let invitation = memberships
        .create(CreateMembership {
            user_id: invitee.id,
            tenant_id: tenant.id,
            role: MembershipRole::Student,
            status: MembershipStatus::Pending,
            invited_by: Some(owner.id),
            invited_at: Some(chrono::Utc::now()),
            joined_at: None,
        })
        .await
        .unwrap();

    let pending = memberships.get_pending_invitations(invitee.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].membership_id, invitation.id);
    assert_eq!(pending[0].tenant_name, tenant.name);
    assert_eq!(pending[0].inviter_name.as_deref(), Some("Owner"));
    assert_eq!(
        pending[0].inviter_email.as_deref(),
        Some("owner@example.com")
    );

    // Pending memberships do not count as tenant access.
    assert!(memberships.get_user_tenants(invitee.id).await.unwrap().is_empty());

    memberships
        .update_status(invitation.id, MembershipStatus::Active)
        .await
        .unwrap();
    let joined = memberships.update_joined_at(invitation.id).await.unwrap();
    assert_eq!(joined.status, MembershipStatus::Active);
    assert!(joined.joined_at.is_some());

    let user_tenants = memberships.get_user_tenants(invitee.id).await.unwrap();
    assert_eq!(user_tenants.len(), 1);
    assert_eq!(user_tenants[0].tenant.id, tenant.id);
    assert_eq!(user_tenants[0].role, MembershipRole::Student);
    assert!(!user_tenants[0].is_owner);

    assert!(memberships.get_pending_invitations(invitee.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn owner_sees_tenant_as_owned() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db);

    let tenant = tenants.create(tenant_input("owned", &owner)).await.unwrap();

    let user_tenants = memberships.get_user_tenants(owner.id).await.unwrap();
    assert_eq!(user_tenants.len(), 1);
    assert_eq!(user_tenants[0].tenant.id, tenant.id);
    assert!(user_tenants[0].is_owner);
    assert_eq!(user_tenants[0].role, MembershipRole::Admin);
}

#[tokio::test]
async fn duplicate_membership_is_rejected() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db);

    let tenant = tenants.create(tenant_input("dupmember", &owner)).await.unwrap();

    let err = memberships
        .create(CreateMembership {
            user_id: owner.id,
            tenant_id: tenant.id,
            role: MembershipRole::Student,
            status: MembershipStatus::Pending,
            invited_by: None,
            invited_at: None,
            joined_at: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LmsError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn list_tenant_members() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let student = create_user(&db, "Student").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let memberships = SurrealMembershipRepository::new(db);

    let tenant = tenants.create(tenant_input("members", &owner)).await.unwrap();
    memberships
        .create(CreateMembership {
            user_id: student.id,
            tenant_id: tenant.id,
            role: MembershipRole::Student,
            status: MembershipStatus::Active,
            invited_by: Some(owner.id),
            invited_at: Some(chrono::Utc::now()),
            joined_at: Some(chrono::Utc::now()),
        })
        .await
        .unwrap();

    let members = memberships.get_tenant_members(tenant.id).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.tenant_id == tenant.id));
}

// -----------------------------------------------------------------------
// User tests
// -----------------------------------------------------------------------

#[tokio::test]
async fn user_email_is_unique() {
    let db = setup().await;
    let repo = SurrealUserRepository::new(db);

    repo.create(CreateUser {
        name: "First".into(),
        email: "same@example.com".into(),
    })
    .await
    .unwrap();

    let err = repo
        .create(CreateUser {
            name: "Second".into(),
            email: "same@example.com".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LmsError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn set_and_clear_current_tenant() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let tenants = SurrealTenantRepository::new(db.clone());
    let users = SurrealUserRepository::new(db);

    let tenant = tenants.create(tenant_input("current", &owner)).await.unwrap();

    users.update_current_tenant(owner.id, Some(tenant.id)).await.unwrap();
    let fetched = users.get_by_email("owner@example.com").await.unwrap();
    assert_eq!(fetched.current_tenant_id, Some(tenant.id));

    users.update_current_tenant(owner.id, None).await.unwrap();
    let fetched = users.get_by_id(owner.id).await.unwrap();
    assert_eq!(fetched.current_tenant_id, None);
}

#[tokio::test]
async fn current_tenant_of_missing_user_is_not_found() {
    let db = setup().await;
    let users = SurrealUserRepository::new(db);

    let err = users
        .update_current_tenant(uuid::Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

//! Integration tests for the tenant service.

use std::sync::{Arc, Mutex};

use lms_core::error::{LmsError, LmsResult};
use lms_core::models::membership::{MembershipRole, MembershipStatus};
use lms_core::models::user::{CreateUser, User};
use lms_core::repository::{
    MembershipRepository, TenantDatabaseProvisioner, TenantRepository, UserRepository,
};
use lms_db::SurrealTenantProvisioner;
use lms_db::repository::{
    SurrealMembershipRepository, SurrealTenantRepository, SurrealUserRepository,
};
use lms_service::{ProvisionTenantRequest, TenantConfig, TenantService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Service<P> = TenantService<
    SurrealTenantRepository<Db>,
    SurrealMembershipRepository<Db>,
    SurrealUserRepository<Db>,
    P,
>;

/// Provisioner whose backing store is always unreachable.
#[derive(Clone, Default)]
struct FailingProvisioner {
    dropped: Arc<Mutex<Vec<String>>>,
}

impl TenantDatabaseProvisioner for FailingProvisioner {
    async fn provision(&self, _database_name: &str) -> LmsResult<()> {
        Err(LmsError::Provisioning("storage unavailable".into()))
    }

    async fn drop_database(&self, database_name: &str) -> LmsResult<()> {
        self.dropped.lock().unwrap().push(database_name.to_string());
        Ok(())
    }
}

/// Spin up in-memory DB and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    lms_db::run_migrations(&db).await.unwrap();
    db
}

fn service(db: &Surreal<Db>) -> Service<SurrealTenantProvisioner<Db>> {
    TenantService::new(
        SurrealTenantRepository::new(db.clone()),
        SurrealMembershipRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        SurrealTenantProvisioner::new(db.clone()),
        TenantConfig::default(),
    )
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

fn provision_request(slug: &str, owner_id: Uuid) -> ProvisionTenantRequest {
    ProvisionTenantRequest {
        name: "Acme School".into(),
        slug: slug.into(),
        description: None,
        email: Some("office@acme.example.com".into()),
        phone: None,
        address: None,
        website: None,
        owner_id,
    }
}

// -----------------------------------------------------------------------
// Provisioning
// -----------------------------------------------------------------------

#[tokio::test]
async fn provision_tenant_makes_owner_active_admin() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;

    let tenant = svc
        .provision_tenant(provision_request("acme-school", owner.id))
        .await
        .unwrap();

    assert_eq!(tenant.database_name, "tenant_acme_school");

    let membership = SurrealMembershipRepository::new(db.clone())
        .get(owner.id, tenant.id)
        .await
        .unwrap();
    assert_eq!(membership.role, MembershipRole::Admin);
    assert_eq!(membership.status, MembershipStatus::Active);

    let owner = SurrealUserRepository::new(db.clone())
        .get_by_id(owner.id)
        .await
        .unwrap();
    assert_eq!(owner.current_tenant_id, Some(tenant.id));

    let mut result = db.query("INFO FOR NS").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    assert!(format!("{:?}", info).contains("tenant_acme_school"));
}

#[tokio::test]
async fn duplicate_slug_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;

    svc.provision_tenant(provision_request("acme", owner.id))
        .await
        .unwrap();
    let err = svc
        .provision_tenant(provision_request("acme", owner.id))
        .await
        .unwrap_err();

    assert!(matches!(err, LmsError::AlreadyExists { .. }), "got {err:?}");
}

#[tokio::test]
async fn invalid_slug_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;

    for slug in ["ab", "Acme", "acme_school", "acme school"] {
        let err = svc
            .provision_tenant(provision_request(slug, owner.id))
            .await
            .unwrap_err();
        assert!(matches!(err, LmsError::Validation { .. }), "{slug}: {err:?}");
    }
}

#[tokio::test]
async fn slug_length_is_bounded_by_database_name() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;

    let longest = "a".repeat(56);
    let tenant = svc
        .provision_tenant(provision_request(&longest, owner.id))
        .await
        .unwrap();
    assert_eq!(tenant.database_name.len(), 63);

    let too_long = "b".repeat(57);
    let err = svc
        .provision_tenant(provision_request(&too_long, owner.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::Validation { .. }), "got {err:?}");

    let tenants = SurrealTenantRepository::new(db);
    assert!(!tenants.exists_by_slug(&too_long).await.unwrap());
}

#[tokio::test]
async fn failed_provisioning_rolls_back_tenant() {
    let db = setup().await;
    let owner = create_user(&db, "Owner").await;
    let provisioner = FailingProvisioner::default();
    let svc: Service<FailingProvisioner> = TenantService::new(
        SurrealTenantRepository::new(db.clone()),
        SurrealMembershipRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        provisioner.clone(),
        TenantConfig::default(),
    );

    let err = svc
        .provision_tenant(provision_request("doomed", owner.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::Provisioning(_)), "got {err:?}");
    assert_eq!(
        *provisioner.dropped.lock().unwrap(),
        vec!["tenant_doomed".to_string()]
    );

    let tenants = SurrealTenantRepository::new(db.clone());
    assert!(!tenants.exists_by_slug("doomed").await.unwrap());
    assert!(svc.list_user_tenants(owner.id).await.unwrap().is_empty());

    let owner = SurrealUserRepository::new(db).get_by_id(owner.id).await.unwrap();
    assert_eq!(owner.current_tenant_id, None);
}

// -----------------------------------------------------------------------
// Invitations
// -----------------------------------------------------------------------

#[tokio::test]
async fn invitation_accept_flow() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;
    let teacher = create_user(&db, "Teacher").await;

    let tenant = svc
        .provision_tenant(provision_request("invite-flow", owner.id))
        .await
        .unwrap();

    let invitation = svc
        .invite_member(tenant.id, owner.id, teacher.id, MembershipRole::Instructor)
        .await
        .unwrap();
    assert_eq!(invitation.status, MembershipStatus::Pending);
    assert_eq!(invitation.invited_by, Some(owner.id));
    assert!(invitation.invited_at.is_some());

    let pending = svc.pending_invitations(teacher.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].inviter_name.as_deref(), Some("Owner"));

    let accepted = svc.accept_invitation(teacher.id, invitation.id).await.unwrap();
    assert_eq!(accepted.status, MembershipStatus::Active);
    assert!(accepted.joined_at.is_some());

    let teacher = SurrealUserRepository::new(db.clone())
        .get_by_id(teacher.id)
        .await
        .unwrap();
    assert_eq!(teacher.current_tenant_id, Some(tenant.id));

    let tenants = svc.list_user_tenants(teacher.id).await.unwrap();
    assert_eq!(tenants.len(), 1);
    assert_eq!(tenants[0].role, MembershipRole::Instructor);

    let members = svc.tenant_members(tenant.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn decline_and_reaccept_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;
    let student = create_user(&db, "Student").await;

    let tenant = svc
        .provision_tenant(provision_request("decline", owner.id))
        .await
        .unwrap();
    let invitation = svc
        .invite_member(tenant.id, owner.id, student.id, MembershipRole::Student)
        .await
        .unwrap();

    // Someone else cannot answer the invitation.
    let err = svc
        .decline_invitation(owner.id, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::AuthorizationDenied { .. }), "got {err:?}");

    let declined = svc.decline_invitation(student.id, invitation.id).await.unwrap();
    assert_eq!(declined.status, MembershipStatus::Rejected);

    let err = svc
        .accept_invitation(student.id, invitation.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::Validation { .. }), "got {err:?}");
    assert!(svc.pending_invitations(student.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_active_admins_invite() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;
    let student = create_user(&db, "Student").await;
    let outsider = create_user(&db, "Outsider").await;
    let friend = create_user(&db, "Friend").await;

    let tenant = svc
        .provision_tenant(provision_request("admins-only", owner.id))
        .await
        .unwrap();
    let invitation = svc
        .invite_member(tenant.id, owner.id, student.id, MembershipRole::Student)
        .await
        .unwrap();
    svc.accept_invitation(student.id, invitation.id).await.unwrap();

    let err = svc
        .invite_member(tenant.id, student.id, friend.id, MembershipRole::Student)
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::AuthorizationDenied { .. }), "got {err:?}");

    let err = svc
        .invite_member(tenant.id, outsider.id, friend.id, MembershipRole::Student)
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::AuthorizationDenied { .. }), "got {err:?}");

    let err = svc
        .invite_member(tenant.id, owner.id, student.id, MembershipRole::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::AlreadyExists { .. }), "got {err:?}");
}

// -----------------------------------------------------------------------
// Tenant switching
// -----------------------------------------------------------------------

#[tokio::test]
async fn switch_tenant_requires_active_membership() {
    let db = setup().await;
    let svc = service(&db);
    let owner = create_user(&db, "Owner").await;
    let other_owner = create_user(&db, "Other").await;

    let first = svc
        .provision_tenant(provision_request("first", owner.id))
        .await
        .unwrap();
    let second = svc
        .provision_tenant(provision_request("second", other_owner.id))
        .await
        .unwrap();

    let err = svc
        .switch_tenant(owner.id, Some(second.id))
        .await
        .unwrap_err();
    assert!(matches!(err, LmsError::AuthorizationDenied { .. }), "got {err:?}");

    let users = SurrealUserRepository::new(db.clone());

    svc.switch_tenant(owner.id, None).await.unwrap();
    assert_eq!(users.get_by_id(owner.id).await.unwrap().current_tenant_id, None);

    svc.switch_tenant(owner.id, Some(first.id)).await.unwrap();
    assert_eq!(
        users.get_by_id(owner.id).await.unwrap().current_tenant_id,
        Some(first.id)
    );
}

//! Repository and collaborator trait definitions for data access
//! abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation; the
//! tenant, membership and user repositories operate on the shared
//! control database.

use uuid::Uuid;

use crate::error::LmsResult;
use crate::models::{
    course::{Course, CreateCourse},
    membership::{
        CreateMembership, MembershipStatus, PendingInvitation, TenantMembership, UserTenant,
    },
    rating::CourseRating,
    review::{
        CreateReview, CreateReviewHelpful, CreateReviewReport, ReportStatus, Review,
        ReviewHelpful, ReviewReport, ReviewSort, UpdateReview, VoteCounts,
    },
    tenant::{CreateTenant, Tenant, TenantStatus, UpdateTenant},
    user::{CreateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// Convert a 1-based page number and page size into an offset window.
    pub fn from_page(page: u64, page_size: u64) -> Self {
        Self {
            offset: page.saturating_sub(1).saturating_mul(page_size),
            limit: page_size,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Control plane: tenants, memberships, users
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    /// Create the tenant and its owner's active admin membership in a
    /// single transaction. Neither row exists if either insert fails.
    fn create(&self, input: CreateTenant) -> impl Future<Output = LmsResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LmsResult<Tenant>> + Send;
    fn get_by_slug(&self, slug: &str) -> impl Future<Output = LmsResult<Tenant>> + Send;
    fn exists_by_slug(&self, slug: &str) -> impl Future<Output = LmsResult<bool>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = LmsResult<Tenant>> + Send;
    fn update_status(
        &self,
        id: Uuid,
        status: TenantStatus,
    ) -> impl Future<Output = LmsResult<Tenant>> + Send;
    /// Hard delete: removes every membership of the tenant, then the
    /// tenant itself, in one transaction. Only used for rollback.
    fn delete(&self, id: Uuid) -> impl Future<Output = LmsResult<()>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    fn create(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = LmsResult<TenantMembership>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LmsResult<TenantMembership>> + Send;
    fn get(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> impl Future<Output = LmsResult<TenantMembership>> + Send;

    /// Tenants where the user holds an active membership, most recently
    /// joined first.
    fn get_user_tenants(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LmsResult<Vec<UserTenant>>> + Send;

    /// Pending memberships of the user, with tenant and inviter details.
    fn get_pending_invitations(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = LmsResult<Vec<PendingInvitation>>> + Send;

    fn update_status(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> impl Future<Output = LmsResult<TenantMembership>> + Send;

    /// Stamp `joined_at` with the current time.
    fn update_joined_at(&self, id: Uuid)
    -> impl Future<Output = LmsResult<TenantMembership>> + Send;

    /// All memberships of a tenant, newest first.
    fn get_tenant_members(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = LmsResult<Vec<TenantMembership>>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = LmsResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = LmsResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = LmsResult<User>> + Send;

    /// Set or clear (`None`) the user's current active tenant.
    fn update_current_tenant(
        &self,
        user_id: Uuid,
        tenant_id: Option<Uuid>,
    ) -> impl Future<Output = LmsResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait CourseRepository: Send + Sync {
    fn create(&self, input: CreateCourse) -> impl Future<Output = LmsResult<Course>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = LmsResult<Course>> + Send;
}

/// Persistence for reviews, helpful votes, reports and the per-course
/// rating aggregate.
///
/// Soft-deleted reviews are invisible to every read method.
pub trait ReviewRepository: Send + Sync {
    fn create(&self, input: CreateReview) -> impl Future<Output = LmsResult<Review>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = LmsResult<Review>> + Send;

    /// The user's live review of a course, if any.
    fn get_user_course_review(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
    ) -> impl Future<Output = LmsResult<Option<Review>>> + Send;

    /// Apply the present fields and mark the review as edited.
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateReview,
    ) -> impl Future<Output = LmsResult<Review>> + Send;

    /// Soft-delete: flags the row as deleted and keeps it for audit.
    fn soft_delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = LmsResult<()>> + Send;

    fn list_by_course(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
        sort: ReviewSort,
        pagination: Pagination,
    ) -> impl Future<Output = LmsResult<PaginatedResult<Review>>> + Send;

    fn list_by_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = LmsResult<PaginatedResult<Review>>> + Send;

    // -- helpful votes ------------------------------------------------------

    fn vote_counts(
        &self,
        tenant_id: Uuid,
        review_id: Uuid,
    ) -> impl Future<Output = LmsResult<VoteCounts>> + Send;
    fn get_vote(
        &self,
        tenant_id: Uuid,
        review_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = LmsResult<Option<ReviewHelpful>>> + Send;
    fn create_vote(
        &self,
        input: CreateReviewHelpful,
    ) -> impl Future<Output = LmsResult<ReviewHelpful>> + Send;
    fn update_vote(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        is_helpful: bool,
    ) -> impl Future<Output = LmsResult<ReviewHelpful>> + Send;
    /// Deleting a vote that does not exist is not an error.
    fn delete_vote(
        &self,
        tenant_id: Uuid,
        review_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = LmsResult<()>> + Send;

    // -- reports ------------------------------------------------------------

    fn create_report(
        &self,
        input: CreateReviewReport,
    ) -> impl Future<Output = LmsResult<ReviewReport>> + Send;
    fn user_has_reported(
        &self,
        tenant_id: Uuid,
        review_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = LmsResult<bool>> + Send;
    fn get_report(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = LmsResult<ReviewReport>> + Send;
    fn update_report_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: ReportStatus,
        reviewed_by: Uuid,
    ) -> impl Future<Output = LmsResult<ReviewReport>> + Send;
    fn list_reports(
        &self,
        tenant_id: Uuid,
        status: Option<ReportStatus>,
        pagination: Pagination,
    ) -> impl Future<Output = LmsResult<PaginatedResult<ReviewReport>>> + Send;

    // -- aggregate ----------------------------------------------------------

    /// Rebuild the course aggregate from the live public reviews and
    /// store it.
    fn recalculate_course_rating(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
    ) -> impl Future<Output = LmsResult<CourseRating>> + Send;
    fn get_course_rating(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
    ) -> impl Future<Output = LmsResult<Option<CourseRating>>> + Send;
}

// ---------------------------------------------------------------------------
// External collaborators
// ---------------------------------------------------------------------------

/// Pushes a freshly recomputed course aggregate into the course
/// catalogue, which the review core does not own.
pub trait CourseRatingSync: Send + Sync {
    fn sync_rating_from_reviews(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
    ) -> impl Future<Output = LmsResult<()>> + Send;
}

/// Longest tenant database name a provisioner accepts.
pub const MAX_DATABASE_NAME_LENGTH: usize = 63;

/// Creates and removes the isolated data store backing a tenant.
pub trait TenantDatabaseProvisioner: Send + Sync {
    fn provision(&self, database_name: &str) -> impl Future<Output = LmsResult<()>> + Send;
    fn drop_database(&self, database_name: &str) -> impl Future<Output = LmsResult<()>> + Send;
}

//! Review service: course reviews, helpful votes, abuse reports and the
//! course rating aggregate.
//!
//! Every write that can move the aggregate recomputes it inline and
//! pushes it to the course catalogue. Those follow-up steps are best
//! effort: their failures are logged and never fail the write itself.

use lms_core::error::LmsError;
use lms_core::models::rating::CourseRating;
use lms_core::models::review::{
    CreateReview, CreateReviewHelpful, CreateReviewReport, ReportStatus, Review, ReviewSort,
    UpdateReview, VoteCounts,
};
use lms_core::repository::{CourseRatingSync, MembershipRepository, Pagination, ReviewRepository};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ReviewConfig;
use crate::dto::{
    CourseRatingResponse, CreateReviewRequest, ReportListResponse, ReportReviewRequest,
    ReviewListResponse, ReviewReportResponse, ReviewResponse, UpdateReviewRequest,
    VoteReviewRequest, total_pages,
};
use crate::error::{ReviewError, ReviewResult};

/// Review service.
///
/// Generic over repository implementations so that the service layer
/// has no dependency on the database crate.
pub struct ReviewService<R: ReviewRepository, M: MembershipRepository, S: CourseRatingSync> {
    review_repo: R,
    membership_repo: M,
    rating_sync: S,
    config: ReviewConfig,
}

impl<R, M, S> ReviewService<R, M, S>
where
    R: ReviewRepository,
    M: MembershipRepository,
    S: CourseRatingSync,
{
    pub fn new(review_repo: R, membership_repo: M, rating_sync: S, config: ReviewConfig) -> Self {
        Self {
            review_repo,
            membership_repo,
            rating_sync,
            config,
        }
    }

    pub async fn create_review(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        request: CreateReviewRequest,
    ) -> ReviewResult<ReviewResponse> {
        request.validate(&self.config)?;

        if self
            .review_repo
            .get_user_course_review(tenant_id, user_id, request.course_id)
            .await?
            .is_some()
        {
            return Err(ReviewError::ReviewAlreadyExists);
        }

        // The unique index catches a concurrent insert that slipped past
        // the check above.
        let review = self
            .review_repo
            .create(CreateReview {
                tenant_id,
                course_id: request.course_id,
                user_id,
                rating: request.rating,
                title: request.title,
                comment: request.comment,
                is_public: request.is_public,
            })
            .await
            .map_err(|e| match e {
                LmsError::AlreadyExists { .. } => ReviewError::ReviewAlreadyExists,
                other => other.into(),
            })?;

        info!(
            tenant_id = %tenant_id,
            review_id = %review.id,
            course_id = %review.course_id,
            user_id = %user_id,
            rating = review.rating,
            "Review created"
        );

        self.recalculate_and_sync_rating(tenant_id, review.course_id)
            .await;

        Ok(ReviewResponse::new(review, VoteCounts::default(), None))
    }

    pub async fn update_review(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        review_id: Uuid,
        request: UpdateReviewRequest,
    ) -> ReviewResult<ReviewResponse> {
        request.validate(&self.config)?;

        let existing = self.review_repo.get_by_id(tenant_id, review_id).await?;
        if existing.user_id != user_id {
            return Err(ReviewError::UnauthorizedAccess);
        }

        let affects_rating = request.affects_rating();
        let review = self
            .review_repo
            .update(
                tenant_id,
                review_id,
                UpdateReview {
                    rating: request.rating,
                    title: request.title,
                    comment: request.comment,
                    is_public: request.is_public,
                },
            )
            .await?;

        debug!(tenant_id = %tenant_id, review_id = %review_id, "Review updated");

        if affects_rating {
            self.recalculate_and_sync_rating(tenant_id, review.course_id)
                .await;
        }

        self.to_response(tenant_id, review, Some(user_id)).await
    }

    pub async fn delete_review(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        review_id: Uuid,
    ) -> ReviewResult<()> {
        let review = self.review_repo.get_by_id(tenant_id, review_id).await?;
        if review.user_id != user_id {
            return Err(ReviewError::UnauthorizedAccess);
        }

        self.review_repo.soft_delete(tenant_id, review_id).await?;
        info!(tenant_id = %tenant_id, review_id = %review_id, "Review deleted by author");

        self.recalculate_and_sync_rating(tenant_id, review.course_id)
            .await;
        Ok(())
    }

    /// Moderator deletion; skips the authorship check but requires the
    /// acting user to be an active admin of the tenant.
    pub async fn delete_review_by_admin(
        &self,
        tenant_id: Uuid,
        admin_id: Uuid,
        review_id: Uuid,
    ) -> ReviewResult<()> {
        self.require_admin(tenant_id, admin_id).await?;

        let review = self.review_repo.get_by_id(tenant_id, review_id).await?;
        self.review_repo.soft_delete(tenant_id, review_id).await?;
        info!(
            tenant_id = %tenant_id,
            review_id = %review_id,
            admin_id = %admin_id,
            "Review deleted by admin"
        );

        self.recalculate_and_sync_rating(tenant_id, review.course_id)
            .await;
        Ok(())
    }

    /// Private reviews are visible only to their author. Anyone else
    /// gets `NotFound`.
    pub async fn get_review(
        &self,
        tenant_id: Uuid,
        review_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> ReviewResult<ReviewResponse> {
        let review = self.review_repo.get_by_id(tenant_id, review_id).await?;
        if !review.is_public && viewer_id != Some(review.user_id) {
            return Err(LmsError::not_found("review", review_id).into());
        }
        self.to_response(tenant_id, review, viewer_id).await
    }

    /// Public reviews of a course, one page at a time. `sort_by` accepts
    /// `newest`, `oldest`, `highest` and `lowest`; anything else sorts
    /// newest first.
    pub async fn get_course_reviews(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
        viewer_id: Option<Uuid>,
        page: u64,
        page_size: u64,
        sort_by: &str,
    ) -> ReviewResult<ReviewListResponse> {
        let (page, page_size) = self.config.normalize_page(page, page_size);

        let result = self
            .review_repo
            .list_by_course(
                tenant_id,
                course_id,
                ReviewSort::from_param(sort_by),
                Pagination::from_page(page, page_size),
            )
            .await?;

        let mut reviews = Vec::with_capacity(result.items.len());
        for review in result.items {
            reviews.push(self.to_response(tenant_id, review, viewer_id).await?);
        }

        Ok(ReviewListResponse {
            reviews,
            total: result.total,
            page,
            page_size,
            total_pages: total_pages(result.total, page_size),
        })
    }

    /// All live reviews written by a user, private ones included.
    pub async fn get_user_reviews(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        page: u64,
        page_size: u64,
    ) -> ReviewResult<ReviewListResponse> {
        let (page, page_size) = self.config.normalize_page(page, page_size);

        let result = self
            .review_repo
            .list_by_user(tenant_id, user_id, Pagination::from_page(page, page_size))
            .await?;

        let mut reviews = Vec::with_capacity(result.items.len());
        for review in result.items {
            reviews.push(self.to_response(tenant_id, review, Some(user_id)).await?);
        }

        Ok(ReviewListResponse {
            reviews,
            total: result.total,
            page,
            page_size,
            total_pages: total_pages(result.total, page_size),
        })
    }

    pub async fn get_course_rating(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
    ) -> ReviewResult<CourseRatingResponse> {
        let rating = self
            .review_repo
            .get_course_rating(tenant_id, course_id)
            .await?
            .unwrap_or_else(|| CourseRating::empty(tenant_id, course_id));

        Ok(rating.into())
    }

    /// Cast or change a helpful vote. Voting again replaces the earlier
    /// vote instead of adding a second one.
    pub async fn vote_review(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        request: VoteReviewRequest,
    ) -> ReviewResult<()> {
        let review = self
            .review_repo
            .get_by_id(tenant_id, request.review_id)
            .await?;
        if review.user_id == user_id {
            return Err(ReviewError::CannotVoteOwnReview);
        }

        let existing = match self
            .review_repo
            .get_vote(tenant_id, request.review_id, user_id)
            .await?
        {
            Some(vote) => Some(vote),
            None => match self
                .review_repo
                .create_vote(CreateReviewHelpful {
                    tenant_id,
                    review_id: request.review_id,
                    user_id,
                    is_helpful: request.is_helpful,
                })
                .await
            {
                Ok(_) => None,
                // A concurrent vote by the same user created the row first.
                Err(LmsError::AlreadyExists { .. }) => {
                    self.review_repo
                        .get_vote(tenant_id, request.review_id, user_id)
                        .await?
                }
                Err(e) => return Err(e.into()),
            },
        };

        if let Some(vote) = existing {
            self.review_repo
                .update_vote(tenant_id, vote.id, request.is_helpful)
                .await?;
        }

        debug!(
            tenant_id = %tenant_id,
            review_id = %request.review_id,
            user_id = %user_id,
            is_helpful = request.is_helpful,
            "Review vote recorded"
        );
        Ok(())
    }

    /// Removing a vote that was never cast succeeds.
    pub async fn remove_vote(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        review_id: Uuid,
    ) -> ReviewResult<()> {
        self.review_repo
            .delete_vote(tenant_id, review_id, user_id)
            .await?;
        Ok(())
    }

    pub async fn report_review(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        request: ReportReviewRequest,
    ) -> ReviewResult<ReviewReportResponse> {
        request.validate(&self.config)?;

        let review = self
            .review_repo
            .get_by_id(tenant_id, request.review_id)
            .await?;
        if review.user_id == user_id {
            return Err(ReviewError::CannotReportOwnReview);
        }

        if self
            .review_repo
            .user_has_reported(tenant_id, request.review_id, user_id)
            .await?
        {
            return Err(ReviewError::AlreadyReported);
        }

        let report = self
            .review_repo
            .create_report(CreateReviewReport {
                tenant_id,
                review_id: request.review_id,
                reporter_id: user_id,
                reason: request.reason,
            })
            .await
            .map_err(|e| match e {
                LmsError::AlreadyExists { .. } => ReviewError::AlreadyReported,
                other => other.into(),
            })?;

        info!(
            tenant_id = %tenant_id,
            review_id = %report.review_id,
            report_id = %report.id,
            reporter_id = %user_id,
            "Review reported"
        );

        Ok(report.into())
    }

    /// Resolve a report. Approving it soft-deletes the reported review;
    /// that cascade is best effort and does not fail the status change.
    pub async fn update_report_status(
        &self,
        tenant_id: Uuid,
        admin_id: Uuid,
        report_id: Uuid,
        status: ReportStatus,
    ) -> ReviewResult<ReviewReportResponse> {
        self.require_admin(tenant_id, admin_id).await?;

        let report = self
            .review_repo
            .update_report_status(tenant_id, report_id, status, admin_id)
            .await?;

        info!(
            tenant_id = %tenant_id,
            report_id = %report_id,
            status = %status,
            admin_id = %admin_id,
            "Report status updated"
        );

        if status == ReportStatus::Approved {
            self.remove_reported_review(tenant_id, report.review_id)
                .await;
        }

        Ok(report.into())
    }

    /// Moderation queue, newest first, optionally filtered by status.
    pub async fn list_reports(
        &self,
        tenant_id: Uuid,
        admin_id: Uuid,
        status: Option<ReportStatus>,
        page: u64,
        page_size: u64,
    ) -> ReviewResult<ReportListResponse> {
        self.require_admin(tenant_id, admin_id).await?;
        let (page, page_size) = self.config.normalize_page(page, page_size);

        let result = self
            .review_repo
            .list_reports(tenant_id, status, Pagination::from_page(page, page_size))
            .await?;

        Ok(ReportListResponse {
            reports: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page,
            page_size,
            total_pages: total_pages(result.total, page_size),
        })
    }

    /// Recompute the course aggregate from its live public reviews and
    /// push it to the course catalogue. Never fails; problems are logged.
    pub async fn recalculate_and_sync_rating(&self, tenant_id: Uuid, course_id: Uuid) {
        match self
            .review_repo
            .recalculate_course_rating(tenant_id, course_id)
            .await
        {
            Ok(rating) => {
                debug!(
                    tenant_id = %tenant_id,
                    course_id = %course_id,
                    average_rating = rating.average_rating,
                    total_reviews = rating.total_reviews,
                    "Course rating recalculated"
                );
            }
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    course_id = %course_id,
                    error = %e,
                    "Failed to recalculate course rating"
                );
                return;
            }
        }

        if let Err(e) = self
            .rating_sync
            .sync_rating_from_reviews(tenant_id, course_id)
            .await
        {
            error!(
                tenant_id = %tenant_id,
                course_id = %course_id,
                error = %e,
                "Failed to sync course rating"
            );
        }
    }

    async fn remove_reported_review(&self, tenant_id: Uuid, review_id: Uuid) {
        let review = match self.review_repo.get_by_id(tenant_id, review_id).await {
            Ok(review) => review,
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    review_id = %review_id,
                    error = %e,
                    "Reported review not available for removal"
                );
                return;
            }
        };

        if let Err(e) = self.review_repo.soft_delete(tenant_id, review_id).await {
            error!(
                tenant_id = %tenant_id,
                review_id = %review_id,
                error = %e,
                "Failed to remove reported review"
            );
            return;
        }

        info!(tenant_id = %tenant_id, review_id = %review_id, "Reported review removed");
        self.recalculate_and_sync_rating(tenant_id, review.course_id)
            .await;
    }

    async fn require_admin(&self, tenant_id: Uuid, user_id: Uuid) -> ReviewResult<()> {
        match self.membership_repo.get(user_id, tenant_id).await {
            Ok(membership) if membership.is_active_admin() => Ok(()),
            Ok(_) | Err(LmsError::NotFound { .. }) => Err(ReviewError::UnauthorizedAccess),
            Err(e) => Err(e.into()),
        }
    }

    async fn to_response(
        &self,
        tenant_id: Uuid,
        review: Review,
        viewer_id: Option<Uuid>,
    ) -> ReviewResult<ReviewResponse> {
        let counts = self.review_repo.vote_counts(tenant_id, review.id).await?;
        let user_vote = match viewer_id {
            Some(viewer) => self
                .review_repo
                .get_vote(tenant_id, review.id, viewer)
                .await?
                .map(|v| v.is_helpful),
            None => None,
        };

        Ok(ReviewResponse::new(review, counts, user_vote))
    }
}

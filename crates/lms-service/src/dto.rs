//! Request and response shapes of the review service.
//!
//! Timestamps serialize as RFC 3339 through chrono's serde support.

use chrono::{DateTime, Utc};
use lms_core::error::{LmsError, LmsResult};
use lms_core::models::rating::CourseRating;
use lms_core::models::review::{
    MAX_RATING, MIN_RATING, ReportStatus, Review, ReviewReport, VoteCounts,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ReviewConfig;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    pub course_id: Uuid,
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
}

fn default_public() -> bool {
    true
}

impl CreateReviewRequest {
    pub fn validate(&self, config: &ReviewConfig) -> LmsResult<()> {
        validate_rating(self.rating)?;
        validate_text("title", self.title.as_deref(), config.max_title_length)?;
        validate_text("comment", self.comment.as_deref(), config.max_comment_length)
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_public: Option<bool>,
}

impl UpdateReviewRequest {
    pub fn validate(&self, config: &ReviewConfig) -> LmsResult<()> {
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        validate_text("title", self.title.as_deref(), config.max_title_length)?;
        validate_text("comment", self.comment.as_deref(), config.max_comment_length)
    }

    /// Whether applying this update can change the course aggregate.
    pub fn affects_rating(&self) -> bool {
        self.rating.is_some() || self.is_public.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteReviewRequest {
    pub review_id: Uuid,
    pub is_helpful: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportReviewRequest {
    pub review_id: Uuid,
    pub reason: String,
}

impl ReportReviewRequest {
    pub fn validate(&self, config: &ReviewConfig) -> LmsResult<()> {
        if self.reason.trim().is_empty() {
            return Err(LmsError::validation("reason is required"));
        }
        validate_text("reason", Some(&self.reason), config.max_reason_length)
    }
}

fn validate_rating(rating: u8) -> LmsResult<()> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(LmsError::validation(format!(
            "rating must be between {MIN_RATING} and {MAX_RATING}"
        )))
    }
}

fn validate_text(field: &str, value: Option<&str>, max_chars: usize) -> LmsResult<()> {
    match value {
        Some(v) if v.chars().count() > max_chars => Err(LmsError::validation(format!(
            "{field} must be at most {max_chars} characters"
        ))),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReviewResponse {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_public: bool,
    pub is_edited: bool,
    pub helpful_count: u64,
    pub unhelpful_count: u64,
    /// The viewer's own vote, when a viewer was given and has voted.
    pub user_vote: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewResponse {
    pub fn new(review: Review, counts: VoteCounts, user_vote: Option<bool>) -> Self {
        Self {
            id: review.id,
            tenant_id: review.tenant_id,
            course_id: review.course_id,
            user_id: review.user_id,
            rating: review.rating,
            title: review.title,
            comment: review.comment,
            is_public: review.is_public,
            is_edited: review.is_edited,
            helpful_count: counts.helpful,
            unhelpful_count: counts.unhelpful,
            user_vote,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<ReviewResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseRatingResponse {
    pub course_id: Uuid,
    pub average_rating: f64,
    pub total_reviews: u64,
    /// Review counts for 1 through 5 stars.
    pub distribution: [u64; 5],
}

impl From<CourseRating> for CourseRatingResponse {
    fn from(rating: CourseRating) -> Self {
        Self {
            course_id: rating.course_id,
            average_rating: rating.average_rating,
            total_reviews: rating.total_reviews,
            distribution: rating.distribution(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewReportResponse {
    pub id: Uuid,
    pub review_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReviewReport> for ReviewReportResponse {
    fn from(report: ReviewReport) -> Self {
        Self {
            id: report.id,
            review_id: report.review_id,
            reporter_id: report.reporter_id,
            reason: report.reason,
            status: report.status,
            reviewed_by: report.reviewed_by,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReviewReportResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

/// `ceil(total / page_size)`; zero when there is nothing to page.
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

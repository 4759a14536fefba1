//! Course review domain model: reviews, helpful votes and abuse reports.
//!
//! A review moves `active -> edited -> soft-deleted` and never comes back
//! from the deleted state. Deleted rows are kept for audit.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LmsError;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    /// Star rating in `1..=5`.
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_public: bool,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReview {
    pub tenant_id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_public: bool,
}

/// Partial update. Any update marks the review as edited.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateReview {
    pub rating: Option<u8>,
    pub title: Option<String>,
    pub comment: Option<String>,
    pub is_public: Option<bool>,
}

/// Ordering for review listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ReviewSort {
    #[default]
    Newest,
    Oldest,
    HighestRating,
    LowestRating,
}

impl ReviewSort {
    /// Parse a query parameter. Unknown or empty values fall back to
    /// [`ReviewSort::Newest`].
    pub fn from_param(param: &str) -> Self {
        match param.trim().to_ascii_lowercase().as_str() {
            "oldest" => ReviewSort::Oldest,
            "highest" | "highest_rating" | "rating_desc" => ReviewSort::HighestRating,
            "lowest" | "lowest_rating" | "rating_asc" => ReviewSort::LowestRating,
            _ => ReviewSort::Newest,
        }
    }
}

/// One user's helpful / unhelpful vote on a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewHelpful {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub is_helpful: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewHelpful {
    pub tenant_id: Uuid,
    pub review_id: Uuid,
    pub user_id: Uuid,
    pub is_helpful: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VoteCounts {
    pub helpful: u64,
    pub unhelpful: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReportStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Approved => "Approved",
            ReportStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = LmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ReportStatus::Pending),
            "Approved" => Ok(ReportStatus::Approved),
            "Rejected" => Ok(ReportStatus::Rejected),
            other => Err(LmsError::validation(format!(
                "unknown report status: {other}"
            ))),
        }
    }
}

/// An abuse report filed against a review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub review_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
    pub status: ReportStatus,
    /// The admin who last moderated the report.
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewReport {
    pub tenant_id: Uuid,
    pub review_id: Uuid,
    pub reporter_id: Uuid,
    pub reason: String,
}

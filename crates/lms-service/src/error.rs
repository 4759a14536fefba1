//! Review service error types.

use lms_core::error::LmsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("user has already reviewed this course")]
    ReviewAlreadyExists,

    #[error("unauthorized access to review")]
    UnauthorizedAccess,

    #[error("cannot vote on your own review")]
    CannotVoteOwnReview,

    #[error("cannot report your own review")]
    CannotReportOwnReview,

    #[error("review already reported by this user")]
    AlreadyReported,

    #[error(transparent)]
    Lms(#[from] LmsError),
}

pub type ReviewResult<T> = Result<T, ReviewError>;

impl From<ReviewError> for LmsError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::ReviewAlreadyExists => LmsError::AlreadyExists {
                entity: "review".into(),
            },
            ReviewError::AlreadyReported => LmsError::AlreadyExists {
                entity: "review_report".into(),
            },
            ReviewError::UnauthorizedAccess
            | ReviewError::CannotVoteOwnReview
            | ReviewError::CannotReportOwnReview => LmsError::AuthorizationDenied {
                reason: err.to_string(),
            },
            ReviewError::Lms(inner) => inner,
        }
    }
}

//! Course domain model.
//!
//! Courses are owned by the course catalogue, not by the review core.
//! The review core only pushes the denormalized rating figures onto them
//! through [`CourseRatingSync`](crate::repository::CourseRatingSync).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub title: String,
    pub average_rating: f64,
    pub total_reviews: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourse {
    pub tenant_id: Uuid,
    pub title: String,
}

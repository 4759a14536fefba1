//! SurrealDB implementation of [`ReviewRepository`].
//!
//! Covers reviews, helpful votes, abuse reports and the per-course
//! rating aggregate. Reviews are never removed: deletion flips
//! `is_deleted` and stamps `deletion_marker` so the live-review unique
//! index frees the (user, course) slot.

use chrono::{DateTime, Utc};
use lms_core::error::LmsResult;
use lms_core::models::rating::CourseRating;
use lms_core::models::review::{
    CreateReview, CreateReviewHelpful, CreateReviewReport, ReportStatus, Review, ReviewHelpful,
    ReviewReport, ReviewSort, UpdateReview, VoteCounts,
};
use lms_core::repository::{PaginatedResult, Pagination, ReviewRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, first_count, parse_enum, parse_optional_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ReviewRow {
    record_id: String,
    tenant_id: String,
    course_id: String,
    user_id: String,
    rating: i64,
    title: Option<String>,
    comment: Option<String>,
    is_public: bool,
    is_edited: bool,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewRow {
    fn try_into_review(self) -> Result<Review, DbError> {
        let rating = u8::try_from(self.rating)
            .map_err(|_| DbError::Corrupt(format!("rating out of range: {}", self.rating)))?;
        Ok(Review {
            id: parse_uuid(&self.record_id, "review")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            course_id: parse_uuid(&self.course_id, "course")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            rating,
            title: self.title,
            comment: self.comment,
            is_public: self.is_public,
            is_edited: self.is_edited,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct VoteRow {
    record_id: String,
    tenant_id: String,
    review_id: String,
    user_id: String,
    is_helpful: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VoteRow {
    fn try_into_vote(self) -> Result<ReviewHelpful, DbError> {
        Ok(ReviewHelpful {
            id: parse_uuid(&self.record_id, "vote")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            review_id: parse_uuid(&self.review_id, "review")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            is_helpful: self.is_helpful,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ReportRow {
    record_id: String,
    tenant_id: String,
    review_id: String,
    reporter_id: String,
    reason: String,
    status: String,
    reviewed_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReportRow {
    fn try_into_report(self) -> Result<ReviewReport, DbError> {
        Ok(ReviewReport {
            id: parse_uuid(&self.record_id, "report")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            review_id: parse_uuid(&self.review_id, "review")?,
            reporter_id: parse_uuid(&self.reporter_id, "reporter")?,
            reason: self.reason,
            status: parse_enum(&self.status)?,
            reviewed_by: parse_optional_uuid(self.reviewed_by.as_deref(), "moderator")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
pub(crate) struct CourseRatingRow {
    tenant_id: String,
    course_id: String,
    pub(crate) average_rating: f64,
    pub(crate) total_reviews: u64,
    rating_1: u64,
    rating_2: u64,
    rating_3: u64,
    rating_4: u64,
    rating_5: u64,
    updated_at: DateTime<Utc>,
}

impl CourseRatingRow {
    fn try_into_rating(self) -> Result<CourseRating, DbError> {
        Ok(CourseRating {
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            course_id: parse_uuid(&self.course_id, "course")?,
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
            rating_1: self.rating_1,
            rating_2: self.rating_2,
            rating_3: self.rating_3,
            rating_4: self.rating_4,
            rating_5: self.rating_5,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RatingRow {
    rating: i64,
}

/// Row returned by a soft-delete `UPDATE`; only used to detect a match.
#[derive(Debug, SurrealValue)]
struct DeletedRow {
    is_deleted: bool,
}

/// Record key of the aggregate row for a course. One row per
/// (tenant, course), so recomputation can upsert in place.
pub(crate) fn course_rating_key(tenant_id: Uuid, course_id: Uuid) -> String {
    format!("{tenant_id}_{course_id}")
}

fn order_clause(sort: ReviewSort) -> &'static str {
    match sort {
        ReviewSort::Newest => "created_at DESC",
        ReviewSort::Oldest => "created_at ASC",
        ReviewSort::HighestRating => "rating DESC, created_at DESC",
        ReviewSort::LowestRating => "rating ASC, created_at DESC",
    }
}

fn collect_reviews(rows: Vec<ReviewRow>) -> Result<Vec<Review>, DbError> {
    rows.into_iter().map(|row| row.try_into_review()).collect()
}

/// SurrealDB implementation of the Review repository.
#[derive(Clone)]
pub struct SurrealReviewRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReviewRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_report(&self, tenant_id: Uuid, id_str: String) -> Result<ReviewReport, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('review_report', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<ReportRow> = result.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("review_report", id_str))?;

        row.try_into_report()
    }

    async fn fetch_vote(&self, tenant_id: Uuid, id_str: String) -> Result<ReviewHelpful, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('review_helpful', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await?;

        let rows: Vec<VoteRow> = result.take(0)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("review_helpful", id_str))?;

        row.try_into_vote()
    }
}

impl<C: Connection> ReviewRepository for SurrealReviewRepository<C> {
    async fn create(&self, input: CreateReview) -> LmsResult<Review> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('review', $id) SET \
                 tenant_id = $tenant_id, course_id = $course_id, \
                 user_id = $user_id, rating = $rating, \
                 title = $title, comment = $comment, \
                 is_public = $is_public, is_edited = false, \
                 is_deleted = false, deletion_marker = ''; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('review', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("course_id", input.course_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("rating", i64::from(input.rating)))
            .bind(("title", input.title))
            .bind(("comment", input.comment))
            .bind(("is_public", input.is_public))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "review"))?;

        let rows: Vec<ReviewRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("review", id_str))?;

        Ok(row.try_into_review()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> LmsResult<Review> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('review', $id) \
                 WHERE tenant_id = $tenant_id AND is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("review", id_str))?;

        Ok(row.try_into_review()?)
    }

    async fn get_user_course_review(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
    ) -> LmsResult<Option<Review>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 AND course_id = $course_id AND is_deleted = false \
                 LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .bind(("course_id", course_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_review())
            .transpose()?)
    }

    async fn update(&self, tenant_id: Uuid, id: Uuid, input: UpdateReview) -> LmsResult<Review> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.rating.is_some() {
            sets.push("rating = $rating");
        }
        if input.title.is_some() {
            sets.push("title = $title");
        }
        if input.comment.is_some() {
            sets.push("comment = $comment");
        }
        if input.is_public.is_some() {
            sets.push("is_public = $is_public");
        }
        sets.push("is_edited = true");
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('review', $id) SET {} \
             WHERE tenant_id = $tenant_id AND is_deleted = false \
             RETURN NONE; \
             SELECT meta::id(id) AS record_id, * \
             FROM type::record('review', $id) \
             WHERE tenant_id = $tenant_id AND is_deleted = false;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()));

        if let Some(rating) = input.rating {
            builder = builder.bind(("rating", i64::from(rating)));
        }
        if let Some(title) = input.title {
            builder = builder.bind(("title", title));
        }
        if let Some(comment) = input.comment {
            builder = builder.bind(("comment", comment));
        }
        if let Some(is_public) = input.is_public {
            builder = builder.bind(("is_public", is_public));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "review"))?;

        let rows: Vec<ReviewRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("review", id_str))?;

        Ok(row.try_into_review()?)
    }

    async fn soft_delete(&self, tenant_id: Uuid, id: Uuid) -> LmsResult<()> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('review', $id) SET \
                 is_deleted = true, deleted_at = time::now(), \
                 deletion_marker = $id, updated_at = time::now() \
                 WHERE tenant_id = $tenant_id AND is_deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "review"))?;

        let rows: Vec<DeletedRow> = result.take(0).map_err(DbError::from)?;
        if !rows.iter().any(|r| r.is_deleted) {
            return Err(DbError::not_found("review", id_str).into());
        }

        debug!(tenant_id = %tenant_id, review_id = %id, "Review soft-deleted");

        Ok(())
    }

    async fn list_by_course(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
        sort: ReviewSort,
        pagination: Pagination,
    ) -> LmsResult<PaginatedResult<Review>> {
        let tenant_id_str = tenant_id.to_string();
        let course_id_str = course_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM review \
                 WHERE tenant_id = $tenant_id AND course_id = $course_id \
                 AND is_deleted = false AND is_public = true GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .bind(("course_id", course_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(&count_rows);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM review \
             WHERE tenant_id = $tenant_id AND course_id = $course_id \
             AND is_deleted = false AND is_public = true \
             ORDER BY {} \
             LIMIT $limit START $offset",
            order_clause(sort)
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("tenant_id", tenant_id_str))
            .bind(("course_id", course_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: collect_reviews(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_user(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        pagination: Pagination,
    ) -> LmsResult<PaginatedResult<Review>> {
        let tenant_id_str = tenant_id.to_string();
        let user_id_str = user_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM review \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 AND is_deleted = false GROUP ALL",
            )
            .bind(("tenant_id", tenant_id_str.clone()))
            .bind(("user_id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(&count_rows);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review \
                 WHERE tenant_id = $tenant_id AND user_id = $user_id \
                 AND is_deleted = false \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("tenant_id", tenant_id_str))
            .bind(("user_id", user_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;

        Ok(PaginatedResult {
            items: collect_reviews(rows)?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn vote_counts(&self, tenant_id: Uuid, review_id: Uuid) -> LmsResult<VoteCounts> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM review_helpful \
                 WHERE tenant_id = $tenant_id AND review_id = $review_id \
                 AND is_helpful = true GROUP ALL; \
                 SELECT count() AS total FROM review_helpful \
                 WHERE tenant_id = $tenant_id AND review_id = $review_id \
                 AND is_helpful = false GROUP ALL;",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("review_id", review_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let helpful: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let unhelpful: Vec<CountRow> = result.take(1).map_err(DbError::from)?;

        Ok(VoteCounts {
            helpful: first_count(&helpful),
            unhelpful: first_count(&unhelpful),
        })
    }

    async fn get_vote(
        &self,
        tenant_id: Uuid,
        review_id: Uuid,
        user_id: Uuid,
    ) -> LmsResult<Option<ReviewHelpful>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review_helpful \
                 WHERE tenant_id = $tenant_id AND review_id = $review_id \
                 AND user_id = $user_id LIMIT 1",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("review_id", review_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<VoteRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_vote())
            .transpose()?)
    }

    async fn create_vote(&self, input: CreateReviewHelpful) -> LmsResult<ReviewHelpful> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('review_helpful', $id) SET \
                 tenant_id = $tenant_id, review_id = $review_id, \
                 user_id = $user_id, is_helpful = $is_helpful",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("review_id", input.review_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("is_helpful", input.is_helpful))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement(e, "review_helpful"))?;

        Ok(self.fetch_vote(input.tenant_id, id_str).await?)
    }

    async fn update_vote(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        is_helpful: bool,
    ) -> LmsResult<ReviewHelpful> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('review_helpful', $id) SET \
                 is_helpful = $is_helpful, updated_at = time::now() \
                 WHERE tenant_id = $tenant_id RETURN NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("is_helpful", is_helpful))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::from_statement(e, "review_helpful"))?;

        Ok(self.fetch_vote(tenant_id, id_str).await?)
    }

    async fn delete_vote(&self, tenant_id: Uuid, review_id: Uuid, user_id: Uuid) -> LmsResult<()> {
        let result = self
            .db
            .query(
                "DELETE review_helpful WHERE tenant_id = $tenant_id \
                 AND review_id = $review_id AND user_id = $user_id",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("review_id", review_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement(e, "review_helpful"))?;

        Ok(())
    }

    async fn create_report(&self, input: CreateReviewReport) -> LmsResult<ReviewReport> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('review_report', $id) SET \
                 tenant_id = $tenant_id, review_id = $review_id, \
                 reporter_id = $reporter_id, reason = $reason, \
                 status = 'Pending'",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("review_id", input.review_id.to_string()))
            .bind(("reporter_id", input.reporter_id.to_string()))
            .bind(("reason", input.reason))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::from_statement(e, "review_report"))?;

        Ok(self.fetch_report(input.tenant_id, id_str).await?)
    }

    async fn user_has_reported(
        &self,
        tenant_id: Uuid,
        review_id: Uuid,
        user_id: Uuid,
    ) -> LmsResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM review_report \
                 WHERE tenant_id = $tenant_id AND review_id = $review_id \
                 AND reporter_id = $reporter_id GROUP ALL",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("review_id", review_id.to_string()))
            .bind(("reporter_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;

        Ok(first_count(&rows) > 0)
    }

    async fn get_report(&self, tenant_id: Uuid, id: Uuid) -> LmsResult<ReviewReport> {
        Ok(self.fetch_report(tenant_id, id.to_string()).await?)
    }

    async fn update_report_status(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        status: ReportStatus,
        reviewed_by: Uuid,
    ) -> LmsResult<ReviewReport> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "UPDATE type::record('review_report', $id) SET \
                 status = $status, reviewed_by = $reviewed_by, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id RETURN NONE",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status.as_str().to_string()))
            .bind(("reviewed_by", reviewed_by.to_string()))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::from_statement(e, "review_report"))?;

        Ok(self.fetch_report(tenant_id, id_str).await?)
    }

    async fn list_reports(
        &self,
        tenant_id: Uuid,
        status: Option<ReportStatus>,
        pagination: Pagination,
    ) -> LmsResult<PaginatedResult<ReviewReport>> {
        let filter = if status.is_some() {
            "tenant_id = $tenant_id AND status = $status"
        } else {
            "tenant_id = $tenant_id"
        };
        let status_str = status.map(|s| s.as_str().to_string());

        let count_query =
            format!("SELECT count() AS total FROM review_report WHERE {filter} GROUP ALL");
        let mut count_result = self
            .db
            .query(&count_query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = first_count(&count_rows);

        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM review_report \
             WHERE {filter} \
             ORDER BY created_at DESC \
             LIMIT $limit START $offset"
        );
        let mut result = self
            .db
            .query(&query)
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("status", status_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReportRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_report())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn recalculate_course_rating(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
    ) -> LmsResult<CourseRating> {
        let mut result = self
            .db
            .query(
                "SELECT rating FROM review \
                 WHERE tenant_id = $tenant_id AND course_id = $course_id \
                 AND is_deleted = false AND is_public = true",
            )
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("course_id", course_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RatingRow> = result.take(0).map_err(DbError::from)?;
        let ratings: Vec<u8> = rows
            .iter()
            .filter_map(|r| u8::try_from(r.rating).ok())
            .collect();

        let aggregate = CourseRating::from_ratings(tenant_id, course_id, &ratings);

        let result = self
            .db
            .query(
                "UPSERT type::record('course_rating', $key) SET \
                 tenant_id = $tenant_id, course_id = $course_id, \
                 average_rating = $average_rating, \
                 total_reviews = $total_reviews, \
                 rating_1 = $rating_1, rating_2 = $rating_2, \
                 rating_3 = $rating_3, rating_4 = $rating_4, \
                 rating_5 = $rating_5, updated_at = time::now() \
                 RETURN NONE",
            )
            .bind(("key", course_rating_key(tenant_id, course_id)))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("course_id", course_id.to_string()))
            .bind(("average_rating", aggregate.average_rating))
            .bind(("total_reviews", aggregate.total_reviews))
            .bind(("rating_1", aggregate.rating_1))
            .bind(("rating_2", aggregate.rating_2))
            .bind(("rating_3", aggregate.rating_3))
            .bind(("rating_4", aggregate.rating_4))
            .bind(("rating_5", aggregate.rating_5))
            .await
            .map_err(DbError::from)?;
        result
            .check()
            .map_err(|e| DbError::from_statement(e, "course_rating"))?;

        debug!(
            tenant_id = %tenant_id,
            course_id = %course_id,
            total_reviews = aggregate.total_reviews,
            average_rating = aggregate.average_rating,
            "Course rating recalculated"
        );

        Ok(aggregate)
    }

    async fn get_course_rating(
        &self,
        tenant_id: Uuid,
        course_id: Uuid,
    ) -> LmsResult<Option<CourseRating>> {
        let row = fetch_course_rating_row(&self.db, tenant_id, course_id).await?;

        Ok(row.map(|r| r.try_into_rating()).transpose()?)
    }
}

/// Load the stored aggregate row for a course, if one has been computed.
pub(crate) async fn fetch_course_rating_row<C: Connection>(
    db: &Surreal<C>,
    tenant_id: Uuid,
    course_id: Uuid,
) -> Result<Option<CourseRatingRow>, DbError> {
    let mut result = db
        .query(
            "SELECT * FROM type::record('course_rating', $key) \
             WHERE tenant_id = $tenant_id",
        )
        .bind(("key", course_rating_key(tenant_id, course_id)))
        .bind(("tenant_id", tenant_id.to_string()))
        .await?;

    let rows: Vec<CourseRatingRow> = result.take(0)?;

    Ok(rows.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_key_is_stable_per_course() {
        let tenant = Uuid::new_v4();
        let course = Uuid::new_v4();
        assert_eq!(course_rating_key(tenant, course), course_rating_key(tenant, course));
        assert_ne!(
            course_rating_key(tenant, course),
            course_rating_key(tenant, Uuid::new_v4())
        );
    }

    #[test]
    fn newest_is_default_order() {
        assert_eq!(order_clause(ReviewSort::default()), "created_at DESC");
        assert!(order_clause(ReviewSort::HighestRating).starts_with("rating DESC"));
    }
}

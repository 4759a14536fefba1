//! SurrealDB implementation of [`CourseRepository`] and the
//! [`CourseRatingSync`] collaborator.

use chrono::{DateTime, Utc};
use lms_core::error::LmsResult;
use lms_core::models::course::{Course, CreateCourse};
use lms_core::repository::{CourseRatingSync, CourseRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::review::fetch_course_rating_row;
use super::{CountRow, first_count, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct CourseRow {
    record_id: String,
    tenant_id: String,
    title: String,
    average_rating: f64,
    total_reviews: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CourseRow {
    fn try_into_course(self) -> Result<Course, DbError> {
        Ok(Course {
            id: parse_uuid(&self.record_id, "course")?,
            tenant_id: parse_uuid(&self.tenant_id, "tenant")?,
            title: self.title,
            average_rating: self.average_rating,
            total_reviews: self.total_reviews,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Course repository.
#[derive(Clone)]
pub struct SurrealCourseRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCourseRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> CourseRepository for SurrealCourseRepository<C> {
    async fn create(&self, input: CreateCourse) -> LmsResult<Course> {
        let id_str = Uuid::new_v4().to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('course', $id) SET \
                 tenant_id = $tenant_id, title = $title; \
                 SELECT meta::id(id) AS record_id, * \
                 FROM type::record('course', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", input.tenant_id.to_string()))
            .bind(("title", input.title))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "course"))?;

        let rows: Vec<CourseRow> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("course", id_str))?;

        Ok(row.try_into_course()?)
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> LmsResult<Course> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('course', $id) \
                 WHERE tenant_id = $tenant_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CourseRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("course", id_str))?;

        Ok(row.try_into_course()?)
    }
}

impl<C: Connection> CourseRatingSync for SurrealCourseRepository<C> {
    async fn sync_rating_from_reviews(&self, tenant_id: Uuid, course_id: Uuid) -> LmsResult<()> {
        let id_str = course_id.to_string();

        // No stored aggregate means the course has no rated reviews yet.
        let (average_rating, total_reviews) =
            match fetch_course_rating_row(&self.db, tenant_id, course_id).await? {
                Some(row) => (row.average_rating, row.total_reviews),
                None => (0.0, 0),
            };

        let result = self
            .db
            .query(
                "UPDATE type::record('course', $id) SET \
                 average_rating = $average_rating, \
                 total_reviews = $total_reviews, \
                 updated_at = time::now() \
                 WHERE tenant_id = $tenant_id RETURN NONE; \
                 SELECT count() AS total FROM type::record('course', $id) \
                 WHERE tenant_id = $tenant_id GROUP ALL;",
            )
            .bind(("id", id_str.clone()))
            .bind(("tenant_id", tenant_id.to_string()))
            .bind(("average_rating", average_rating))
            .bind(("total_reviews", total_reviews))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "course"))?;

        let rows: Vec<CountRow> = result.take(1).map_err(DbError::from)?;
        if first_count(&rows) == 0 {
            return Err(DbError::not_found("course", id_str).into());
        }

        debug!(
            tenant_id = %tenant_id,
            course_id = %course_id,
            average_rating,
            total_reviews,
            "Course rating synced"
        );

        Ok(())
    }
}

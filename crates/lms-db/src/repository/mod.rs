//! SurrealDB repository implementations.

mod course;
mod membership;
mod review;
mod tenant;
mod user;

pub use course::SurrealCourseRepository;
pub use membership::SurrealMembershipRepository;
pub use review::SurrealReviewRepository;
pub use tenant::SurrealTenantRepository;
pub use user::SurrealUserRepository;

use std::str::FromStr;

use lms_core::error::LmsError;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn first_count(rows: &[CountRow]) -> u64 {
    rows.first().map(|r| r.total).unwrap_or(0)
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<&str>,
    field: &str,
) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(v, field)).transpose()
}

/// Parse an enum stored as its string name.
pub(crate) fn parse_enum<T: FromStr<Err = LmsError>>(value: &str) -> Result<T, DbError> {
    value
        .parse()
        .map_err(|e: LmsError| DbError::Corrupt(e.to_string()))
}

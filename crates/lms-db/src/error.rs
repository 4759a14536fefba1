//! Database-specific error types and conversions.

use lms_core::error::LmsError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Conflict { entity: String },

    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Classify a failed statement. Unique index violations become
    /// [`DbError::Conflict`] so callers can report a duplicate instead of
    /// an infrastructure failure.
    pub(crate) fn from_statement(err: surrealdb::Error, entity: &str) -> Self {
        let message = err.to_string();
        if is_unique_violation(&message) {
            DbError::Conflict {
                entity: entity.into(),
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

fn is_unique_violation(message: &str) -> bool {
    message.contains("already contains")
}

impl From<DbError> for LmsError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => LmsError::NotFound { entity, id },
            DbError::Conflict { entity } => LmsError::AlreadyExists { entity },
            other => LmsError::Database(other.to_string()),
        }
    }
}

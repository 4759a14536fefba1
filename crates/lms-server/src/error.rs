//! Startup errors.

use lms_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("database connection failed: {0}")]
    Connect(#[from] surrealdb::Error),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("signal handling failed: {0}")]
    Signal(#[from] std::io::Error),
}

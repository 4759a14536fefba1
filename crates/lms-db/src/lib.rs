//! LMS Database: SurrealDB connection management and repository
//! implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations for the `lms-core` traits
//! - The tenant database provisioner ([`SurrealTenantProvisioner`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod provisioner;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use provisioner::SurrealTenantProvisioner;
pub use schema::{run_migrations, schema_v1};

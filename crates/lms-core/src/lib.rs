//! LMS Core: domain models, the error taxonomy, and the repository
//! and collaborator traits that storage implementations provide.

pub mod error;
pub mod models;
pub mod repository;

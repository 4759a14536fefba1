//! Domain models for the LMS backend.
//!
//! These are the core types shared across all crates.

pub mod course;
pub mod membership;
pub mod rating;
pub mod review;
pub mod tenant;
pub mod user;

//! LMS Service: tenant provisioning, membership invitations and course
//! reviews on top of the `lms-core` repository traits.

pub mod config;
pub mod dto;
pub mod error;
pub mod review;
pub mod tenant;

pub use config::{ReviewConfig, TenantConfig};
pub use error::{ReviewError, ReviewResult};
pub use review::ReviewService;
pub use tenant::{ProvisionTenantRequest, TenantService};

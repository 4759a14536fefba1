//! Tenant domain model.
//!
//! A tenant is an isolated customer context (a school, a company academy)
//! with its own associated database. Tenant records and memberships live
//! in the shared control database; course content lives in the tenant's
//! own data store identified by `database_name`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LmsError;

/// Lifecycle state of a tenant. Transitions are soft; rows are only
/// hard-deleted when rolling back a failed provisioning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
    Deleted,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "Active",
            TenantStatus::Inactive => "Inactive",
            TenantStatus::Suspended => "Suspended",
            TenantStatus::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantStatus {
    type Err = LmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(TenantStatus::Active),
            "Inactive" => Ok(TenantStatus::Inactive),
            "Suspended" => Ok(TenantStatus::Suspended),
            "Deleted" => Ok(TenantStatus::Deleted),
            other => Err(LmsError::validation(format!(
                "unknown tenant status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// Globally unique URL-safe identifier (e.g., `acme-academy`).
    pub slug: String,
    /// Name of the tenant's isolated data store.
    pub database_name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    /// The user who provisioned the tenant.
    pub owner_id: Uuid,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new tenant. The owner receives an
/// active admin membership in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub slug: String,
    pub database_name: String,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
    pub owner_id: Uuid,
}

/// Fields that can be updated on an existing tenant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

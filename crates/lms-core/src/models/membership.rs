//! Tenant membership domain model.
//!
//! A membership binds a user to a tenant with a role and a status.
//! Invitations are memberships in the `Pending` state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LmsError;
use crate::models::tenant::Tenant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MembershipRole {
    Admin,
    Instructor,
    Student,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Admin => "Admin",
            MembershipRole::Instructor => "Instructor",
            MembershipRole::Student => "Student",
        }
    }
}

impl fmt::Display for MembershipRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipRole {
    type Err = LmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(MembershipRole::Admin),
            "Instructor" => Ok(MembershipRole::Instructor),
            "Student" => Ok(MembershipRole::Student),
            other => Err(LmsError::validation(format!(
                "unknown membership role: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MembershipStatus {
    /// Invited, not yet accepted.
    Pending,
    Active,
    Inactive,
    /// Invitation declined.
    Rejected,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "Pending",
            MembershipStatus::Active => "Active",
            MembershipStatus::Inactive => "Inactive",
            MembershipStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipStatus {
    type Err = LmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(MembershipStatus::Pending),
            "Active" => Ok(MembershipStatus::Active),
            "Inactive" => Ok(MembershipStatus::Inactive),
            "Rejected" => Ok(MembershipStatus::Rejected),
            other => Err(LmsError::validation(format!(
                "unknown membership status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantMembership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: MembershipRole,
    pub status: MembershipStatus,
    pub invited_by: Option<Uuid>,
    pub invited_at: Option<DateTime<Utc>>,
    pub joined_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantMembership {
    pub fn is_active_admin(&self) -> bool {
        self.role == MembershipRole::Admin && self.status == MembershipStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: MembershipRole,
    pub status: MembershipStatus,
    pub invited_by: Option<Uuid>,
    pub invited_at: Option<DateTime<Utc>>,
    pub joined_at: Option<DateTime<Utc>>,
}

/// A tenant the user actively belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTenant {
    pub tenant: Tenant,
    pub role: MembershipRole,
    pub joined_at: Option<DateTime<Utc>>,
    /// `true` when the requesting user is the tenant's owner.
    pub is_owner: bool,
}

/// An open invitation, with enough context to render an inbox entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingInvitation {
    pub membership_id: Uuid,
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub role: MembershipRole,
    pub invited_by: Option<Uuid>,
    pub inviter_name: Option<String>,
    pub inviter_email: Option<String>,
    pub invited_at: Option<DateTime<Utc>>,
}

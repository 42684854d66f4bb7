use crate::models::company_members::{CompanyMember, CompanyRole};
use crate::models::companies::Company;
use crate::models::users::User;
use crate::{ApiError, AppState};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

// Response Types
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub company_id: Option<Uuid>,
    pub needs_password_reset: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User, company_uuid: Option<Uuid>) -> Self {
        UserResponse {
            id: user.uuid,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            company_id: company_uuid,
            needs_password_reset: user.needs_password_reset,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub founded: Option<String>,
    pub location: Option<String>,
    pub logo_url: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Company> for CompanyResponse {
    fn from(company: &Company) -> Self {
        CompanyResponse {
            id: company.uuid,
            name: company.name.clone(),
            description: company.description.clone(),
            website: company.website.clone(),
            industry: company.industry.clone(),
            size: company.size.clone(),
            founded: company.founded.clone(),
            location: company.location.clone(),
            logo_url: company.logo_url.clone(),
            owner_id: company.owner_id,
            created_at: company.created_at,
            updated_at: company.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub status: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub invited_by: Option<Uuid>,
}

impl MemberResponse {
    pub fn from_member(member: &CompanyMember, user: &User) -> Self {
        MemberResponse {
            user_id: member.user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: member.role.clone(),
            status: member.status.clone(),
            joined_at: member.joined_at,
            invited_by: member.invited_by,
        }
    }
}

// Validation Functions
pub fn validate_project_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        "active" | "on_hold" | "completed" | "cancelled" => Ok(()),
        _ => Err(validator::ValidationError::new("project_status")),
    }
}

pub fn validate_video_status(status: &str) -> Result<(), validator::ValidationError> {
    match status {
        "uploading" | "processing" | "ready" | "failed" => Ok(()),
        _ => Err(validator::ValidationError::new("video_status")),
    }
}

pub fn default_invite_role() -> CompanyRole {
    CompanyRole::Member
}

/// Maps an internal company reference to its public identifier.
pub fn resolve_company_uuid(
    data: &AppState,
    company_id: Option<i32>,
) -> Result<Option<Uuid>, ApiError> {
    match company_id {
        Some(id) => {
            let company = data.db.get_company_by_id(id).map_err(|e| {
                error!("Failed to resolve company {}: {:?}", id, e);
                ApiError::InternalServerError
            })?;
            Ok(Some(company.uuid))
        }
        None => Ok(None),
    }
}

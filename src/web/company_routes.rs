use crate::access::{can_perform, Action, Target};
use crate::models::companies::NewCompany;
use crate::models::company_members::CompanyRole;
use crate::models::users::User;
use crate::{ApiError, AppState, Error};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;
use validator::Validate;

use super::common::{default_invite_role, CompanyResponse, MemberResponse};
use super::validation::validate_alphanumeric_with_symbols;

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/companies", post(create_company))
        .route("/companies", get(list_companies))
        .route("/companies/:company_id", get(get_company))
        .route("/companies/:company_id", put(update_company))
        .route("/companies/:company_id", delete(delete_company))
        .route("/companies/:company_id/members", get(list_members))
        .route("/companies/:company_id/invite", post(invite_member))
        .with_state(app_state)
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub website: Option<String>,
    #[validate(length(max = 50))]
    pub industry: Option<String>,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub founded: Option<String>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub logo_url: Option<String>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub website: Option<String>,
    #[validate(length(max = 50))]
    pub industry: Option<String>,
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub founded: Option<String>,
    #[validate(length(max = 255))]
    pub location: Option<String>,
    #[validate(url(message = "Invalid URL format"))]
    pub logo_url: Option<String>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct InviteMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email must not exceed 255 characters"))]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: Option<String>,
    #[serde(default = "default_invite_role")]
    pub role: CompanyRole,
}

async fn create_company(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<Json<CompanyResponse>, ApiError> {
    debug!("Entering create_company function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let mut new_company = NewCompany::new(payload.name, user.uuid);
    new_company.description = payload.description;
    new_company.website = payload.website;
    new_company.industry = payload.industry;
    new_company.size = payload.size;
    new_company.founded = payload.founded;
    new_company.location = payload.location;
    new_company.logo_url = payload.logo_url;

    let company = data
        .db
        .create_company_with_owner(new_company)
        .map_err(|e| {
            error!("Failed to create company with owner: {:?}", e);
            ApiError::InternalServerError
        })?;

    // First company becomes the user's home company
    if user.company_id.is_none() {
        data.db
            .set_user_company(&user, Some(company.id))
            .map_err(|e| {
                error!("Failed to set user company: {:?}", e);
                ApiError::InternalServerError
            })?;
    }

    debug!("Exiting create_company function");
    Ok(Json(CompanyResponse::from(&company)))
}

async fn list_companies(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<CompanyResponse>>, ApiError> {
    debug!("Entering list_companies function");

    let companies = data.db.get_companies_for_user(user.uuid).map_err(|e| {
        error!("Failed to list companies: {:?}", e);
        ApiError::InternalServerError
    })?;

    let response = companies.iter().map(CompanyResponse::from).collect();
    debug!("Exiting list_companies function");
    Ok(Json(response))
}

async fn get_company(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<CompanyResponse>, ApiError> {
    debug!("Entering get_company function");

    let company = data
        .db
        .get_company_by_uuid(company_id)
        .map_err(|_| ApiError::NotFound)?;
    let membership = data
        .db
        .get_company_member(company.id, user.uuid)
        .map_err(|e| {
            error!("Failed to load membership: {:?}", e);
            ApiError::InternalServerError
        })?;

    let target = Target::Company {
        company: &company,
        membership: membership.as_ref(),
    };
    if !can_perform(&user, &target, Action::Read) {
        return Err(ApiError::Forbidden);
    }

    debug!("Exiting get_company function");
    Ok(Json(CompanyResponse::from(&company)))
}

async fn update_company(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> Result<Json<CompanyResponse>, ApiError> {
    debug!("Entering update_company function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let company = data
        .db
        .get_company_by_uuid(company_id)
        .map_err(|_| ApiError::NotFound)?;
    let membership = data
        .db
        .get_company_member(company.id, user.uuid)
        .map_err(|e| {
            error!("Failed to load membership: {:?}", e);
            ApiError::InternalServerError
        })?;

    let target = Target::Company {
        company: &company,
        membership: membership.as_ref(),
    };
    if !can_perform(&user, &target, Action::Update) {
        return Err(ApiError::Forbidden);
    }

    let mut updated = company.clone();
    if let Some(name) = payload.name {
        updated.name = name;
    }
    if let Some(description) = payload.description {
        updated.description = Some(description);
    }
    if let Some(website) = payload.website {
        updated.website = Some(website);
    }
    if let Some(industry) = payload.industry {
        updated.industry = Some(industry);
    }
    if let Some(size) = payload.size {
        updated.size = Some(size);
    }
    if let Some(founded) = payload.founded {
        updated.founded = Some(founded);
    }
    if let Some(location) = payload.location {
        updated.location = Some(location);
    }
    if let Some(logo_url) = payload.logo_url {
        updated.logo_url = Some(logo_url);
    }

    data.db.update_company(&updated).map_err(|e| {
        error!("Failed to update company: {:?}", e);
        ApiError::InternalServerError
    })?;

    let company = data
        .db
        .get_company_by_uuid(company_id)
        .map_err(|_| ApiError::NotFound)?;

    debug!("Exiting update_company function");
    Ok(Json(CompanyResponse::from(&company)))
}

async fn delete_company(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering delete_company function");

    let company = data
        .db
        .get_company_by_uuid(company_id)
        .map_err(|_| ApiError::NotFound)?;
    let membership = data
        .db
        .get_company_member(company.id, user.uuid)
        .map_err(|e| {
            error!("Failed to load membership: {:?}", e);
            ApiError::InternalServerError
        })?;

    let target = Target::Company {
        company: &company,
        membership: membership.as_ref(),
    };
    if !can_perform(&user, &target, Action::Delete) {
        return Err(ApiError::Forbidden);
    }

    data.db.delete_company(&company).map_err(|e| {
        error!("Failed to delete company: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting delete_company function");
    Ok(Json(json!({ "message": "Company deleted successfully" })))
}

async fn list_members(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    debug!("Entering list_members function");

    let company = data
        .db
        .get_company_by_uuid(company_id)
        .map_err(|_| ApiError::NotFound)?;
    let membership = data
        .db
        .get_company_member(company.id, user.uuid)
        .map_err(|e| {
            error!("Failed to load membership: {:?}", e);
            ApiError::InternalServerError
        })?;

    let target = Target::Company {
        company: &company,
        membership: membership.as_ref(),
    };
    if !can_perform(&user, &target, Action::Read) {
        return Err(ApiError::Forbidden);
    }

    let members = data
        .db
        .get_company_members_with_users(company.id)
        .map_err(|e| {
            error!("Failed to list members: {:?}", e);
            ApiError::InternalServerError
        })?;

    let response = members
        .iter()
        .map(|(member, member_user)| MemberResponse::from_member(member, member_user))
        .collect();
    debug!("Exiting list_members function");
    Ok(Json(response))
}

async fn invite_member(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<InviteMemberRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering invite_member function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let company = data
        .db
        .get_company_by_uuid(company_id)
        .map_err(|_| ApiError::NotFound)?;

    let outcome = data
        .add_or_invite_member(&company, &user, payload.email, payload.name, payload.role)
        .await
        .map_err(|e| match e {
            Error::InsufficientPrivileges => ApiError::Forbidden,
            Error::AlreadyMember => ApiError::AlreadyMember,
            e => {
                error!("Error inviting member: {:?}", e);
                ApiError::InternalServerError
            }
        })?;

    debug!("Exiting invite_member function");
    Ok(Json(json!({ "type": outcome.as_str() })))
}

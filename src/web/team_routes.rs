use crate::models::company_members::CompanyRole;
use crate::models::users::User;
use crate::{ApiError, AppState, Error};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post, put},
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
        .route("/team", post(add_team_member))
        .route("/team", put(update_team_member))
        .route("/team", delete(remove_team_member))
        .with_state(app_state)
}

#[derive(Deserialize, Clone, Validate)]
pub struct AddTeamMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email must not exceed 255 characters"))]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: Option<String>,
    #[serde(default = "default_invite_role")]
    pub role: CompanyRole,
    pub company_id: Uuid,
}

#[derive(Deserialize, Clone)]
pub struct UpdateTeamMemberRequest {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: CompanyRole,
}

#[derive(Deserialize, Clone)]
pub struct RemoveTeamMemberRequest {
    pub user_id: Uuid,
    pub company_id: Uuid,
}

async fn add_team_member(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<AddTeamMemberRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    debug!("Entering add_team_member function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let company = data
        .db
        .get_company_by_uuid(payload.company_id)
        .map_err(|_| ApiError::NotFound)?;

    data.invite_team_member(&company, &user, payload.email, payload.name, payload.role)
        .await
        .map_err(|e| match e {
            Error::InsufficientPrivileges => ApiError::Forbidden,
            Error::AlreadyMember => ApiError::AlreadyMember,
            e => {
                error!("Error adding team member: {:?}", e);
                ApiError::InternalServerError
            }
        })?;

    debug!("Exiting add_team_member function");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "company": CompanyResponse::from(&company) })),
    ))
}

async fn update_team_member(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateTeamMemberRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering update_team_member function");

    let company = data
        .db
        .get_company_by_uuid(payload.company_id)
        .map_err(|_| ApiError::NotFound)?;

    let member = data
        .update_member_role(&company, &user, payload.user_id, payload.role)
        .await
        .map_err(|e| match e {
            Error::InsufficientPrivileges => ApiError::Forbidden,
            Error::MemberNotFound => ApiError::NotFound,
            Error::CannotModifyOwner => ApiError::BadRequest,
            e => {
                error!("Error updating team member: {:?}", e);
                ApiError::InternalServerError
            }
        })?;

    let target_user = data
        .db
        .get_user_by_uuid(payload.user_id)
        .map_err(|_| ApiError::NotFound)?;

    debug!("Exiting update_team_member function");
    Ok(Json(
        json!({ "member": MemberResponse::from_member(&member, &target_user) }),
    ))
}

async fn remove_team_member(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<RemoveTeamMemberRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering remove_team_member function");

    let company = data
        .db
        .get_company_by_uuid(payload.company_id)
        .map_err(|_| ApiError::NotFound)?;

    data.remove_member(&company, &user, payload.user_id)
        .await
        .map_err(|e| match e {
            Error::InsufficientPrivileges => ApiError::Forbidden,
            Error::MemberNotFound => ApiError::NotFound,
            Error::CannotModifyOwner => ApiError::BadRequest,
            e => {
                error!("Error removing team member: {:?}", e);
                ApiError::InternalServerError
            }
        })?;

    debug!("Exiting remove_team_member function");
    Ok(Json(json!({ "message": "Member removed successfully" })))
}

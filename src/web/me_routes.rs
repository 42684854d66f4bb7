use crate::models::users::User;
use crate::{ApiError, AppState};
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};
use validator::Validate;

use super::common::{resolve_company_uuid, UserResponse};
use super::validation::validate_alphanumeric_with_symbols;

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me", put(update_me))
        .with_state(app_state)
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: String,
}

async fn get_me(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<UserResponse>, ApiError> {
    debug!("Entering get_me function");

    let company_uuid = resolve_company_uuid(&data, user.company_id)?;
    debug!("Exiting get_me function");
    Ok(Json(UserResponse::from_user(&user, company_uuid)))
}

async fn update_me(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    debug!("Entering update_me function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let mut updated = user.clone();
    updated.name = Some(payload.name);
    data.db.update_user(&updated).map_err(|e| {
        error!("Failed to update user: {:?}", e);
        ApiError::InternalServerError
    })?;

    // Reload so the response carries the stored timestamps
    let user = data.db.get_user_by_uuid(user.uuid).map_err(|e| {
        error!("Failed to reload user: {:?}", e);
        ApiError::InternalServerError
    })?;

    let company_uuid = resolve_company_uuid(&data, user.company_id)?;
    debug!("Exiting update_me function");
    Ok(Json(UserResponse::from_user(&user, company_uuid)))
}

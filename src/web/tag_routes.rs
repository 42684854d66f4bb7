use crate::models::tags::{NewTag, Tag};
use crate::models::users::User;
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;
use validator::Validate;

use super::common::resolve_company_uuid;
use super::validation::{validate_alphanumeric_with_symbols, validate_hex_color};

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/tags", post(create_tag))
        .route("/tags", get(list_tags))
        .route("/tags/:tag_id", put(update_tag))
        .route("/tags/:tag_id", delete(delete_tag))
        .with_state(app_state)
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateTagRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: String,
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    pub company_id: Option<Uuid>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateTagRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagResponse {
    fn from_tag(tag: &Tag, company_uuid: Option<Uuid>) -> Self {
        TagResponse {
            id: tag.uuid,
            name: tag.name.clone(),
            color: tag.color.clone(),
            description: tag.description.clone(),
            created_by: tag.created_by,
            company_id: company_uuid,
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        }
    }
}

fn tag_editable_by(user: &User, tag: &Tag) -> bool {
    tag.created_by == user.uuid || (tag.company_id.is_some() && tag.company_id == user.company_id)
}

async fn create_tag(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    debug!("Entering create_tag function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    // A company-scoped tag is only valid inside the caller's own company
    let scope_company_id = match payload.company_id {
        Some(company_uuid) => {
            let company = data
                .db
                .get_company_by_uuid(company_uuid)
                .map_err(|_| ApiError::NotFound)?;
            if user.company_id != Some(company.id) {
                return Err(ApiError::Forbidden);
            }
            Some(company.id)
        }
        None => None,
    };

    let existing = data
        .db
        .find_tag_in_scope(&payload.name, scope_company_id, user.uuid)
        .map_err(|e| {
            error!("Failed to check tag name: {:?}", e);
            ApiError::InternalServerError
        })?;
    if existing.is_some() {
        return Err(ApiError::DuplicateTagName);
    }

    let mut new_tag = NewTag::new(payload.name, user.uuid);
    new_tag.color = payload.color;
    new_tag.description = payload.description;
    new_tag.company_id = scope_company_id;

    let tag = data.db.create_tag(new_tag).map_err(|e| {
        error!("Failed to create tag: {:?}", e);
        ApiError::InternalServerError
    })?;

    let company_uuid = resolve_company_uuid(&data, tag.company_id)?;
    debug!("Exiting create_tag function");
    Ok(Json(TagResponse::from_tag(&tag, company_uuid)))
}

async fn list_tags(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    debug!("Entering list_tags function");

    let tags = data
        .db
        .get_tags_for_user(user.uuid, user.company_id)
        .map_err(|e| {
            error!("Failed to list tags: {:?}", e);
            ApiError::InternalServerError
        })?;

    let mut response = Vec::with_capacity(tags.len());
    for tag in &tags {
        let company_uuid = resolve_company_uuid(&data, tag.company_id)?;
        response.push(TagResponse::from_tag(tag, company_uuid));
    }
    debug!("Exiting list_tags function");
    Ok(Json(response))
}

async fn update_tag(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(tag_id): Path<Uuid>,
    Json(payload): Json<UpdateTagRequest>,
) -> Result<Json<TagResponse>, ApiError> {
    debug!("Entering update_tag function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let tag = data
        .db
        .get_tag_by_uuid(tag_id)
        .map_err(|_| ApiError::NotFound)?;
    if !tag_editable_by(&user, &tag) {
        return Err(ApiError::Forbidden);
    }

    if let Some(ref name) = payload.name {
        let existing = data
            .db
            .find_tag_in_scope(name, tag.company_id, user.uuid)
            .map_err(|e| {
                error!("Failed to check tag name: {:?}", e);
                ApiError::InternalServerError
            })?;
        if existing.map(|t| t.id != tag.id).unwrap_or(false) {
            return Err(ApiError::DuplicateTagName);
        }
    }

    let mut updated = tag.clone();
    if let Some(name) = payload.name {
        updated.name = name;
    }
    if let Some(color) = payload.color {
        updated.color = Some(color);
    }
    if let Some(description) = payload.description {
        updated.description = Some(description);
    }

    data.db.update_tag(&updated).map_err(|e| {
        error!("Failed to update tag: {:?}", e);
        ApiError::InternalServerError
    })?;

    let tag = data
        .db
        .get_tag_by_uuid(tag_id)
        .map_err(|_| ApiError::NotFound)?;
    let company_uuid = resolve_company_uuid(&data, tag.company_id)?;
    debug!("Exiting update_tag function");
    Ok(Json(TagResponse::from_tag(&tag, company_uuid)))
}

async fn delete_tag(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(tag_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering delete_tag function");

    let tag = data
        .db
        .get_tag_by_uuid(tag_id)
        .map_err(|_| ApiError::NotFound)?;
    if !tag_editable_by(&user, &tag) {
        return Err(ApiError::Forbidden);
    }

    data.db.delete_tag(&tag).map_err(|e| {
        error!("Failed to delete tag: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting delete_tag function");
    Ok(Json(json!({ "message": "Tag deleted successfully" })))
}

use crate::access::{can_perform, Action, Target};
use crate::models::users::User;
use crate::models::videos::{Clip, Comment, NewVideo, Resource, Short, Thumbnail, Version, Video};
use crate::{ApiError, AppState};
use axum::{
    extract::{Path, Query, State},
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

use super::common::{resolve_company_uuid, validate_video_status};

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/videos", post(create_video))
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video))
        .route("/videos/:video_id", put(update_video))
        .route("/videos/:video_id", delete(delete_video))
        .route("/videos/:video_id/clips", post(create_clip))
        .route("/videos/:video_id/clips/:clip_id", put(update_clip))
        .route("/videos/:video_id/clips/:clip_id", delete(delete_clip))
        .route("/videos/:video_id/clips/:clip_id/vote", post(vote_clip))
        .route("/videos/:video_id/thumbnails", post(create_thumbnail))
        .route(
            "/videos/:video_id/thumbnails/:thumbnail_id",
            delete(delete_thumbnail),
        )
        .route(
            "/videos/:video_id/thumbnails/:thumbnail_id/select",
            put(select_thumbnail),
        )
        .route("/videos/:video_id/shorts", post(create_short))
        .route("/videos/:video_id/shorts/:short_id", put(update_short))
        .route("/videos/:video_id/shorts/:short_id", delete(delete_short))
        .route("/videos/:video_id/shorts/:short_id/vote", post(vote_short))
        .route("/videos/:video_id/versions", post(create_version))
        .route(
            "/videos/:video_id/versions/:version_id",
            delete(delete_version),
        )
        .route(
            "/videos/:video_id/versions/:version_id/final",
            put(finalize_version),
        )
        .route("/videos/:video_id/comments", post(create_comment))
        .route("/videos/:video_id/comments/:comment_id", put(update_comment))
        .route(
            "/videos/:video_id/comments/:comment_id",
            delete(delete_comment),
        )
        .route("/videos/:video_id/resources", post(create_resource))
        .route(
            "/videos/:video_id/resources/:resource_id",
            delete(delete_resource),
        )
        .with_state(app_state)
}

#[derive(Deserialize)]
pub struct ListVideosQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 255))]
    pub storage_key: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    #[validate(custom(function = "validate_video_status"))]
    pub status: Option<String>,
    pub project_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 255))]
    pub storage_key: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    #[validate(custom(function = "validate_video_status"))]
    pub status: Option<String>,
    pub project_id: Option<Uuid>,
    pub is_public: Option<bool>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateClipRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(range(min = 0.0))]
    pub start_secs: f64,
    #[validate(range(min = 0.0))]
    pub end_secs: f64,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateClipRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(range(min = 0.0))]
    pub start_secs: Option<f64>,
    #[validate(range(min = 0.0))]
    pub end_secs: Option<f64>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateThumbnailRequest {
    #[validate(url)]
    pub url: String,
    #[validate(range(min = 0.0))]
    pub time_secs: Option<f64>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateShortRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(url)]
    pub url: Option<String>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateShortRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    #[validate(length(max = 50))]
    pub status: Option<String>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateVersionRequest {
    #[validate(length(max = 255))]
    pub storage_key: Option<String>,
    #[validate(url)]
    pub url: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
    #[validate(range(min = 0.0))]
    pub time_secs: Option<f64>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, max = 2000))]
    pub body: String,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[validate(length(max = 50))]
    pub kind: Option<String>,
}

#[derive(Serialize)]
pub struct VideoResponse {
    pub id: Uuid,
    pub title: String,
    pub storage_key: Option<String>,
    pub url: Option<String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    pub status: String,
    pub project_id: Option<Uuid>,
    pub uploaded_by: Uuid,
    pub company_id: Option<Uuid>,
    pub is_public: bool,
    pub tags: Vec<String>,
    pub clips: Vec<Clip>,
    pub thumbnails: Vec<Thumbnail>,
    pub shorts: Vec<Short>,
    pub versions: Vec<Version>,
    pub comments: Vec<Comment>,
    pub resources: Vec<Resource>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoResponse {
    fn from_video(data: &AppState, video: &Video) -> Result<Self, ApiError> {
        let project_uuid = match video.project_id {
            Some(project_id) => {
                let project = data.db.get_project_by_id(project_id).map_err(|e| {
                    error!("Failed to resolve project {}: {:?}", project_id, e);
                    ApiError::InternalServerError
                })?;
                Some(project.uuid)
            }
            None => None,
        };
        let company_uuid = resolve_company_uuid(data, video.company_id)?;

        let tags = video.tag_names().map_err(|e| {
            error!("Failed to parse video tags: {:?}", e);
            ApiError::InternalServerError
        })?;
        let clips = video.clips().map_err(|e| {
            error!("Failed to parse video clips: {:?}", e);
            ApiError::InternalServerError
        })?;
        let thumbnails = video.thumbnails().map_err(|e| {
            error!("Failed to parse video thumbnails: {:?}", e);
            ApiError::InternalServerError
        })?;
        let shorts = video.shorts().map_err(|e| {
            error!("Failed to parse video shorts: {:?}", e);
            ApiError::InternalServerError
        })?;
        let versions = video.versions().map_err(|e| {
            error!("Failed to parse video versions: {:?}", e);
            ApiError::InternalServerError
        })?;
        let comments = video.comments().map_err(|e| {
            error!("Failed to parse video comments: {:?}", e);
            ApiError::InternalServerError
        })?;
        let resources = video.resources().map_err(|e| {
            error!("Failed to parse video resources: {:?}", e);
            ApiError::InternalServerError
        })?;

        Ok(VideoResponse {
            id: video.uuid,
            title: video.title.clone(),
            storage_key: video.storage_key.clone(),
            url: video.url.clone(),
            duration_secs: video.duration_secs,
            size_bytes: video.size_bytes,
            status: video.status.clone(),
            project_id: project_uuid,
            uploaded_by: video.uploaded_by,
            company_id: company_uuid,
            is_public: video.is_public,
            tags,
            clips,
            thumbnails,
            shorts,
            versions,
            comments,
            resources,
            created_at: video.created_at,
            updated_at: video.updated_at,
        })
    }
}

/// Loads the video and checks the action against the acting user.
fn load_video_for(
    data: &AppState,
    user: &User,
    video_id: Uuid,
    action: Action,
) -> Result<Video, ApiError> {
    let video = data
        .db
        .get_video_by_uuid(video_id)
        .map_err(|_| ApiError::NotFound)?;

    if !can_perform(user, &Target::Video(&video), action) {
        return Err(ApiError::Forbidden);
    }
    Ok(video)
}

fn reload_response(data: &AppState, video_id: Uuid) -> Result<Json<VideoResponse>, ApiError> {
    let video = data
        .db
        .get_video_by_uuid(video_id)
        .map_err(|_| ApiError::NotFound)?;
    let response = VideoResponse::from_video(data, &video)?;
    Ok(Json(response))
}

async fn create_video(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateVideoRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering create_video function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let mut new_video = NewVideo::new(payload.title, user.uuid);
    new_video.company_id = user.company_id;
    new_video.storage_key = payload.storage_key;
    new_video.url = payload.url;
    new_video.duration_secs = payload.duration_secs;
    new_video.size_bytes = payload.size_bytes;
    if let Some(status) = payload.status {
        new_video.status = status;
    }
    if let Some(is_public) = payload.is_public {
        new_video.is_public = is_public;
    }
    if let Some(project_uuid) = payload.project_id {
        let project = data
            .db
            .get_project_by_uuid(project_uuid)
            .map_err(|_| ApiError::NotFound)?;
        if !can_perform(&user, &Target::Project(&project), Action::Read) {
            return Err(ApiError::Forbidden);
        }
        new_video.project_id = Some(project.id);
    }
    if let Some(tags) = payload.tags {
        new_video.tags = serde_json::to_value(tags).map_err(|e| {
            error!("Failed to serialize video tags: {:?}", e);
            ApiError::InternalServerError
        })?;
    }

    let video = data.db.create_video(new_video).map_err(|e| {
        error!("Failed to create video: {:?}", e);
        ApiError::InternalServerError
    })?;

    let response = VideoResponse::from_video(&data, &video)?;
    debug!("Exiting create_video function");
    Ok(Json(response))
}

async fn list_videos(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Query(query): Query<ListVideosQuery>,
) -> Result<Json<Vec<VideoResponse>>, ApiError> {
    debug!("Entering list_videos function");

    let videos = match query.project_id {
        Some(project_uuid) => {
            let project = data
                .db
                .get_project_by_uuid(project_uuid)
                .map_err(|_| ApiError::NotFound)?;
            if !can_perform(&user, &Target::Project(&project), Action::Read) {
                return Err(ApiError::Forbidden);
            }
            data.db.get_videos_for_project(project.id).map_err(|e| {
                error!("Failed to list project videos: {:?}", e);
                ApiError::InternalServerError
            })?
        }
        None => data
            .db
            .get_videos_for_user(user.uuid, user.company_id)
            .map_err(|e| {
                error!("Failed to list videos: {:?}", e);
                ApiError::InternalServerError
            })?,
    };

    let mut response = Vec::with_capacity(videos.len());
    for video in &videos {
        response.push(VideoResponse::from_video(&data, video)?);
    }
    debug!("Exiting list_videos function");
    Ok(Json(response))
}

async fn get_video(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering get_video function");

    let video = load_video_for(&data, &user, video_id, Action::Read)?;
    let response = VideoResponse::from_video(&data, &video)?;
    debug!("Exiting get_video function");
    Ok(Json(response))
}

async fn update_video(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<UpdateVideoRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering update_video function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut updated = video.clone();
    if let Some(title) = payload.title {
        updated.title = title;
    }
    if let Some(storage_key) = payload.storage_key {
        updated.storage_key = Some(storage_key);
    }
    if let Some(url) = payload.url {
        updated.url = Some(url);
    }
    if let Some(duration_secs) = payload.duration_secs {
        updated.duration_secs = Some(duration_secs);
    }
    if let Some(size_bytes) = payload.size_bytes {
        updated.size_bytes = Some(size_bytes);
    }
    if let Some(status) = payload.status {
        updated.status = status;
    }
    if let Some(is_public) = payload.is_public {
        updated.is_public = is_public;
    }
    if let Some(project_uuid) = payload.project_id {
        let project = data
            .db
            .get_project_by_uuid(project_uuid)
            .map_err(|_| ApiError::NotFound)?;
        if !can_perform(&user, &Target::Project(&project), Action::Read) {
            return Err(ApiError::Forbidden);
        }
        updated.project_id = Some(project.id);
    }

    data.db.update_video(&updated).map_err(|e| {
        error!("Failed to update video: {:?}", e);
        ApiError::InternalServerError
    })?;

    if let Some(tags) = payload.tags {
        data.db
            .update_video_tag_names(&video, &tags)
            .map_err(|e| {
                error!("Failed to update video tags: {:?}", e);
                ApiError::InternalServerError
            })?;
    }

    debug!("Exiting update_video function");
    reload_response(&data, video_id)
}

async fn delete_video(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering delete_video function");

    let video = load_video_for(&data, &user, video_id, Action::Delete)?;

    data.db.delete_video(&video).map_err(|e| {
        error!("Failed to delete video: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting delete_video function");
    Ok(Json(json!({ "message": "Video deleted successfully" })))
}

async fn create_clip(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<CreateClipRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering create_clip function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }
    if payload.end_secs <= payload.start_secs {
        error!("Clip must end after it starts");
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut clips = video.clips().map_err(|e| {
        error!("Failed to parse video clips: {:?}", e);
        ApiError::InternalServerError
    })?;
    clips.push(Clip::new(
        payload.title,
        payload.start_secs,
        payload.end_secs,
        user.uuid,
    ));

    data.db.update_video_clips(&video, &clips).map_err(|e| {
        error!("Failed to update video clips: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting create_clip function");
    reload_response(&data, video_id)
}

async fn update_clip(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, clip_id)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateClipRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering update_clip function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut clips = video.clips().map_err(|e| {
        error!("Failed to parse video clips: {:?}", e);
        ApiError::InternalServerError
    })?;

    let clip = clips
        .iter_mut()
        .find(|c| c.id == clip_id)
        .ok_or(ApiError::NotFound)?;
    if let Some(title) = payload.title {
        clip.title = title;
    }
    if let Some(start_secs) = payload.start_secs {
        clip.start_secs = start_secs;
    }
    if let Some(end_secs) = payload.end_secs {
        clip.end_secs = end_secs;
    }
    if clip.end_secs <= clip.start_secs {
        error!("Clip must end after it starts");
        return Err(ApiError::BadRequest);
    }

    data.db.update_video_clips(&video, &clips).map_err(|e| {
        error!("Failed to update video clips: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting update_clip function");
    reload_response(&data, video_id)
}

async fn delete_clip(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, clip_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering delete_clip function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut clips = video.clips().map_err(|e| {
        error!("Failed to parse video clips: {:?}", e);
        ApiError::InternalServerError
    })?;

    let before = clips.len();
    clips.retain(|c| c.id != clip_id);
    if clips.len() == before {
        return Err(ApiError::NotFound);
    }

    data.db.update_video_clips(&video, &clips).map_err(|e| {
        error!("Failed to update video clips: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting delete_clip function");
    reload_response(&data, video_id)
}

async fn vote_clip(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, clip_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering vote_clip function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut clips = video.clips().map_err(|e| {
        error!("Failed to parse video clips: {:?}", e);
        ApiError::InternalServerError
    })?;

    let clip = clips
        .iter_mut()
        .find(|c| c.id == clip_id)
        .ok_or(ApiError::NotFound)?;
    clip.toggle_vote(user.uuid);

    data.db.update_video_clips(&video, &clips).map_err(|e| {
        error!("Failed to update video clips: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting vote_clip function");
    reload_response(&data, video_id)
}

async fn create_thumbnail(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<CreateThumbnailRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering create_thumbnail function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut thumbnails = video.thumbnails().map_err(|e| {
        error!("Failed to parse video thumbnails: {:?}", e);
        ApiError::InternalServerError
    })?;

    let mut thumbnail = Thumbnail::new(payload.url, user.uuid);
    thumbnail.time_secs = payload.time_secs;
    thumbnails.push(thumbnail);

    data.db
        .update_video_thumbnails(&video, &thumbnails)
        .map_err(|e| {
            error!("Failed to update video thumbnails: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting create_thumbnail function");
    reload_response(&data, video_id)
}

async fn delete_thumbnail(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, thumbnail_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering delete_thumbnail function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut thumbnails = video.thumbnails().map_err(|e| {
        error!("Failed to parse video thumbnails: {:?}", e);
        ApiError::InternalServerError
    })?;

    let before = thumbnails.len();
    thumbnails.retain(|t| t.id != thumbnail_id);
    if thumbnails.len() == before {
        return Err(ApiError::NotFound);
    }

    data.db
        .update_video_thumbnails(&video, &thumbnails)
        .map_err(|e| {
            error!("Failed to update video thumbnails: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting delete_thumbnail function");
    reload_response(&data, video_id)
}

async fn select_thumbnail(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, thumbnail_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering select_thumbnail function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut thumbnails = video.thumbnails().map_err(|e| {
        error!("Failed to parse video thumbnails: {:?}", e);
        ApiError::InternalServerError
    })?;

    if !thumbnails.iter().any(|t| t.id == thumbnail_id) {
        return Err(ApiError::NotFound);
    }
    // Selection is exclusive, so every other thumbnail is cleared
    for thumbnail in &mut thumbnails {
        thumbnail.selected = thumbnail.id == thumbnail_id;
    }

    data.db
        .update_video_thumbnails(&video, &thumbnails)
        .map_err(|e| {
            error!("Failed to update video thumbnails: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting select_thumbnail function");
    reload_response(&data, video_id)
}

async fn create_short(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<CreateShortRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering create_short function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut shorts = video.shorts().map_err(|e| {
        error!("Failed to parse video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    let mut short = Short::new(payload.title, user.uuid);
    short.url = payload.url;
    shorts.push(short);

    data.db.update_video_shorts(&video, &shorts).map_err(|e| {
        error!("Failed to update video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting create_short function");
    reload_response(&data, video_id)
}

async fn update_short(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, short_id)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateShortRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering update_short function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut shorts = video.shorts().map_err(|e| {
        error!("Failed to parse video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    let short = shorts
        .iter_mut()
        .find(|s| s.id == short_id)
        .ok_or(ApiError::NotFound)?;
    if let Some(title) = payload.title {
        short.title = title;
    }
    if let Some(url) = payload.url {
        short.url = Some(url);
    }
    if let Some(status) = payload.status {
        short.status = status;
    }

    data.db.update_video_shorts(&video, &shorts).map_err(|e| {
        error!("Failed to update video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting update_short function");
    reload_response(&data, video_id)
}

async fn delete_short(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, short_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering delete_short function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut shorts = video.shorts().map_err(|e| {
        error!("Failed to parse video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    let before = shorts.len();
    shorts.retain(|s| s.id != short_id);
    if shorts.len() == before {
        return Err(ApiError::NotFound);
    }

    data.db.update_video_shorts(&video, &shorts).map_err(|e| {
        error!("Failed to update video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting delete_short function");
    reload_response(&data, video_id)
}

async fn vote_short(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, short_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering vote_short function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut shorts = video.shorts().map_err(|e| {
        error!("Failed to parse video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    let short = shorts
        .iter_mut()
        .find(|s| s.id == short_id)
        .ok_or(ApiError::NotFound)?;
    short.toggle_vote(user.uuid);

    data.db.update_video_shorts(&video, &shorts).map_err(|e| {
        error!("Failed to update video shorts: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting vote_short function");
    reload_response(&data, video_id)
}

async fn create_version(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<CreateVersionRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering create_version function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut versions = video.versions().map_err(|e| {
        error!("Failed to parse video versions: {:?}", e);
        ApiError::InternalServerError
    })?;

    let next_number = versions
        .iter()
        .map(|v| v.version_number)
        .max()
        .unwrap_or(0)
        + 1;
    let mut version = Version::new(next_number, user.uuid);
    version.storage_key = payload.storage_key;
    version.url = payload.url;
    version.notes = payload.notes;
    versions.push(version);

    data.db
        .update_video_versions(&video, &versions)
        .map_err(|e| {
            error!("Failed to update video versions: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting create_version function");
    reload_response(&data, video_id)
}

async fn delete_version(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, version_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering delete_version function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut versions = video.versions().map_err(|e| {
        error!("Failed to parse video versions: {:?}", e);
        ApiError::InternalServerError
    })?;

    let before = versions.len();
    versions.retain(|v| v.id != version_id);
    if versions.len() == before {
        return Err(ApiError::NotFound);
    }

    data.db
        .update_video_versions(&video, &versions)
        .map_err(|e| {
            error!("Failed to update video versions: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting delete_version function");
    reload_response(&data, video_id)
}

async fn finalize_version(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, version_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering finalize_version function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut versions = video.versions().map_err(|e| {
        error!("Failed to parse video versions: {:?}", e);
        ApiError::InternalServerError
    })?;

    if !versions.iter().any(|v| v.id == version_id) {
        return Err(ApiError::NotFound);
    }
    // At most one version carries the final flag
    for version in &mut versions {
        version.is_final = version.id == version_id;
    }

    data.db
        .update_video_versions(&video, &versions)
        .map_err(|e| {
            error!("Failed to update video versions: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting finalize_version function");
    reload_response(&data, video_id)
}

async fn create_comment(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering create_comment function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    // Anyone who can watch the video can leave a comment
    let video = load_video_for(&data, &user, video_id, Action::Read)?;

    let mut comments = video.comments().map_err(|e| {
        error!("Failed to parse video comments: {:?}", e);
        ApiError::InternalServerError
    })?;

    let mut comment = Comment::new(user.uuid, payload.body);
    comment.time_secs = payload.time_secs;
    comments.push(comment);

    data.db
        .update_video_comments(&video, &comments)
        .map_err(|e| {
            error!("Failed to update video comments: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting create_comment function");
    reload_response(&data, video_id)
}

async fn update_comment(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, comment_id)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering update_comment function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Read)?;

    let mut comments = video.comments().map_err(|e| {
        error!("Failed to parse video comments: {:?}", e);
        ApiError::InternalServerError
    })?;

    let comment = comments
        .iter_mut()
        .find(|c| c.id == comment_id)
        .ok_or(ApiError::NotFound)?;
    if comment.author_id != user.uuid {
        return Err(ApiError::Forbidden);
    }
    comment.body = payload.body;
    comment.edited = true;

    data.db
        .update_video_comments(&video, &comments)
        .map_err(|e| {
            error!("Failed to update video comments: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting update_comment function");
    reload_response(&data, video_id)
}

async fn delete_comment(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, comment_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering delete_comment function");

    let video = load_video_for(&data, &user, video_id, Action::Read)?;

    let mut comments = video.comments().map_err(|e| {
        error!("Failed to parse video comments: {:?}", e);
        ApiError::InternalServerError
    })?;

    // The author can retract their comment; the uploader moderates the rest
    let authorized = comments
        .iter()
        .find(|c| c.id == comment_id)
        .map(|c| c.author_id == user.uuid || video.uploaded_by == user.uuid)
        .ok_or(ApiError::NotFound)?;
    if !authorized {
        return Err(ApiError::Forbidden);
    }
    comments.retain(|c| c.id != comment_id);

    data.db
        .update_video_comments(&video, &comments)
        .map_err(|e| {
            error!("Failed to update video comments: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting delete_comment function");
    reload_response(&data, video_id)
}

async fn create_resource(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(video_id): Path<Uuid>,
    Json(payload): Json<CreateResourceRequest>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering create_resource function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut resources = video.resources().map_err(|e| {
        error!("Failed to parse video resources: {:?}", e);
        ApiError::InternalServerError
    })?;

    let mut resource = Resource::new(payload.name, payload.url, user.uuid);
    resource.kind = payload.kind;
    resources.push(resource);

    data.db
        .update_video_resources(&video, &resources)
        .map_err(|e| {
            error!("Failed to update video resources: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting create_resource function");
    reload_response(&data, video_id)
}

async fn delete_resource(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((video_id, resource_id)): Path<(Uuid, String)>,
) -> Result<Json<VideoResponse>, ApiError> {
    debug!("Entering delete_resource function");

    let video = load_video_for(&data, &user, video_id, Action::Update)?;

    let mut resources = video.resources().map_err(|e| {
        error!("Failed to parse video resources: {:?}", e);
        ApiError::InternalServerError
    })?;

    let before = resources.len();
    resources.retain(|r| r.id != resource_id);
    if resources.len() == before {
        return Err(ApiError::NotFound);
    }

    data.db
        .update_video_resources(&video, &resources)
        .map_err(|e| {
            error!("Failed to update video resources: {:?}", e);
            ApiError::InternalServerError
        })?;

    debug!("Exiting delete_resource function");
    reload_response(&data, video_id)
}

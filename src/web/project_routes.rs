use crate::access::{can_perform, Action, Target};
use crate::models::projects::{NewProject, Project, Task};
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

use super::common::{resolve_company_uuid, validate_project_status};
use super::validation::validate_alphanumeric_with_symbols;

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/projects", post(create_project))
        .route("/projects", get(list_projects))
        .route("/projects/:project_id", get(get_project))
        .route("/projects/:project_id", put(update_project))
        .route("/projects/:project_id", delete(delete_project))
        .route("/projects/:project_id/tasks", post(create_task))
        .route("/projects/:project_id/tasks/:task_id", put(update_task))
        .route("/projects/:project_id/tasks/:task_id", delete(delete_task))
        .with_state(app_state)
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_project_status"))]
    pub status: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub progress: Option<i32>,
    pub team: Option<Vec<Uuid>>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_project_status"))]
    pub status: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub progress: Option<i32>,
    pub team: Option<Vec<Uuid>>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 50))]
    pub status: Option<String>,
    pub assignee: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Clone, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 50))]
    pub status: Option<String>,
    pub assignee: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub progress: i32,
    pub owner_id: Uuid,
    pub company_id: Option<Uuid>,
    pub team: Vec<Uuid>,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectResponse {
    fn from_project(project: &Project, company_uuid: Option<Uuid>) -> Result<Self, ApiError> {
        let team = project.team().map_err(|e| {
            error!("Failed to parse project team: {:?}", e);
            ApiError::InternalServerError
        })?;
        let tasks = project.tasks().map_err(|e| {
            error!("Failed to parse project tasks: {:?}", e);
            ApiError::InternalServerError
        })?;
        Ok(ProjectResponse {
            id: project.uuid,
            name: project.name.clone(),
            description: project.description.clone(),
            status: project.status.clone(),
            progress: project.progress,
            owner_id: project.owner_id,
            company_id: company_uuid,
            team,
            tasks,
            created_at: project.created_at,
            updated_at: project.updated_at,
        })
    }
}

/// Loads the project and checks the action against the acting user.
fn load_project_for(
    data: &AppState,
    user: &User,
    project_id: Uuid,
    action: Action,
) -> Result<Project, ApiError> {
    let project = data
        .db
        .get_project_by_uuid(project_id)
        .map_err(|_| ApiError::NotFound)?;

    if !can_perform(user, &Target::Project(&project), action) {
        return Err(ApiError::Forbidden);
    }
    Ok(project)
}

async fn create_project(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    debug!("Entering create_project function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let mut new_project = NewProject::new(payload.name, user.uuid);
    new_project.company_id = user.company_id;
    new_project.description = payload.description;
    if let Some(status) = payload.status {
        new_project.status = status;
    }
    if let Some(progress) = payload.progress {
        new_project.progress = progress;
    }
    if let Some(team) = payload.team {
        new_project.team = serde_json::to_value(team).map_err(|e| {
            error!("Failed to serialize project team: {:?}", e);
            ApiError::InternalServerError
        })?;
    }

    let project = data.db.create_project(new_project).map_err(|e| {
        error!("Failed to create project: {:?}", e);
        ApiError::InternalServerError
    })?;

    let company_uuid = resolve_company_uuid(&data, project.company_id)?;
    let response = ProjectResponse::from_project(&project, company_uuid)?;
    debug!("Exiting create_project function");
    Ok(Json(response))
}

async fn list_projects(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<ProjectResponse>>, ApiError> {
    debug!("Entering list_projects function");

    let projects = data
        .db
        .get_projects_for_user(user.uuid, user.company_id)
        .map_err(|e| {
            error!("Failed to list projects: {:?}", e);
            ApiError::InternalServerError
        })?;

    let mut response = Vec::with_capacity(projects.len());
    for project in &projects {
        let company_uuid = resolve_company_uuid(&data, project.company_id)?;
        response.push(ProjectResponse::from_project(project, company_uuid)?);
    }
    debug!("Exiting list_projects function");
    Ok(Json(response))
}

async fn get_project(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ProjectResponse>, ApiError> {
    debug!("Entering get_project function");

    let project = load_project_for(&data, &user, project_id, Action::Read)?;
    let company_uuid = resolve_company_uuid(&data, project.company_id)?;
    let response = ProjectResponse::from_project(&project, company_uuid)?;
    debug!("Exiting get_project function");
    Ok(Json(response))
}

async fn update_project(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    debug!("Entering update_project function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let project = load_project_for(&data, &user, project_id, Action::Update)?;

    let mut updated = project.clone();
    if let Some(name) = payload.name {
        updated.name = name;
    }
    if let Some(description) = payload.description {
        updated.description = Some(description);
    }
    if let Some(status) = payload.status {
        updated.status = status;
    }
    if let Some(progress) = payload.progress {
        updated.progress = progress;
    }

    data.db.update_project(&updated).map_err(|e| {
        error!("Failed to update project: {:?}", e);
        ApiError::InternalServerError
    })?;

    if let Some(team) = payload.team {
        data.db.update_project_team(&project, &team).map_err(|e| {
            error!("Failed to update project team: {:?}", e);
            ApiError::InternalServerError
        })?;
    }

    let project = data
        .db
        .get_project_by_uuid(project_id)
        .map_err(|_| ApiError::NotFound)?;
    let company_uuid = resolve_company_uuid(&data, project.company_id)?;
    let response = ProjectResponse::from_project(&project, company_uuid)?;
    debug!("Exiting update_project function");
    Ok(Json(response))
}

async fn delete_project(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering delete_project function");

    let project = load_project_for(&data, &user, project_id, Action::Delete)?;

    data.db.delete_project(&project).map_err(|e| {
        error!("Failed to delete project: {:?}", e);
        ApiError::InternalServerError
    })?;

    debug!("Exiting delete_project function");
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

async fn create_task(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    debug!("Entering create_task function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let project = load_project_for(&data, &user, project_id, Action::Update)?;

    let mut tasks = project.tasks().map_err(|e| {
        error!("Failed to parse project tasks: {:?}", e);
        ApiError::InternalServerError
    })?;

    let mut task = Task::new(payload.title);
    if let Some(status) = payload.status {
        task.status = status;
    }
    task.assignee = payload.assignee;
    task.due_date = payload.due_date;
    tasks.push(task);

    data.db.update_project_tasks(&project, &tasks).map_err(|e| {
        error!("Failed to update project tasks: {:?}", e);
        ApiError::InternalServerError
    })?;

    let project = data
        .db
        .get_project_by_uuid(project_id)
        .map_err(|_| ApiError::NotFound)?;
    let company_uuid = resolve_company_uuid(&data, project.company_id)?;
    let response = ProjectResponse::from_project(&project, company_uuid)?;
    debug!("Exiting create_task function");
    Ok(Json(response))
}

async fn update_task(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((project_id, task_id)): Path<(Uuid, String)>,
    Json(payload): Json<UpdateTaskRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    debug!("Entering update_task function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let project = load_project_for(&data, &user, project_id, Action::Update)?;

    let mut tasks = project.tasks().map_err(|e| {
        error!("Failed to parse project tasks: {:?}", e);
        ApiError::InternalServerError
    })?;

    let task = tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or(ApiError::NotFound)?;
    if let Some(title) = payload.title {
        task.title = title;
    }
    if let Some(status) = payload.status {
        task.status = status;
    }
    if let Some(assignee) = payload.assignee {
        task.assignee = Some(assignee);
    }
    if let Some(due_date) = payload.due_date {
        task.due_date = Some(due_date);
    }

    data.db.update_project_tasks(&project, &tasks).map_err(|e| {
        error!("Failed to update project tasks: {:?}", e);
        ApiError::InternalServerError
    })?;

    let project = data
        .db
        .get_project_by_uuid(project_id)
        .map_err(|_| ApiError::NotFound)?;
    let company_uuid = resolve_company_uuid(&data, project.company_id)?;
    let response = ProjectResponse::from_project(&project, company_uuid)?;
    debug!("Exiting update_task function");
    Ok(Json(response))
}

async fn delete_task(
    State(data): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Path((project_id, task_id)): Path<(Uuid, String)>,
) -> Result<Json<ProjectResponse>, ApiError> {
    debug!("Entering delete_task function");

    let project = load_project_for(&data, &user, project_id, Action::Update)?;

    let mut tasks = project.tasks().map_err(|e| {
        error!("Failed to parse project tasks: {:?}", e);
        ApiError::InternalServerError
    })?;

    let before = tasks.len();
    tasks.retain(|t| t.id != task_id);
    if tasks.len() == before {
        return Err(ApiError::NotFound);
    }

    data.db.update_project_tasks(&project, &tasks).map_err(|e| {
        error!("Failed to update project tasks: {:?}", e);
        ApiError::InternalServerError
    })?;

    let project = data
        .db
        .get_project_by_uuid(project_id)
        .map_err(|_| ApiError::NotFound)?;
    let company_uuid = resolve_company_uuid(&data, project.company_id)?;
    let response = ProjectResponse::from_project(&project, company_uuid)?;
    debug!("Exiting delete_task function");
    Ok(Json(response))
}

use crate::models::schema::projects;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    OnHold,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::OnHold => "on_hold",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }
}

impl From<String> for ProjectStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "active" => ProjectStatus::Active,
            "on_hold" => ProjectStatus::OnHold,
            "completed" => ProjectStatus::Completed,
            "cancelled" => ProjectStatus::Cancelled,
            _ => ProjectStatus::Active,
        }
    }
}

/// Task embedded in the project's `tasks` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub assignee: Option<Uuid>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String) -> Self {
        Task {
            id: Uuid::new_v4().to_string(),
            title,
            status: "todo".to_string(),
            assignee: None,
            due_date: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: i32,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub progress: i32,
    pub owner_id: Uuid,
    pub company_id: Option<i32>,
    #[diesel(sql_type = Jsonb)]
    pub team: Value,
    #[diesel(sql_type = Jsonb)]
    pub tasks: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn team(&self) -> Result<Vec<Uuid>, ProjectError> {
        serde_json::from_value(self.team.clone()).map_err(ProjectError::SerializationError)
    }

    pub fn tasks(&self) -> Result<Vec<Task>, ProjectError> {
        serde_json::from_value(self.tasks.clone()).map_err(ProjectError::SerializationError)
    }

    pub fn get_by_id(
        conn: &mut PgConnection,
        lookup_id: i32,
    ) -> Result<Option<Project>, ProjectError> {
        projects::table
            .filter(projects::id.eq(lookup_id))
            .first::<Project>(conn)
            .optional()
            .map_err(ProjectError::DatabaseError)
    }

    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<Project>, ProjectError> {
        projects::table
            .filter(projects::uuid.eq(lookup_uuid))
            .first::<Project>(conn)
            .optional()
            .map_err(ProjectError::DatabaseError)
    }

    /// Projects the user owns plus those bound to their company.
    pub fn get_all_for_user(
        conn: &mut PgConnection,
        owner_uuid: Uuid,
        member_company_id: Option<i32>,
    ) -> Result<Vec<Project>, ProjectError> {
        let mut query = projects::table
            .into_boxed()
            .filter(projects::owner_id.eq(owner_uuid));

        if let Some(company_id) = member_company_id {
            query = query.or_filter(projects::company_id.eq(company_id));
        }

        query
            .order(projects::id.asc())
            .load::<Project>(conn)
            .map_err(ProjectError::DatabaseError)
    }

    pub fn update(&self, conn: &mut PgConnection) -> Result<(), ProjectError> {
        diesel::update(projects::table)
            .filter(projects::id.eq(self.id))
            .set((
                projects::name.eq(&self.name),
                projects::description.eq(&self.description),
                projects::status.eq(&self.status),
                projects::progress.eq(self.progress),
                projects::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(ProjectError::DatabaseError)
    }

    pub fn update_team(&self, conn: &mut PgConnection, team: &[Uuid]) -> Result<(), ProjectError> {
        let value = serde_json::to_value(team).map_err(ProjectError::SerializationError)?;
        diesel::update(projects::table)
            .filter(projects::id.eq(self.id))
            .set((
                projects::team.eq(value),
                projects::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(ProjectError::DatabaseError)
    }

    pub fn update_tasks(
        &self,
        conn: &mut PgConnection,
        tasks: &[Task],
    ) -> Result<(), ProjectError> {
        let value = serde_json::to_value(tasks).map_err(ProjectError::SerializationError)?;
        diesel::update(projects::table)
            .filter(projects::id.eq(self.id))
            .set((
                projects::tasks.eq(value),
                projects::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(ProjectError::DatabaseError)
    }

    pub fn delete(&self, conn: &mut PgConnection) -> Result<(), ProjectError> {
        diesel::delete(projects::table)
            .filter(projects::id.eq(self.id))
            .execute(conn)
            .map(|_| ())
            .map_err(ProjectError::DatabaseError)
    }
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = projects)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub progress: i32,
    pub owner_id: Uuid,
    pub company_id: Option<i32>,
    #[diesel(sql_type = Jsonb)]
    pub team: Value,
    #[diesel(sql_type = Jsonb)]
    pub tasks: Value,
}

impl NewProject {
    pub fn new(name: String, owner_id: Uuid) -> Self {
        NewProject {
            name,
            description: None,
            status: ProjectStatus::Active.as_str().to_string(),
            progress: 0,
            owner_id,
            company_id: None,
            team: serde_json::json!([]),
            tasks: serde_json::json!([]),
        }
    }

    pub fn insert(&self, conn: &mut PgConnection) -> Result<Project, ProjectError> {
        diesel::insert_into(projects::table)
            .values(self)
            .get_result::<Project>(conn)
            .map_err(ProjectError::DatabaseError)
    }
}

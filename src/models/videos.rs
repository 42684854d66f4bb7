use crate::models::schema::videos;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    Uploading,
    Processing,
    Ready,
    Failed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Uploading => "uploading",
            VideoStatus::Processing => "processing",
            VideoStatus::Ready => "ready",
            VideoStatus::Failed => "failed",
        }
    }
}

impl From<String> for VideoStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "uploading" => VideoStatus::Uploading,
            "processing" => VideoStatus::Processing,
            "ready" => VideoStatus::Ready,
            "failed" => VideoStatus::Failed,
            _ => VideoStatus::Uploading,
        }
    }
}

/// Cut of the source video, stored in the `clips` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub title: String,
    pub start_secs: f64,
    pub end_secs: f64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: Vec<Uuid>,
}

impl Clip {
    pub fn new(title: String, start_secs: f64, end_secs: f64, created_by: Uuid) -> Self {
        Clip {
            id: Uuid::new_v4().to_string(),
            title,
            start_secs,
            end_secs,
            created_by,
            created_at: Utc::now(),
            votes: Vec::new(),
        }
    }

    /// Adds the voter, or removes them if they already voted.
    pub fn toggle_vote(&mut self, voter: Uuid) {
        if let Some(pos) = self.votes.iter().position(|v| *v == voter) {
            self.votes.remove(pos);
        } else {
            self.votes.push(voter);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub time_secs: Option<f64>,
    pub created_by: Uuid,
    #[serde(default)]
    pub selected: bool,
    pub created_at: DateTime<Utc>,
}

impl Thumbnail {
    pub fn new(url: String, created_by: Uuid) -> Self {
        Thumbnail {
            id: Uuid::new_v4().to_string(),
            url,
            time_secs: None,
            created_by,
            selected: false,
            created_at: Utc::now(),
        }
    }
}

/// Short-form cut derived from the video, for social distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Short {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: Vec<Uuid>,
}

impl Short {
    pub fn new(title: String, created_by: Uuid) -> Self {
        Short {
            id: Uuid::new_v4().to_string(),
            title,
            url: None,
            status: String::from("draft"),
            created_by,
            created_at: Utc::now(),
            votes: Vec::new(),
        }
    }

    pub fn toggle_vote(&mut self, voter: Uuid) {
        if let Some(pos) = self.votes.iter().position(|v| *v == voter) {
            self.votes.remove(pos);
        } else {
            self.votes.push(voter);
        }
    }
}

/// Render of the video; at most one version is flagged final.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: String,
    pub version_number: i32,
    #[serde(default)]
    pub storage_key: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_final: bool,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(version_number: i32, uploaded_by: Uuid) -> Self {
        Version {
            id: Uuid::new_v4().to_string(),
            version_number,
            storage_key: None,
            url: None,
            notes: None,
            is_final: false,
            uploaded_by,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub author_id: Uuid,
    #[serde(default)]
    pub time_secs: Option<f64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited: bool,
}

impl Comment {
    pub fn new(author_id: Uuid, body: String) -> Self {
        Comment {
            id: Uuid::new_v4().to_string(),
            body,
            author_id,
            time_secs: None,
            created_at: Utc::now(),
            edited: false,
        }
    }
}

/// Supporting link attached to the video (brief, assets, references).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub added_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(name: String, url: String, added_by: Uuid) -> Self {
        Resource {
            id: Uuid::new_v4().to_string(),
            name,
            url,
            kind: None,
            added_by,
            created_at: Utc::now(),
        }
    }
}

#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = videos)]
pub struct Video {
    pub id: i32,
    pub uuid: Uuid,
    pub title: String,
    pub storage_key: Option<String>,
    pub url: Option<String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    pub status: String,
    pub project_id: Option<i32>,
    pub uploaded_by: Uuid,
    pub company_id: Option<i32>,
    pub is_public: bool,
    #[diesel(sql_type = Jsonb)]
    pub tags: Value,
    #[diesel(sql_type = Jsonb)]
    pub clips: Value,
    #[diesel(sql_type = Jsonb)]
    pub thumbnails: Value,
    #[diesel(sql_type = Jsonb)]
    pub shorts: Value,
    #[diesel(sql_type = Jsonb)]
    pub versions: Value,
    #[diesel(sql_type = Jsonb)]
    pub comments: Value,
    #[diesel(sql_type = Jsonb)]
    pub resources: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    pub fn tag_names(&self) -> Result<Vec<String>, VideoError> {
        serde_json::from_value(self.tags.clone()).map_err(VideoError::SerializationError)
    }

    pub fn clips(&self) -> Result<Vec<Clip>, VideoError> {
        serde_json::from_value(self.clips.clone()).map_err(VideoError::SerializationError)
    }

    pub fn thumbnails(&self) -> Result<Vec<Thumbnail>, VideoError> {
        serde_json::from_value(self.thumbnails.clone()).map_err(VideoError::SerializationError)
    }

    pub fn shorts(&self) -> Result<Vec<Short>, VideoError> {
        serde_json::from_value(self.shorts.clone()).map_err(VideoError::SerializationError)
    }

    pub fn versions(&self) -> Result<Vec<Version>, VideoError> {
        serde_json::from_value(self.versions.clone()).map_err(VideoError::SerializationError)
    }

    pub fn comments(&self) -> Result<Vec<Comment>, VideoError> {
        serde_json::from_value(self.comments.clone()).map_err(VideoError::SerializationError)
    }

    pub fn resources(&self) -> Result<Vec<Resource>, VideoError> {
        serde_json::from_value(self.resources.clone()).map_err(VideoError::SerializationError)
    }

    pub fn get_by_id(conn: &mut PgConnection, lookup_id: i32) -> Result<Option<Video>, VideoError> {
        videos::table
            .filter(videos::id.eq(lookup_id))
            .first::<Video>(conn)
            .optional()
            .map_err(VideoError::DatabaseError)
    }

    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<Video>, VideoError> {
        videos::table
            .filter(videos::uuid.eq(lookup_uuid))
            .first::<Video>(conn)
            .optional()
            .map_err(VideoError::DatabaseError)
    }

    /// Videos the user uploaded plus those bound to their company.
    pub fn get_all_for_user(
        conn: &mut PgConnection,
        uploader_uuid: Uuid,
        member_company_id: Option<i32>,
    ) -> Result<Vec<Video>, VideoError> {
        let mut query = videos::table
            .into_boxed()
            .filter(videos::uploaded_by.eq(uploader_uuid));

        if let Some(company_id) = member_company_id {
            query = query.or_filter(videos::company_id.eq(company_id));
        }

        query
            .order(videos::id.asc())
            .load::<Video>(conn)
            .map_err(VideoError::DatabaseError)
    }

    pub fn get_all_for_project(
        conn: &mut PgConnection,
        lookup_project_id: i32,
    ) -> Result<Vec<Video>, VideoError> {
        videos::table
            .filter(videos::project_id.eq(lookup_project_id))
            .order(videos::id.asc())
            .load::<Video>(conn)
            .map_err(VideoError::DatabaseError)
    }

    pub fn update(&self, conn: &mut PgConnection) -> Result<(), VideoError> {
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::title.eq(&self.title),
                videos::storage_key.eq(&self.storage_key),
                videos::url.eq(&self.url),
                videos::duration_secs.eq(self.duration_secs),
                videos::size_bytes.eq(self.size_bytes),
                videos::status.eq(&self.status),
                videos::project_id.eq(self.project_id),
                videos::is_public.eq(self.is_public),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn update_tag_names(
        &self,
        conn: &mut PgConnection,
        tag_names: &[String],
    ) -> Result<(), VideoError> {
        let value = serde_json::to_value(tag_names).map_err(VideoError::SerializationError)?;
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::tags.eq(value),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn update_clips(&self, conn: &mut PgConnection, clips: &[Clip]) -> Result<(), VideoError> {
        let value = serde_json::to_value(clips).map_err(VideoError::SerializationError)?;
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::clips.eq(value),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn update_thumbnails(
        &self,
        conn: &mut PgConnection,
        thumbnails: &[Thumbnail],
    ) -> Result<(), VideoError> {
        let value = serde_json::to_value(thumbnails).map_err(VideoError::SerializationError)?;
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::thumbnails.eq(value),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn update_shorts(
        &self,
        conn: &mut PgConnection,
        shorts: &[Short],
    ) -> Result<(), VideoError> {
        let value = serde_json::to_value(shorts).map_err(VideoError::SerializationError)?;
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::shorts.eq(value),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn update_versions(
        &self,
        conn: &mut PgConnection,
        versions: &[Version],
    ) -> Result<(), VideoError> {
        let value = serde_json::to_value(versions).map_err(VideoError::SerializationError)?;
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::versions.eq(value),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn update_comments(
        &self,
        conn: &mut PgConnection,
        comments: &[Comment],
    ) -> Result<(), VideoError> {
        let value = serde_json::to_value(comments).map_err(VideoError::SerializationError)?;
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::comments.eq(value),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn update_resources(
        &self,
        conn: &mut PgConnection,
        resources: &[Resource],
    ) -> Result<(), VideoError> {
        let value = serde_json::to_value(resources).map_err(VideoError::SerializationError)?;
        diesel::update(videos::table)
            .filter(videos::id.eq(self.id))
            .set((
                videos::resources.eq(value),
                videos::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }

    pub fn delete(&self, conn: &mut PgConnection) -> Result<(), VideoError> {
        diesel::delete(videos::table)
            .filter(videos::id.eq(self.id))
            .execute(conn)
            .map(|_| ())
            .map_err(VideoError::DatabaseError)
    }
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = videos)]
pub struct NewVideo {
    pub title: String,
    pub storage_key: Option<String>,
    pub url: Option<String>,
    pub duration_secs: Option<f64>,
    pub size_bytes: Option<i64>,
    pub status: String,
    pub project_id: Option<i32>,
    pub uploaded_by: Uuid,
    pub company_id: Option<i32>,
    pub is_public: bool,
    #[diesel(sql_type = Jsonb)]
    pub tags: Value,
    #[diesel(sql_type = Jsonb)]
    pub clips: Value,
    #[diesel(sql_type = Jsonb)]
    pub thumbnails: Value,
    #[diesel(sql_type = Jsonb)]
    pub shorts: Value,
    #[diesel(sql_type = Jsonb)]
    pub versions: Value,
    #[diesel(sql_type = Jsonb)]
    pub comments: Value,
    #[diesel(sql_type = Jsonb)]
    pub resources: Value,
}

impl NewVideo {
    pub fn new(title: String, uploaded_by: Uuid) -> Self {
        NewVideo {
            title,
            storage_key: None,
            url: None,
            duration_secs: None,
            size_bytes: None,
            status: VideoStatus::Uploading.as_str().to_string(),
            project_id: None,
            uploaded_by,
            company_id: None,
            is_public: false,
            tags: serde_json::json!([]),
            clips: serde_json::json!([]),
            thumbnails: serde_json::json!([]),
            shorts: serde_json::json!([]),
            versions: serde_json::json!([]),
            comments: serde_json::json!([]),
            resources: serde_json::json!([]),
        }
    }

    pub fn insert(&self, conn: &mut PgConnection) -> Result<Video, VideoError> {
        diesel::insert_into(videos::table)
            .values(self)
            .get_result::<Video>(conn)
            .map_err(VideoError::DatabaseError)
    }
}

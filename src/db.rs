use crate::models::companies::{Company, CompanyError, NewCompany};
use crate::models::company_members::{
    CompanyMember, CompanyMemberError, CompanyRole, NewCompanyMember,
};
use crate::models::projects::{NewProject, Project, ProjectError, Task};
use crate::models::tags::{NewTag, Tag, TagError};
use crate::models::users::{NewUser, User, UserError};
use crate::models::videos::{
    Clip, Comment, NewVideo, Resource, Short, Thumbnail, Version, Video, VideoError,
};
use chrono::{DateTime, Utc};
use diesel::Connection;
use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, Pool},
};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum DBError {
    #[error("Database connection error")]
    ConnectionError,
    #[error("Database query error: {0}")]
    QueryError(#[from] diesel::result::Error),
    #[error("User error: {0}")]
    UserError(#[from] UserError),
    #[error("User not found")]
    UserNotFound,
    #[error("Company error: {0}")]
    CompanyError(#[from] CompanyError),
    #[error("Company not found")]
    CompanyNotFound,
    #[error("Company member error: {0}")]
    CompanyMemberError(#[from] CompanyMemberError),
    #[error("Company member not found")]
    CompanyMemberNotFound,
    #[error("Project error: {0}")]
    ProjectError(#[from] ProjectError),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("Video error: {0}")]
    VideoError(#[from] VideoError),
    #[error("Video not found")]
    VideoNotFound,
    #[error("Tag error: {0}")]
    TagError(#[from] TagError),
    #[error("Tag not found")]
    TagNotFound,
}

#[allow(dead_code)]
pub trait DBConnection {
    // User methods
    fn create_user(&self, new_user: NewUser) -> Result<User, DBError>;
    fn get_user_by_uuid(&self, user_uuid: Uuid) -> Result<User, DBError>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DBError>;
    fn get_user_by_invite_token(&self, token_hash: &str) -> Result<Option<User>, DBError>;
    fn get_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, DBError>;
    fn update_user(&self, user: &User) -> Result<(), DBError>;
    fn update_user_password(&self, user: &User, new_password_hash: String) -> Result<(), DBError>;
    fn set_user_company(&self, user: &User, company_id: Option<i32>) -> Result<(), DBError>;
    fn set_user_invite(
        &self,
        user: &User,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        target_company_id: i32,
    ) -> Result<(), DBError>;
    fn set_user_reset(
        &self,
        user: &User,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DBError>;
    fn consume_user_reset(&self, user: &User, new_password_hash: String) -> Result<(), DBError>;

    // Company methods
    fn create_company_with_owner(&self, new_company: NewCompany) -> Result<Company, DBError>;
    fn get_company_by_id(&self, company_id: i32) -> Result<Company, DBError>;
    fn get_company_by_uuid(&self, company_uuid: Uuid) -> Result<Company, DBError>;
    fn get_companies_for_user(&self, user_uuid: Uuid) -> Result<Vec<Company>, DBError>;
    fn update_company(&self, company: &Company) -> Result<(), DBError>;
    fn delete_company(&self, company: &Company) -> Result<(), DBError>;

    // Company member methods
    fn upsert_company_member(
        &self,
        new_member: NewCompanyMember,
    ) -> Result<CompanyMember, DBError>;
    fn get_company_member(
        &self,
        company_id: i32,
        user_uuid: Uuid,
    ) -> Result<Option<CompanyMember>, DBError>;
    fn get_company_members_with_users(
        &self,
        company_id: i32,
    ) -> Result<Vec<(CompanyMember, User)>, DBError>;
    fn update_member_role(&self, member: &CompanyMember, role: CompanyRole)
        -> Result<(), DBError>;
    fn add_member_transaction(
        &self,
        new_member: NewCompanyMember,
        target_user: &User,
        new_company_id: Option<i32>,
    ) -> Result<CompanyMember, DBError>;
    fn accept_invite_transaction(
        &self,
        user: &User,
        member: &CompanyMember,
        new_company_id: Option<i32>,
        new_name: Option<String>,
        new_password_hash: Option<String>,
    ) -> Result<(), DBError>;
    fn remove_member_transaction(
        &self,
        member: &CompanyMember,
        target_user: &User,
        clear_company: bool,
        clear_invite: bool,
    ) -> Result<(), DBError>;

    // Project methods
    fn create_project(&self, new_project: NewProject) -> Result<Project, DBError>;
    fn get_project_by_id(&self, project_id: i32) -> Result<Project, DBError>;
    fn get_project_by_uuid(&self, project_uuid: Uuid) -> Result<Project, DBError>;
    fn get_projects_for_user(
        &self,
        owner_uuid: Uuid,
        company_id: Option<i32>,
    ) -> Result<Vec<Project>, DBError>;
    fn update_project(&self, project: &Project) -> Result<(), DBError>;
    fn update_project_team(&self, project: &Project, team: &[Uuid]) -> Result<(), DBError>;
    fn update_project_tasks(&self, project: &Project, tasks: &[Task]) -> Result<(), DBError>;
    fn delete_project(&self, project: &Project) -> Result<(), DBError>;

    // Video methods
    fn create_video(&self, new_video: NewVideo) -> Result<Video, DBError>;
    fn get_video_by_uuid(&self, video_uuid: Uuid) -> Result<Video, DBError>;
    fn get_videos_for_user(
        &self,
        uploader_uuid: Uuid,
        company_id: Option<i32>,
    ) -> Result<Vec<Video>, DBError>;
    fn get_videos_for_project(&self, project_id: i32) -> Result<Vec<Video>, DBError>;
    fn update_video(&self, video: &Video) -> Result<(), DBError>;
    fn update_video_tag_names(&self, video: &Video, tag_names: &[String]) -> Result<(), DBError>;
    fn update_video_clips(&self, video: &Video, clips: &[Clip]) -> Result<(), DBError>;
    fn update_video_thumbnails(
        &self,
        video: &Video,
        thumbnails: &[Thumbnail],
    ) -> Result<(), DBError>;
    fn update_video_shorts(&self, video: &Video, shorts: &[Short]) -> Result<(), DBError>;
    fn update_video_versions(&self, video: &Video, versions: &[Version]) -> Result<(), DBError>;
    fn update_video_comments(&self, video: &Video, comments: &[Comment]) -> Result<(), DBError>;
    fn update_video_resources(&self, video: &Video, resources: &[Resource])
        -> Result<(), DBError>;
    fn delete_video(&self, video: &Video) -> Result<(), DBError>;

    // Tag methods
    fn create_tag(&self, new_tag: NewTag) -> Result<Tag, DBError>;
    fn get_tag_by_uuid(&self, tag_uuid: Uuid) -> Result<Tag, DBError>;
    fn find_tag_in_scope(
        &self,
        name: &str,
        company_id: Option<i32>,
        creator_uuid: Uuid,
    ) -> Result<Option<Tag>, DBError>;
    fn get_tags_for_user(
        &self,
        user_uuid: Uuid,
        company_id: Option<i32>,
    ) -> Result<Vec<Tag>, DBError>;
    fn update_tag(&self, tag: &Tag) -> Result<(), DBError>;
    fn delete_tag(&self, tag: &Tag) -> Result<(), DBError>;
}

pub struct PostgresConnection {
    db: Pool<ConnectionManager<PgConnection>>,
}

impl DBConnection for PostgresConnection {
    // User methods
    fn create_user(&self, new_user: NewUser) -> Result<User, DBError> {
        debug!("Creating user with email: {}", new_user.email);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_user.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create user: {:?}", e);
        }
        result
    }

    fn get_user_by_uuid(&self, user_uuid: Uuid) -> Result<User, DBError> {
        debug!("Getting user by uuid: {}", user_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let user = User::get_by_uuid(conn, user_uuid)?;
        user.ok_or(DBError::UserNotFound)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DBError> {
        debug!("Getting user by email");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        User::get_by_email(conn, email).map_err(DBError::from)
    }

    fn get_user_by_invite_token(&self, token_hash: &str) -> Result<Option<User>, DBError> {
        debug!("Getting user by invite token");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        User::get_by_invite_token_hash(conn, token_hash).map_err(DBError::from)
    }

    fn get_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, DBError> {
        debug!("Getting user by reset token");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        User::get_by_reset_token_hash(conn, token_hash).map_err(DBError::from)
    }

    fn update_user(&self, user: &User) -> Result<(), DBError> {
        debug!("Updating user: {}", user.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = user.update(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update user: {:?}", e);
        }
        result
    }

    fn update_user_password(&self, user: &User, new_password_hash: String) -> Result<(), DBError> {
        debug!("Updating password for user: {}", user.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = user
            .update_password(conn, new_password_hash)
            .map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update user password: {:?}", e);
        }
        result
    }

    fn set_user_company(&self, user: &User, company_id: Option<i32>) -> Result<(), DBError> {
        debug!("Setting company for user: {}", user.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = user.set_company(conn, company_id).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to set user company: {:?}", e);
        }
        result
    }

    fn set_user_invite(
        &self,
        user: &User,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        target_company_id: i32,
    ) -> Result<(), DBError> {
        debug!("Setting invite token for user: {}", user.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = user
            .set_invite(conn, token_hash, expires_at, target_company_id)
            .map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to set user invite: {:?}", e);
        }
        result
    }

    fn set_user_reset(
        &self,
        user: &User,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DBError> {
        debug!("Setting reset token for user: {}", user.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = user
            .set_reset(conn, token_hash, expires_at)
            .map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to set user reset token: {:?}", e);
        }
        result
    }

    fn consume_user_reset(&self, user: &User, new_password_hash: String) -> Result<(), DBError> {
        debug!("Consuming reset token for user: {}", user.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = user
            .consume_reset(conn, new_password_hash)
            .map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to consume reset token: {:?}", e);
        }
        result
    }

    // Company methods
    fn create_company_with_owner(&self, new_company: NewCompany) -> Result<Company, DBError> {
        debug!("Creating new company with owner");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;

        conn.transaction(|conn| {
            let company = new_company.insert(conn)?;

            // The owner always holds a membership row
            let owner_member =
                NewCompanyMember::new(company.id, company.owner_id, CompanyRole::Owner);
            owner_member.upsert(conn)?;

            Ok(company)
        })
    }

    fn get_company_by_id(&self, company_id: i32) -> Result<Company, DBError> {
        debug!("Getting company by id: {}", company_id);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let company = Company::get_by_id(conn, company_id)?;
        company.ok_or(DBError::CompanyNotFound)
    }

    fn get_company_by_uuid(&self, company_uuid: Uuid) -> Result<Company, DBError> {
        debug!("Getting company by uuid: {}", company_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let company = Company::get_by_uuid(conn, company_uuid)?;
        company.ok_or(DBError::CompanyNotFound)
    }

    fn get_companies_for_user(&self, user_uuid: Uuid) -> Result<Vec<Company>, DBError> {
        debug!("Getting companies for user: {}", user_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Company::get_all_for_member(conn, user_uuid).map_err(DBError::from)
    }

    fn update_company(&self, company: &Company) -> Result<(), DBError> {
        debug!("Updating company: {}", company.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = company.update(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update company: {:?}", e);
        }
        result
    }

    fn delete_company(&self, company: &Company) -> Result<(), DBError> {
        debug!("Deleting company: {}", company.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = company.delete(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to delete company: {:?}", e);
        }
        result
    }

    // Company member methods
    fn upsert_company_member(
        &self,
        new_member: NewCompanyMember,
    ) -> Result<CompanyMember, DBError> {
        debug!(
            "Upserting member {} in company {}",
            new_member.user_id, new_member.company_id
        );
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_member.upsert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to upsert company member: {:?}", e);
        }
        result
    }

    fn get_company_member(
        &self,
        company_id: i32,
        user_uuid: Uuid,
    ) -> Result<Option<CompanyMember>, DBError> {
        debug!("Getting member {} in company {}", user_uuid, company_id);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        CompanyMember::get_by_company_and_user(conn, company_id, user_uuid).map_err(DBError::from)
    }

    fn get_company_members_with_users(
        &self,
        company_id: i32,
    ) -> Result<Vec<(CompanyMember, User)>, DBError> {
        debug!("Getting members for company: {}", company_id);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        CompanyMember::get_all_for_company_with_users(conn, company_id).map_err(DBError::from)
    }

    fn update_member_role(
        &self,
        member: &CompanyMember,
        role: CompanyRole,
    ) -> Result<(), DBError> {
        debug!(
            "Updating role for member {} in company {}",
            member.user_id, member.company_id
        );
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = member.update_role(conn, role).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update member role: {:?}", e);
        }
        result
    }

    fn add_member_transaction(
        &self,
        new_member: NewCompanyMember,
        target_user: &User,
        new_company_id: Option<i32>,
    ) -> Result<CompanyMember, DBError> {
        debug!("Starting direct member add transaction");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;

        conn.transaction(|conn| {
            let member = new_member.upsert(conn)?;

            if let Some(company_id) = new_company_id {
                target_user.set_company(conn, Some(company_id))?;
            }

            Ok(member)
        })
    }

    fn accept_invite_transaction(
        &self,
        user: &User,
        member: &CompanyMember,
        new_company_id: Option<i32>,
        new_name: Option<String>,
        new_password_hash: Option<String>,
    ) -> Result<(), DBError> {
        debug!("Starting invite acceptance transaction");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;

        conn.transaction(|conn| {
            // Consume first: a reused token makes the whole transaction fail
            user.consume_invite(conn)?;
            member.activate(conn)?;

            if let Some(name) = new_name {
                let mut updated = user.clone();
                updated.name = Some(name);
                updated.update(conn)?;
            }

            if let Some(password_hash) = new_password_hash {
                user.update_password(conn, password_hash)?;
            }

            if let Some(company_id) = new_company_id {
                user.set_company(conn, Some(company_id))?;
            }

            Ok(())
        })
    }

    fn remove_member_transaction(
        &self,
        member: &CompanyMember,
        target_user: &User,
        clear_company: bool,
        clear_invite: bool,
    ) -> Result<(), DBError> {
        debug!("Starting member removal transaction");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;

        conn.transaction(|conn| {
            member.delete(conn)?;

            if clear_company {
                target_user.set_company(conn, None)?;
            }

            if clear_invite {
                target_user.clear_invite(conn)?;
            }

            Ok(())
        })
    }

    // Project methods
    fn create_project(&self, new_project: NewProject) -> Result<Project, DBError> {
        debug!("Creating project: {}", new_project.name);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_project.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create project: {:?}", e);
        }
        result
    }

    fn get_project_by_id(&self, project_id: i32) -> Result<Project, DBError> {
        debug!("Getting project by id: {}", project_id);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let project = Project::get_by_id(conn, project_id)?;
        project.ok_or(DBError::ProjectNotFound)
    }

    fn get_project_by_uuid(&self, project_uuid: Uuid) -> Result<Project, DBError> {
        debug!("Getting project by uuid: {}", project_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let project = Project::get_by_uuid(conn, project_uuid)?;
        project.ok_or(DBError::ProjectNotFound)
    }

    fn get_projects_for_user(
        &self,
        owner_uuid: Uuid,
        company_id: Option<i32>,
    ) -> Result<Vec<Project>, DBError> {
        debug!("Getting projects for user: {}", owner_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Project::get_all_for_user(conn, owner_uuid, company_id).map_err(DBError::from)
    }

    fn update_project(&self, project: &Project) -> Result<(), DBError> {
        debug!("Updating project: {}", project.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = project.update(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update project: {:?}", e);
        }
        result
    }

    fn update_project_team(&self, project: &Project, team: &[Uuid]) -> Result<(), DBError> {
        debug!("Updating team for project: {}", project.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = project.update_team(conn, team).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update project team: {:?}", e);
        }
        result
    }

    fn update_project_tasks(&self, project: &Project, tasks: &[Task]) -> Result<(), DBError> {
        debug!("Updating tasks for project: {}", project.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = project.update_tasks(conn, tasks).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update project tasks: {:?}", e);
        }
        result
    }

    fn delete_project(&self, project: &Project) -> Result<(), DBError> {
        debug!("Deleting project: {}", project.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = project.delete(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to delete project: {:?}", e);
        }
        result
    }

    // Video methods
    fn create_video(&self, new_video: NewVideo) -> Result<Video, DBError> {
        debug!("Creating video: {}", new_video.title);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_video.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create video: {:?}", e);
        }
        result
    }

    fn get_video_by_uuid(&self, video_uuid: Uuid) -> Result<Video, DBError> {
        debug!("Getting video by uuid: {}", video_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let video = Video::get_by_uuid(conn, video_uuid)?;
        video.ok_or(DBError::VideoNotFound)
    }

    fn get_videos_for_user(
        &self,
        uploader_uuid: Uuid,
        company_id: Option<i32>,
    ) -> Result<Vec<Video>, DBError> {
        debug!("Getting videos for user: {}", uploader_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Video::get_all_for_user(conn, uploader_uuid, company_id).map_err(DBError::from)
    }

    fn get_videos_for_project(&self, project_id: i32) -> Result<Vec<Video>, DBError> {
        debug!("Getting videos for project: {}", project_id);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Video::get_all_for_project(conn, project_id).map_err(DBError::from)
    }

    fn update_video(&self, video: &Video) -> Result<(), DBError> {
        debug!("Updating video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video.update(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video: {:?}", e);
        }
        result
    }

    fn update_video_tag_names(&self, video: &Video, tag_names: &[String]) -> Result<(), DBError> {
        debug!("Updating tags for video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video.update_tag_names(conn, tag_names).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video tags: {:?}", e);
        }
        result
    }

    fn update_video_clips(&self, video: &Video, clips: &[Clip]) -> Result<(), DBError> {
        debug!("Updating clips for video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video.update_clips(conn, clips).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video clips: {:?}", e);
        }
        result
    }

    fn update_video_thumbnails(
        &self,
        video: &Video,
        thumbnails: &[Thumbnail],
    ) -> Result<(), DBError> {
        debug!("Updating thumbnails for video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video
            .update_thumbnails(conn, thumbnails)
            .map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video thumbnails: {:?}", e);
        }
        result
    }

    fn update_video_shorts(&self, video: &Video, shorts: &[Short]) -> Result<(), DBError> {
        debug!("Updating shorts for video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video.update_shorts(conn, shorts).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video shorts: {:?}", e);
        }
        result
    }

    fn update_video_versions(&self, video: &Video, versions: &[Version]) -> Result<(), DBError> {
        debug!("Updating versions for video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video.update_versions(conn, versions).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video versions: {:?}", e);
        }
        result
    }

    fn update_video_comments(&self, video: &Video, comments: &[Comment]) -> Result<(), DBError> {
        debug!("Updating comments for video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video.update_comments(conn, comments).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video comments: {:?}", e);
        }
        result
    }

    fn update_video_resources(
        &self,
        video: &Video,
        resources: &[Resource],
    ) -> Result<(), DBError> {
        debug!("Updating resources for video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video
            .update_resources(conn, resources)
            .map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update video resources: {:?}", e);
        }
        result
    }

    fn delete_video(&self, video: &Video) -> Result<(), DBError> {
        debug!("Deleting video: {}", video.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = video.delete(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to delete video: {:?}", e);
        }
        result
    }

    // Tag methods
    fn create_tag(&self, new_tag: NewTag) -> Result<Tag, DBError> {
        debug!("Creating tag: {}", new_tag.name);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = new_tag.insert(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to create tag: {:?}", e);
        }
        result
    }

    fn get_tag_by_uuid(&self, tag_uuid: Uuid) -> Result<Tag, DBError> {
        debug!("Getting tag by uuid: {}", tag_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let tag = Tag::get_by_uuid(conn, tag_uuid)?;
        tag.ok_or(DBError::TagNotFound)
    }

    fn find_tag_in_scope(
        &self,
        name: &str,
        company_id: Option<i32>,
        creator_uuid: Uuid,
    ) -> Result<Option<Tag>, DBError> {
        debug!("Finding tag by name in scope");
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Tag::find_in_scope(conn, name, company_id, creator_uuid).map_err(DBError::from)
    }

    fn get_tags_for_user(
        &self,
        user_uuid: Uuid,
        company_id: Option<i32>,
    ) -> Result<Vec<Tag>, DBError> {
        debug!("Getting tags for user: {}", user_uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        Tag::get_all_for_user(conn, user_uuid, company_id).map_err(DBError::from)
    }

    fn update_tag(&self, tag: &Tag) -> Result<(), DBError> {
        debug!("Updating tag: {}", tag.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = tag.update(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to update tag: {:?}", e);
        }
        result
    }

    fn delete_tag(&self, tag: &Tag) -> Result<(), DBError> {
        debug!("Deleting tag: {}", tag.uuid);
        let conn = &mut self.db.get().map_err(|_| DBError::ConnectionError)?;
        let result = tag.delete(conn).map_err(DBError::from);
        if let Err(ref e) = result {
            error!("Failed to delete tag: {:?}", e);
        }
        result
    }
}

pub(crate) fn setup_db(url: String) -> Arc<dyn DBConnection + Send + Sync> {
    info!("Connecting to database...");
    let manager = ConnectionManager::<PgConnection>::new(url);
    let pool = Pool::builder()
        .max_size(10)
        .test_on_check_out(true)
        .build(manager)
        .expect("Unable to build DB connection pool");
    info!("Connected to database");
    Arc::new(PostgresConnection { db: pool })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::company_members::MemberStatus;
    use std::sync::Mutex;

    /// In-memory stand-in for Postgres, mirroring the row semantics the
    /// queries above rely on.
    pub(crate) struct MockDb {
        users: Mutex<Vec<User>>,
        companies: Mutex<Vec<Company>>,
        members: Mutex<Vec<CompanyMember>>,
        projects: Mutex<Vec<Project>>,
        videos: Mutex<Vec<Video>>,
        tags: Mutex<Vec<Tag>>,
        next_id: Mutex<i32>,
    }

    impl MockDb {
        pub(crate) fn new() -> Self {
            MockDb {
                users: Mutex::new(Vec::new()),
                companies: Mutex::new(Vec::new()),
                members: Mutex::new(Vec::new()),
                projects: Mutex::new(Vec::new()),
                videos: Mutex::new(Vec::new()),
                tags: Mutex::new(Vec::new()),
                next_id: Mutex::new(1),
            }
        }

        fn next_id(&self) -> i32 {
            let mut id = self.next_id.lock().unwrap();
            let current = *id;
            *id += 1;
            current
        }
    }

    impl DBConnection for MockDb {
        fn create_user(&self, new_user: NewUser) -> Result<User, DBError> {
            let id = self.next_id();
            let mut users = self.users.lock().unwrap();
            if users
                .iter()
                .any(|u| u.email.eq_ignore_ascii_case(&new_user.email))
            {
                return Err(DBError::UserError(UserError::DuplicateEmail));
            }
            let now = Utc::now();
            let user = User {
                id,
                uuid: Uuid::new_v4(),
                email: new_user.email,
                name: new_user.name,
                password_hash: new_user.password_hash,
                role: new_user.role,
                company_id: None,
                pending_company_id: None,
                invite_token_hash: None,
                invite_expires_at: None,
                reset_token_hash: None,
                reset_expires_at: None,
                needs_password_reset: new_user.needs_password_reset,
                created_at: now,
                updated_at: now,
            };
            users.push(user.clone());
            Ok(user)
        }

        fn get_user_by_uuid(&self, user_uuid: Uuid) -> Result<User, DBError> {
            let users = self.users.lock().unwrap();
            users
                .iter()
                .find(|u| u.uuid == user_uuid)
                .cloned()
                .ok_or(DBError::UserNotFound)
        }

        fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DBError> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned())
        }

        fn get_user_by_invite_token(&self, token_hash: &str) -> Result<Option<User>, DBError> {
            let users = self.users.lock().unwrap();
            let now = Utc::now();
            Ok(users
                .iter()
                .find(|u| {
                    u.invite_token_hash.as_deref() == Some(token_hash)
                        && u.invite_expires_at.map(|e| e > now).unwrap_or(false)
                })
                .cloned())
        }

        fn get_user_by_reset_token(&self, token_hash: &str) -> Result<Option<User>, DBError> {
            let users = self.users.lock().unwrap();
            let now = Utc::now();
            Ok(users
                .iter()
                .find(|u| {
                    u.reset_token_hash.as_deref() == Some(token_hash)
                        && u.reset_expires_at.map(|e| e > now).unwrap_or(false)
                })
                .cloned())
        }

        fn update_user(&self, user: &User) -> Result<(), DBError> {
            let mut users = self.users.lock().unwrap();
            let stored = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(DBError::UserNotFound)?;
            stored.name = user.name.clone();
            stored.role = user.role.clone();
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_user_password(
            &self,
            user: &User,
            new_password_hash: String,
        ) -> Result<(), DBError> {
            let mut users = self.users.lock().unwrap();
            let stored = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(DBError::UserNotFound)?;
            stored.password_hash = new_password_hash;
            stored.needs_password_reset = false;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn set_user_company(&self, user: &User, company_id: Option<i32>) -> Result<(), DBError> {
            let mut users = self.users.lock().unwrap();
            let stored = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(DBError::UserNotFound)?;
            stored.company_id = company_id;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn set_user_invite(
            &self,
            user: &User,
            token_hash: &str,
            expires_at: DateTime<Utc>,
            target_company_id: i32,
        ) -> Result<(), DBError> {
            let mut users = self.users.lock().unwrap();
            let stored = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(DBError::UserNotFound)?;
            stored.invite_token_hash = Some(token_hash.to_string());
            stored.invite_expires_at = Some(expires_at);
            stored.pending_company_id = Some(target_company_id);
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn set_user_reset(
            &self,
            user: &User,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<(), DBError> {
            let mut users = self.users.lock().unwrap();
            let stored = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(DBError::UserNotFound)?;
            stored.reset_token_hash = Some(token_hash.to_string());
            stored.reset_expires_at = Some(expires_at);
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn consume_user_reset(
            &self,
            user: &User,
            new_password_hash: String,
        ) -> Result<(), DBError> {
            let mut users = self.users.lock().unwrap();
            let stored = users
                .iter_mut()
                .find(|u| u.id == user.id)
                .ok_or(DBError::UserNotFound)?;
            if stored.reset_token_hash.is_none() {
                return Err(DBError::UserError(UserError::ResetAlreadyUsed));
            }
            stored.password_hash = new_password_hash;
            stored.reset_token_hash = None;
            stored.reset_expires_at = None;
            stored.needs_password_reset = false;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn create_company_with_owner(&self, new_company: NewCompany) -> Result<Company, DBError> {
            let company_id = self.next_id();
            let member_id = self.next_id();
            let now = Utc::now();
            let company = Company {
                id: company_id,
                uuid: Uuid::new_v4(),
                name: new_company.name,
                description: new_company.description,
                website: new_company.website,
                industry: new_company.industry,
                size: new_company.size,
                founded: new_company.founded,
                location: new_company.location,
                logo_url: new_company.logo_url,
                owner_id: new_company.owner_id,
                created_at: now,
                updated_at: now,
            };
            self.companies.lock().unwrap().push(company.clone());
            self.members.lock().unwrap().push(CompanyMember {
                id: member_id,
                company_id,
                user_id: company.owner_id,
                role: CompanyRole::Owner.as_str().to_string(),
                status: MemberStatus::Active.as_str().to_string(),
                joined_at: Some(now),
                invited_by: None,
                invite_token_hash: None,
                invite_expires_at: None,
                created_at: now,
                updated_at: now,
            });
            Ok(company)
        }

        fn get_company_by_id(&self, company_id: i32) -> Result<Company, DBError> {
            let companies = self.companies.lock().unwrap();
            companies
                .iter()
                .find(|c| c.id == company_id)
                .cloned()
                .ok_or(DBError::CompanyNotFound)
        }

        fn get_company_by_uuid(&self, company_uuid: Uuid) -> Result<Company, DBError> {
            let companies = self.companies.lock().unwrap();
            companies
                .iter()
                .find(|c| c.uuid == company_uuid)
                .cloned()
                .ok_or(DBError::CompanyNotFound)
        }

        fn get_companies_for_user(&self, user_uuid: Uuid) -> Result<Vec<Company>, DBError> {
            let members = self.members.lock().unwrap();
            let company_ids: Vec<i32> = members
                .iter()
                .filter(|m| m.user_id == user_uuid)
                .map(|m| m.company_id)
                .collect();
            let companies = self.companies.lock().unwrap();
            Ok(companies
                .iter()
                .filter(|c| company_ids.contains(&c.id))
                .cloned()
                .collect())
        }

        fn update_company(&self, company: &Company) -> Result<(), DBError> {
            let mut companies = self.companies.lock().unwrap();
            let stored = companies
                .iter_mut()
                .find(|c| c.id == company.id)
                .ok_or(DBError::CompanyNotFound)?;
            stored.name = company.name.clone();
            stored.description = company.description.clone();
            stored.website = company.website.clone();
            stored.industry = company.industry.clone();
            stored.size = company.size.clone();
            stored.founded = company.founded.clone();
            stored.location = company.location.clone();
            stored.logo_url = company.logo_url.clone();
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn delete_company(&self, company: &Company) -> Result<(), DBError> {
            self.members
                .lock()
                .unwrap()
                .retain(|m| m.company_id != company.id);
            for user in self.users.lock().unwrap().iter_mut() {
                if user.company_id == Some(company.id) {
                    user.company_id = None;
                }
                if user.pending_company_id == Some(company.id) {
                    user.pending_company_id = None;
                    user.invite_token_hash = None;
                    user.invite_expires_at = None;
                }
            }
            for project in self.projects.lock().unwrap().iter_mut() {
                if project.company_id == Some(company.id) {
                    project.company_id = None;
                }
            }
            for video in self.videos.lock().unwrap().iter_mut() {
                if video.company_id == Some(company.id) {
                    video.company_id = None;
                }
            }
            for tag in self.tags.lock().unwrap().iter_mut() {
                if tag.company_id == Some(company.id) {
                    tag.company_id = None;
                }
            }
            self.companies
                .lock()
                .unwrap()
                .retain(|c| c.id != company.id);
            Ok(())
        }

        fn upsert_company_member(
            &self,
            new_member: NewCompanyMember,
        ) -> Result<CompanyMember, DBError> {
            let id = self.next_id();
            let mut members = self.members.lock().unwrap();
            let now = Utc::now();
            if let Some(stored) = members
                .iter_mut()
                .find(|m| m.company_id == new_member.company_id && m.user_id == new_member.user_id)
            {
                stored.role = new_member.role.clone();
                stored.status = new_member.status.clone();
                stored.joined_at = new_member.joined_at;
                stored.invited_by = new_member.invited_by;
                stored.invite_token_hash = new_member.invite_token_hash.clone();
                stored.invite_expires_at = new_member.invite_expires_at;
                stored.updated_at = now;
                return Ok(stored.clone());
            }
            let member = CompanyMember {
                id,
                company_id: new_member.company_id,
                user_id: new_member.user_id,
                role: new_member.role,
                status: new_member.status,
                joined_at: new_member.joined_at,
                invited_by: new_member.invited_by,
                invite_token_hash: new_member.invite_token_hash,
                invite_expires_at: new_member.invite_expires_at,
                created_at: now,
                updated_at: now,
            };
            members.push(member.clone());
            Ok(member)
        }

        fn get_company_member(
            &self,
            company_id: i32,
            user_uuid: Uuid,
        ) -> Result<Option<CompanyMember>, DBError> {
            let members = self.members.lock().unwrap();
            Ok(members
                .iter()
                .find(|m| m.company_id == company_id && m.user_id == user_uuid)
                .cloned())
        }

        fn get_company_members_with_users(
            &self,
            company_id: i32,
        ) -> Result<Vec<(CompanyMember, User)>, DBError> {
            let members = self.members.lock().unwrap();
            let users = self.users.lock().unwrap();
            Ok(members
                .iter()
                .filter(|m| m.company_id == company_id)
                .filter_map(|m| {
                    users
                        .iter()
                        .find(|u| u.uuid == m.user_id)
                        .map(|u| (m.clone(), u.clone()))
                })
                .collect())
        }

        fn update_member_role(
            &self,
            member: &CompanyMember,
            role: CompanyRole,
        ) -> Result<(), DBError> {
            let mut members = self.members.lock().unwrap();
            let stored = members
                .iter_mut()
                .find(|m| m.id == member.id)
                .ok_or(DBError::CompanyMemberNotFound)?;
            stored.role = role.as_str().to_string();
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn add_member_transaction(
            &self,
            new_member: NewCompanyMember,
            target_user: &User,
            new_company_id: Option<i32>,
        ) -> Result<CompanyMember, DBError> {
            let member = self.upsert_company_member(new_member)?;
            if let Some(company_id) = new_company_id {
                self.set_user_company(target_user, Some(company_id))?;
            }
            Ok(member)
        }

        fn accept_invite_transaction(
            &self,
            user: &User,
            member: &CompanyMember,
            new_company_id: Option<i32>,
            new_name: Option<String>,
            new_password_hash: Option<String>,
        ) -> Result<(), DBError> {
            {
                let mut users = self.users.lock().unwrap();
                let stored = users
                    .iter_mut()
                    .find(|u| u.id == user.id)
                    .ok_or(DBError::UserNotFound)?;
                if stored.invite_token_hash.is_none() {
                    return Err(DBError::UserError(UserError::InviteAlreadyUsed));
                }
                stored.invite_token_hash = None;
                stored.invite_expires_at = None;
                stored.pending_company_id = None;
                if let Some(name) = new_name {
                    stored.name = Some(name);
                }
                if let Some(password_hash) = new_password_hash {
                    stored.password_hash = password_hash;
                    stored.needs_password_reset = false;
                }
                if let Some(company_id) = new_company_id {
                    stored.company_id = Some(company_id);
                }
                stored.updated_at = Utc::now();
            }

            let mut members = self.members.lock().unwrap();
            let stored = members
                .iter_mut()
                .find(|m| m.id == member.id)
                .ok_or(DBError::CompanyMemberNotFound)?;
            stored.status = MemberStatus::Active.as_str().to_string();
            stored.joined_at = stored.joined_at.or_else(|| Some(Utc::now()));
            stored.invite_token_hash = None;
            stored.invite_expires_at = None;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn remove_member_transaction(
            &self,
            member: &CompanyMember,
            target_user: &User,
            clear_company: bool,
            clear_invite: bool,
        ) -> Result<(), DBError> {
            self.members.lock().unwrap().retain(|m| m.id != member.id);
            if clear_company {
                self.set_user_company(target_user, None)?;
            }
            if clear_invite {
                let mut users = self.users.lock().unwrap();
                if let Some(user) = users.iter_mut().find(|u| u.id == target_user.id) {
                    user.invite_token_hash = None;
                    user.invite_expires_at = None;
                    user.pending_company_id = None;
                    user.updated_at = Utc::now();
                }
            }
            Ok(())
        }

        fn create_project(&self, new_project: NewProject) -> Result<Project, DBError> {
            let id = self.next_id();
            let now = Utc::now();
            let project = Project {
                id,
                uuid: Uuid::new_v4(),
                name: new_project.name,
                description: new_project.description,
                status: new_project.status,
                progress: new_project.progress,
                owner_id: new_project.owner_id,
                company_id: new_project.company_id,
                team: new_project.team,
                tasks: new_project.tasks,
                created_at: now,
                updated_at: now,
            };
            self.projects.lock().unwrap().push(project.clone());
            Ok(project)
        }

        fn get_project_by_id(&self, project_id: i32) -> Result<Project, DBError> {
            let projects = self.projects.lock().unwrap();
            projects
                .iter()
                .find(|p| p.id == project_id)
                .cloned()
                .ok_or(DBError::ProjectNotFound)
        }

        fn get_project_by_uuid(&self, project_uuid: Uuid) -> Result<Project, DBError> {
            let projects = self.projects.lock().unwrap();
            projects
                .iter()
                .find(|p| p.uuid == project_uuid)
                .cloned()
                .ok_or(DBError::ProjectNotFound)
        }

        fn get_projects_for_user(
            &self,
            owner_uuid: Uuid,
            company_id: Option<i32>,
        ) -> Result<Vec<Project>, DBError> {
            let projects = self.projects.lock().unwrap();
            Ok(projects
                .iter()
                .filter(|p| {
                    p.owner_id == owner_uuid
                        || (company_id.is_some() && p.company_id == company_id)
                })
                .cloned()
                .collect())
        }

        fn update_project(&self, project: &Project) -> Result<(), DBError> {
            let mut projects = self.projects.lock().unwrap();
            let stored = projects
                .iter_mut()
                .find(|p| p.id == project.id)
                .ok_or(DBError::ProjectNotFound)?;
            stored.name = project.name.clone();
            stored.description = project.description.clone();
            stored.status = project.status.clone();
            stored.progress = project.progress;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_project_team(&self, project: &Project, team: &[Uuid]) -> Result<(), DBError> {
            let value = serde_json::to_value(team).map_err(ProjectError::SerializationError)?;
            let mut projects = self.projects.lock().unwrap();
            let stored = projects
                .iter_mut()
                .find(|p| p.id == project.id)
                .ok_or(DBError::ProjectNotFound)?;
            stored.team = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_project_tasks(&self, project: &Project, tasks: &[Task]) -> Result<(), DBError> {
            let value = serde_json::to_value(tasks).map_err(ProjectError::SerializationError)?;
            let mut projects = self.projects.lock().unwrap();
            let stored = projects
                .iter_mut()
                .find(|p| p.id == project.id)
                .ok_or(DBError::ProjectNotFound)?;
            stored.tasks = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn delete_project(&self, project: &Project) -> Result<(), DBError> {
            self.projects
                .lock()
                .unwrap()
                .retain(|p| p.id != project.id);
            Ok(())
        }

        fn create_video(&self, new_video: NewVideo) -> Result<Video, DBError> {
            let id = self.next_id();
            let now = Utc::now();
            let video = Video {
                id,
                uuid: Uuid::new_v4(),
                title: new_video.title,
                storage_key: new_video.storage_key,
                url: new_video.url,
                duration_secs: new_video.duration_secs,
                size_bytes: new_video.size_bytes,
                status: new_video.status,
                project_id: new_video.project_id,
                uploaded_by: new_video.uploaded_by,
                company_id: new_video.company_id,
                is_public: new_video.is_public,
                tags: new_video.tags,
                clips: new_video.clips,
                thumbnails: new_video.thumbnails,
                shorts: new_video.shorts,
                versions: new_video.versions,
                comments: new_video.comments,
                resources: new_video.resources,
                created_at: now,
                updated_at: now,
            };
            self.videos.lock().unwrap().push(video.clone());
            Ok(video)
        }

        fn get_video_by_uuid(&self, video_uuid: Uuid) -> Result<Video, DBError> {
            let videos = self.videos.lock().unwrap();
            videos
                .iter()
                .find(|v| v.uuid == video_uuid)
                .cloned()
                .ok_or(DBError::VideoNotFound)
        }

        fn get_videos_for_user(
            &self,
            uploader_uuid: Uuid,
            company_id: Option<i32>,
        ) -> Result<Vec<Video>, DBError> {
            let videos = self.videos.lock().unwrap();
            Ok(videos
                .iter()
                .filter(|v| {
                    v.uploaded_by == uploader_uuid
                        || (company_id.is_some() && v.company_id == company_id)
                })
                .cloned()
                .collect())
        }

        fn get_videos_for_project(&self, project_id: i32) -> Result<Vec<Video>, DBError> {
            let videos = self.videos.lock().unwrap();
            Ok(videos
                .iter()
                .filter(|v| v.project_id == Some(project_id))
                .cloned()
                .collect())
        }

        fn update_video(&self, video: &Video) -> Result<(), DBError> {
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.title = video.title.clone();
            stored.storage_key = video.storage_key.clone();
            stored.url = video.url.clone();
            stored.duration_secs = video.duration_secs;
            stored.size_bytes = video.size_bytes;
            stored.status = video.status.clone();
            stored.project_id = video.project_id;
            stored.is_public = video.is_public;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_video_tag_names(
            &self,
            video: &Video,
            tag_names: &[String],
        ) -> Result<(), DBError> {
            let value = serde_json::to_value(tag_names).map_err(VideoError::SerializationError)?;
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.tags = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_video_clips(&self, video: &Video, clips: &[Clip]) -> Result<(), DBError> {
            let value = serde_json::to_value(clips).map_err(VideoError::SerializationError)?;
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.clips = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_video_thumbnails(
            &self,
            video: &Video,
            thumbnails: &[Thumbnail],
        ) -> Result<(), DBError> {
            let value = serde_json::to_value(thumbnails).map_err(VideoError::SerializationError)?;
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.thumbnails = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_video_shorts(&self, video: &Video, shorts: &[Short]) -> Result<(), DBError> {
            let value = serde_json::to_value(shorts).map_err(VideoError::SerializationError)?;
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.shorts = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_video_versions(
            &self,
            video: &Video,
            versions: &[Version],
        ) -> Result<(), DBError> {
            let value = serde_json::to_value(versions).map_err(VideoError::SerializationError)?;
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.versions = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_video_comments(
            &self,
            video: &Video,
            comments: &[Comment],
        ) -> Result<(), DBError> {
            let value = serde_json::to_value(comments).map_err(VideoError::SerializationError)?;
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.comments = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn update_video_resources(
            &self,
            video: &Video,
            resources: &[Resource],
        ) -> Result<(), DBError> {
            let value = serde_json::to_value(resources).map_err(VideoError::SerializationError)?;
            let mut videos = self.videos.lock().unwrap();
            let stored = videos
                .iter_mut()
                .find(|v| v.id == video.id)
                .ok_or(DBError::VideoNotFound)?;
            stored.resources = value;
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn delete_video(&self, video: &Video) -> Result<(), DBError> {
            self.videos.lock().unwrap().retain(|v| v.id != video.id);
            Ok(())
        }

        fn create_tag(&self, new_tag: NewTag) -> Result<Tag, DBError> {
            let id = self.next_id();
            let mut tags = self.tags.lock().unwrap();
            let duplicate = tags.iter().any(|t| {
                t.name.eq_ignore_ascii_case(&new_tag.name)
                    && match new_tag.company_id {
                        Some(company_id) => t.company_id == Some(company_id),
                        None => t.company_id.is_none() && t.created_by == new_tag.created_by,
                    }
            });
            if duplicate {
                return Err(DBError::TagError(TagError::DuplicateTag));
            }
            let now = Utc::now();
            let tag = Tag {
                id,
                uuid: Uuid::new_v4(),
                name: new_tag.name,
                color: new_tag.color,
                description: new_tag.description,
                created_by: new_tag.created_by,
                company_id: new_tag.company_id,
                created_at: now,
                updated_at: now,
            };
            tags.push(tag.clone());
            Ok(tag)
        }

        fn get_tag_by_uuid(&self, tag_uuid: Uuid) -> Result<Tag, DBError> {
            let tags = self.tags.lock().unwrap();
            tags.iter()
                .find(|t| t.uuid == tag_uuid)
                .cloned()
                .ok_or(DBError::TagNotFound)
        }

        fn find_tag_in_scope(
            &self,
            name: &str,
            company_id: Option<i32>,
            creator_uuid: Uuid,
        ) -> Result<Option<Tag>, DBError> {
            let tags = self.tags.lock().unwrap();
            Ok(tags
                .iter()
                .find(|t| {
                    t.name.eq_ignore_ascii_case(name)
                        && match company_id {
                            Some(company_id) => t.company_id == Some(company_id),
                            None => t.company_id.is_none() && t.created_by == creator_uuid,
                        }
                })
                .cloned())
        }

        fn get_tags_for_user(
            &self,
            user_uuid: Uuid,
            company_id: Option<i32>,
        ) -> Result<Vec<Tag>, DBError> {
            let tags = self.tags.lock().unwrap();
            Ok(tags
                .iter()
                .filter(|t| {
                    (t.created_by == user_uuid && t.company_id.is_none())
                        || (company_id.is_some() && t.company_id == company_id)
                })
                .cloned()
                .collect())
        }

        fn update_tag(&self, tag: &Tag) -> Result<(), DBError> {
            let mut tags = self.tags.lock().unwrap();
            let stored = tags
                .iter_mut()
                .find(|t| t.id == tag.id)
                .ok_or(DBError::TagNotFound)?;
            stored.name = tag.name.clone();
            stored.color = tag.color.clone();
            stored.description = tag.description.clone();
            stored.updated_at = Utc::now();
            Ok(())
        }

        fn delete_tag(&self, tag: &Tag) -> Result<(), DBError> {
            self.tags.lock().unwrap().retain(|t| t.id != tag.id);
            Ok(())
        }
    }
}

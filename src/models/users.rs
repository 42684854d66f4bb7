use crate::models::schema::users;
use crate::ApiError;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
    #[error("Duplicate email")]
    DuplicateEmail,
    #[error("Invite token already used")]
    InviteAlreadyUsed,
    #[error("Reset token already used")]
    ResetAlreadyUsed,
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                ApiError::InternalServerError
            }
            UserError::DuplicateEmail => ApiError::EmailAlreadyExists,
            UserError::InviteAlreadyUsed | UserError::ResetAlreadyUsed => ApiError::BadRequest,
        }
    }
}

#[derive(Queryable, Identifiable, AsChangeset, Deserialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub uuid: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub company_id: Option<i32>,
    pub pending_company_id: Option<i32>,
    pub invite_token_hash: Option<String>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub reset_token_hash: Option<String>,
    pub reset_expires_at: Option<DateTime<Utc>>,
    pub needs_password_reset: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Here we've implemented `Debug` manually to avoid accidentally logging the password hash.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("uuid", &self.uuid)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"[redacted]")
            .field("role", &self.role)
            .field("company_id", &self.company_id)
            .field("pending_company_id", &self.pending_company_id)
            .field("invite_expires_at", &self.invite_expires_at)
            .field("reset_expires_at", &self.reset_expires_at)
            .field("needs_password_reset", &self.needs_password_reset)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl User {
    pub fn get_by_id(conn: &mut PgConnection, lookup_id: i32) -> Result<Option<User>, UserError> {
        users::table
            .filter(users::id.eq(lookup_id))
            .first(conn)
            .optional()
            .map_err(UserError::DatabaseError)
    }

    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<User>, UserError> {
        users::table
            .filter(users::uuid.eq(lookup_uuid))
            .first(conn)
            .optional()
            .map_err(UserError::DatabaseError)
    }

    pub fn get_by_email(
        conn: &mut PgConnection,
        lookup_email: &str,
    ) -> Result<Option<User>, UserError> {
        users::table
            .filter(users::email.eq(lookup_email))
            .first(conn)
            .optional()
            .map_err(UserError::DatabaseError)
    }

    pub fn get_by_invite_token_hash(
        conn: &mut PgConnection,
        lookup_hash: &str,
    ) -> Result<Option<User>, UserError> {
        users::table
            .filter(users::invite_token_hash.eq(lookup_hash))
            .filter(users::invite_expires_at.gt(diesel::dsl::now))
            .first(conn)
            .optional()
            .map_err(UserError::DatabaseError)
    }

    pub fn get_by_reset_token_hash(
        conn: &mut PgConnection,
        lookup_hash: &str,
    ) -> Result<Option<User>, UserError> {
        users::table
            .filter(users::reset_token_hash.eq(lookup_hash))
            .filter(users::reset_expires_at.gt(diesel::dsl::now))
            .first(conn)
            .optional()
            .map_err(UserError::DatabaseError)
    }

    pub fn update(&self, conn: &mut PgConnection) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .set((
                users::name.eq(&self.name),
                users::role.eq(&self.role),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(UserError::DatabaseError)
    }

    pub fn update_password(
        &self,
        conn: &mut PgConnection,
        new_password_hash: String,
    ) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .set((
                users::password_hash.eq(new_password_hash),
                users::needs_password_reset.eq(false),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(UserError::DatabaseError)
    }

    pub fn set_company(
        &self,
        conn: &mut PgConnection,
        new_company_id: Option<i32>,
    ) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .set((
                users::company_id.eq(new_company_id),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(UserError::DatabaseError)
    }

    pub fn set_invite(
        &self,
        conn: &mut PgConnection,
        token_hash: &str,
        expires_at: DateTime<Utc>,
        target_company_id: i32,
    ) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .set((
                users::invite_token_hash.eq(token_hash),
                users::invite_expires_at.eq(expires_at),
                users::pending_company_id.eq(target_company_id),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(UserError::DatabaseError)
    }

    /// Clears the invite token only while one is still set, so a second
    /// acceptance of the same token fails instead of silently succeeding.
    pub fn consume_invite(&self, conn: &mut PgConnection) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .filter(users::invite_token_hash.is_not_null())
            .set((
                users::invite_token_hash.eq(None::<String>),
                users::invite_expires_at.eq(None::<DateTime<Utc>>),
                users::pending_company_id.eq(None::<i32>),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|rows| {
                if rows == 0 {
                    Err(UserError::InviteAlreadyUsed)
                } else {
                    Ok(())
                }
            })
            .map_err(UserError::DatabaseError)?
    }

    pub fn clear_invite(&self, conn: &mut PgConnection) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .set((
                users::invite_token_hash.eq(None::<String>),
                users::invite_expires_at.eq(None::<DateTime<Utc>>),
                users::pending_company_id.eq(None::<i32>),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(UserError::DatabaseError)
    }

    pub fn set_reset(
        &self,
        conn: &mut PgConnection,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .set((
                users::reset_token_hash.eq(token_hash),
                users::reset_expires_at.eq(expires_at),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(UserError::DatabaseError)
    }

    /// Sets the new password and clears the reset token in one statement; the
    /// token filter makes a reused token update zero rows.
    pub fn consume_reset(
        &self,
        conn: &mut PgConnection,
        new_password_hash: String,
    ) -> Result<(), UserError> {
        diesel::update(users::table)
            .filter(users::id.eq(self.id))
            .filter(users::reset_token_hash.is_not_null())
            .set((
                users::password_hash.eq(new_password_hash),
                users::reset_token_hash.eq(None::<String>),
                users::reset_expires_at.eq(None::<DateTime<Utc>>),
                users::needs_password_reset.eq(false),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|rows| {
                if rows == 0 {
                    Err(UserError::ResetAlreadyUsed)
                } else {
                    Ok(())
                }
            })
            .map_err(UserError::DatabaseError)?
    }
}

#[derive(Insertable, Deserialize, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub needs_password_reset: bool,
}

// Manual `Debug` for the same reason as `User`.
impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"[redacted]")
            .field("role", &self.role)
            .field("needs_password_reset", &self.needs_password_reset)
            .finish()
    }
}

impl NewUser {
    pub fn new(email: String, password_hash: String) -> Self {
        NewUser {
            email,
            name: None,
            password_hash,
            role: "member".to_string(),
            needs_password_reset: false,
        }
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_needs_password_reset(mut self) -> Self {
        self.needs_password_reset = true;
        self
    }

    pub fn insert(&self, conn: &mut PgConnection) -> Result<User, UserError> {
        diesel::insert_into(users::table)
            .values(self)
            .get_result::<User>(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => UserError::DuplicateEmail,
                e => UserError::DatabaseError(e),
            })
    }
}

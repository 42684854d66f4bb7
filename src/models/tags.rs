use crate::models::schema::tags;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
    #[error("Duplicate tag name")]
    DuplicateTag,
}

/// Label shared across a company, or personal to its creator when
/// `company_id` is null. Names compare case-insensitively.
#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = tags)]
pub struct Tag {
    pub id: i32,
    pub uuid: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub company_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub fn get_by_id(conn: &mut PgConnection, lookup_id: i32) -> Result<Option<Tag>, TagError> {
        tags::table
            .filter(tags::id.eq(lookup_id))
            .first::<Tag>(conn)
            .optional()
            .map_err(TagError::DatabaseError)
    }

    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<Tag>, TagError> {
        tags::table
            .filter(tags::uuid.eq(lookup_uuid))
            .first::<Tag>(conn)
            .optional()
            .map_err(TagError::DatabaseError)
    }

    /// Looks up a name inside one uniqueness scope: a company's tags, or the
    /// creator's personal tags when no company is given.
    pub fn find_in_scope(
        conn: &mut PgConnection,
        lookup_name: &str,
        scope_company_id: Option<i32>,
        creator_uuid: Uuid,
    ) -> Result<Option<Tag>, TagError> {
        let mut query = tags::table.into_boxed().filter(tags::name.eq(lookup_name));

        match scope_company_id {
            Some(company_id) => query = query.filter(tags::company_id.eq(company_id)),
            None => {
                query = query
                    .filter(tags::company_id.is_null())
                    .filter(tags::created_by.eq(creator_uuid))
            }
        }

        query
            .first::<Tag>(conn)
            .optional()
            .map_err(TagError::DatabaseError)
    }

    pub fn get_all_for_user(
        conn: &mut PgConnection,
        user_uuid: Uuid,
        member_company_id: Option<i32>,
    ) -> Result<Vec<Tag>, TagError> {
        let mut query = tags::table
            .into_boxed()
            .filter(tags::created_by.eq(user_uuid).and(tags::company_id.is_null()));

        if let Some(company_id) = member_company_id {
            query = query.or_filter(tags::company_id.eq(company_id));
        }

        query
            .order(tags::id.asc())
            .load::<Tag>(conn)
            .map_err(TagError::DatabaseError)
    }

    pub fn update(&self, conn: &mut PgConnection) -> Result<(), TagError> {
        diesel::update(tags::table)
            .filter(tags::id.eq(self.id))
            .set((
                tags::name.eq(&self.name),
                tags::color.eq(&self.color),
                tags::description.eq(&self.description),
                tags::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(TagError::DatabaseError)
    }

    pub fn delete(&self, conn: &mut PgConnection) -> Result<(), TagError> {
        diesel::delete(tags::table)
            .filter(tags::id.eq(self.id))
            .execute(conn)
            .map(|_| ())
            .map_err(TagError::DatabaseError)
    }
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = tags)]
pub struct NewTag {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub company_id: Option<i32>,
}

impl NewTag {
    pub fn new(name: String, created_by: Uuid) -> Self {
        NewTag {
            name,
            color: None,
            description: None,
            created_by,
            company_id: None,
        }
    }

    pub fn insert(&self, conn: &mut PgConnection) -> Result<Tag, TagError> {
        diesel::insert_into(tags::table)
            .values(self)
            .get_result::<Tag>(conn)
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => TagError::DuplicateTag,
                e => TagError::DatabaseError(e),
            })
    }
}

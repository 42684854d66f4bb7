use crate::models::schema::{companies, company_members, projects, tags, users, videos};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CompanyError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = companies)]
pub struct Company {
    pub id: i32,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub founded: Option<String>,
    pub location: Option<String>,
    pub logo_url: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn get_by_id(
        conn: &mut PgConnection,
        lookup_id: i32,
    ) -> Result<Option<Company>, CompanyError> {
        companies::table
            .filter(companies::id.eq(lookup_id))
            .first::<Company>(conn)
            .optional()
            .map_err(CompanyError::DatabaseError)
    }

    pub fn get_by_uuid(
        conn: &mut PgConnection,
        lookup_uuid: Uuid,
    ) -> Result<Option<Company>, CompanyError> {
        companies::table
            .filter(companies::uuid.eq(lookup_uuid))
            .first::<Company>(conn)
            .optional()
            .map_err(CompanyError::DatabaseError)
    }

    /// Companies the user belongs to. The owner always has a membership row,
    /// so a single join covers owned and joined companies alike.
    pub fn get_all_for_member(
        conn: &mut PgConnection,
        member_uuid: Uuid,
    ) -> Result<Vec<Company>, CompanyError> {
        companies::table
            .inner_join(company_members::table)
            .filter(company_members::user_id.eq(member_uuid))
            .select(companies::all_columns)
            .order(companies::id.asc())
            .load::<Company>(conn)
            .map_err(CompanyError::DatabaseError)
    }

    pub fn update(&self, conn: &mut PgConnection) -> Result<(), CompanyError> {
        diesel::update(companies::table)
            .filter(companies::id.eq(self.id))
            .set((
                companies::name.eq(&self.name),
                companies::description.eq(&self.description),
                companies::website.eq(&self.website),
                companies::industry.eq(&self.industry),
                companies::size.eq(&self.size),
                companies::founded.eq(&self.founded),
                companies::location.eq(&self.location),
                companies::logo_url.eq(&self.logo_url),
                companies::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(CompanyError::DatabaseError)
    }

    /// Deletes the company, its member rows, and every reference other rows
    /// hold to it. Pending invites into the company are voided.
    pub fn delete(&self, conn: &mut PgConnection) -> Result<(), CompanyError> {
        conn.transaction(|conn| {
            diesel::delete(company_members::table)
                .filter(company_members::company_id.eq(self.id))
                .execute(conn)?;

            diesel::update(users::table)
                .filter(users::company_id.eq(self.id))
                .set(users::company_id.eq(None::<i32>))
                .execute(conn)?;

            diesel::update(users::table)
                .filter(users::pending_company_id.eq(self.id))
                .set((
                    users::pending_company_id.eq(None::<i32>),
                    users::invite_token_hash.eq(None::<String>),
                    users::invite_expires_at.eq(None::<DateTime<Utc>>),
                ))
                .execute(conn)?;

            diesel::update(projects::table)
                .filter(projects::company_id.eq(self.id))
                .set(projects::company_id.eq(None::<i32>))
                .execute(conn)?;

            diesel::update(videos::table)
                .filter(videos::company_id.eq(self.id))
                .set(videos::company_id.eq(None::<i32>))
                .execute(conn)?;

            diesel::update(tags::table)
                .filter(tags::company_id.eq(self.id))
                .set(tags::company_id.eq(None::<i32>))
                .execute(conn)?;

            diesel::delete(companies::table)
                .filter(companies::id.eq(self.id))
                .execute(conn)?;

            Ok(())
        })
        .map_err(CompanyError::DatabaseError)
    }
}

#[derive(Insertable, Deserialize, Clone, Debug)]
#[diesel(table_name = companies)]
pub struct NewCompany {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub founded: Option<String>,
    pub location: Option<String>,
    pub logo_url: Option<String>,
    pub owner_id: Uuid,
}

impl NewCompany {
    pub fn new(name: String, owner_id: Uuid) -> Self {
        NewCompany {
            name,
            description: None,
            website: None,
            industry: None,
            size: None,
            founded: None,
            location: None,
            logo_url: None,
            owner_id,
        }
    }

    pub fn insert(&self, conn: &mut PgConnection) -> Result<Company, CompanyError> {
        diesel::insert_into(companies::table)
            .values(self)
            .get_result::<Company>(conn)
            .map_err(CompanyError::DatabaseError)
    }
}

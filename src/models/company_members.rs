use crate::models::schema::{company_members, users};
use crate::models::users::User;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CompanyMemberError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CompanyRole {
    Owner,
    Admin,
    Manager,
    Member,
}

impl CompanyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyRole::Owner => "owner",
            CompanyRole::Admin => "admin",
            CompanyRole::Manager => "manager",
            CompanyRole::Member => "member",
        }
    }
}

impl From<String> for CompanyRole {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "owner" => CompanyRole::Owner,
            "admin" => CompanyRole::Admin,
            "manager" => CompanyRole::Manager,
            "member" => CompanyRole::Member,
            _ => CompanyRole::Member, // Default to lowest privilege
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Active,
    Pending,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Pending => "pending",
        }
    }
}

impl From<String> for MemberStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "active" => MemberStatus::Active,
            "pending" => MemberStatus::Pending,
            _ => MemberStatus::Pending,
        }
    }
}

/// One row per (company, user) pair; re-inviting a pending member rewrites
/// this row instead of growing a list of invitations.
#[derive(Queryable, Identifiable, AsChangeset, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = company_members)]
pub struct CompanyMember {
    pub id: i32,
    pub company_id: i32,
    pub user_id: Uuid,
    #[serde(with = "role_string")]
    pub role: String,
    #[serde(with = "status_string")]
    pub status: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub invited_by: Option<Uuid>,
    #[serde(skip_serializing, default)]
    pub invite_token_hash: Option<String>,
    pub invite_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Custom serialization for role field
mod role_string {
    use super::CompanyRole;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(role: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let role_enum: CompanyRole = role.to_owned().into();
        role_enum.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let role_enum = CompanyRole::deserialize(deserializer)?;
        Ok(role_enum.as_str().to_string())
    }
}

// Custom serialization for status field
mod status_string {
    use super::MemberStatus;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(status: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let status_enum: MemberStatus = status.to_owned().into();
        status_enum.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let status_enum = MemberStatus::deserialize(deserializer)?;
        Ok(status_enum.as_str().to_string())
    }
}

impl CompanyMember {
    pub fn role(&self) -> CompanyRole {
        CompanyRole::from(self.role.clone())
    }

    pub fn status(&self) -> MemberStatus {
        MemberStatus::from(self.status.clone())
    }

    pub fn get_by_company_and_user(
        conn: &mut PgConnection,
        lookup_company_id: i32,
        lookup_user_id: Uuid,
    ) -> Result<Option<CompanyMember>, CompanyMemberError> {
        company_members::table
            .filter(company_members::company_id.eq(lookup_company_id))
            .filter(company_members::user_id.eq(lookup_user_id))
            .first::<CompanyMember>(conn)
            .optional()
            .map_err(CompanyMemberError::DatabaseError)
    }

    pub fn get_all_for_company(
        conn: &mut PgConnection,
        lookup_company_id: i32,
    ) -> Result<Vec<CompanyMember>, CompanyMemberError> {
        company_members::table
            .filter(company_members::company_id.eq(lookup_company_id))
            .order(company_members::id.asc())
            .load::<CompanyMember>(conn)
            .map_err(CompanyMemberError::DatabaseError)
    }

    pub fn get_all_for_company_with_users(
        conn: &mut PgConnection,
        lookup_company_id: i32,
    ) -> Result<Vec<(CompanyMember, User)>, CompanyMemberError> {
        company_members::table
            .inner_join(users::table.on(users::uuid.eq(company_members::user_id)))
            .filter(company_members::company_id.eq(lookup_company_id))
            .select((company_members::all_columns, users::all_columns))
            .order(company_members::id.asc())
            .load::<(CompanyMember, User)>(conn)
            .map_err(CompanyMemberError::DatabaseError)
    }

    /// Flips the row to active, stamps joined_at if it was never set, and
    /// clears the invite token.
    pub fn activate(&self, conn: &mut PgConnection) -> Result<(), CompanyMemberError> {
        let joined = self.joined_at.unwrap_or_else(Utc::now);
        diesel::update(company_members::table)
            .filter(company_members::id.eq(self.id))
            .set((
                company_members::status.eq(MemberStatus::Active.as_str()),
                company_members::joined_at.eq(joined),
                company_members::invite_token_hash.eq(None::<String>),
                company_members::invite_expires_at.eq(None::<DateTime<Utc>>),
                company_members::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(CompanyMemberError::DatabaseError)
    }

    pub fn update_role(
        &self,
        conn: &mut PgConnection,
        new_role: CompanyRole,
    ) -> Result<(), CompanyMemberError> {
        diesel::update(company_members::table)
            .filter(company_members::id.eq(self.id))
            .set((
                company_members::role.eq(new_role.as_str()),
                company_members::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .map(|_| ())
            .map_err(CompanyMemberError::DatabaseError)
    }

    pub fn delete(&self, conn: &mut PgConnection) -> Result<(), CompanyMemberError> {
        diesel::delete(company_members::table)
            .filter(company_members::id.eq(self.id))
            .execute(conn)
            .map(|_| ())
            .map_err(CompanyMemberError::DatabaseError)
    }
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = company_members)]
pub struct NewCompanyMember {
    pub company_id: i32,
    pub user_id: Uuid,
    pub role: String,
    pub status: String,
    pub joined_at: Option<DateTime<Utc>>,
    pub invited_by: Option<Uuid>,
    pub invite_token_hash: Option<String>,
    pub invite_expires_at: Option<DateTime<Utc>>,
}

impl NewCompanyMember {
    /// An already-active member, joined as of now.
    pub fn new(company_id: i32, user_id: Uuid, role: CompanyRole) -> Self {
        NewCompanyMember {
            company_id,
            user_id,
            role: role.as_str().to_string(),
            status: MemberStatus::Active.as_str().to_string(),
            joined_at: Some(Utc::now()),
            invited_by: None,
            invite_token_hash: None,
            invite_expires_at: None,
        }
    }

    /// A member awaiting invite acceptance.
    pub fn pending(company_id: i32, user_id: Uuid, role: CompanyRole) -> Self {
        NewCompanyMember {
            company_id,
            user_id,
            role: role.as_str().to_string(),
            status: MemberStatus::Pending.as_str().to_string(),
            joined_at: None,
            invited_by: None,
            invite_token_hash: None,
            invite_expires_at: None,
        }
    }

    pub fn with_invited_by(mut self, inviter: Uuid) -> Self {
        self.invited_by = Some(inviter);
        self
    }

    pub fn with_invite_token(mut self, token_hash: String, expires_at: DateTime<Utc>) -> Self {
        self.invite_token_hash = Some(token_hash);
        self.invite_expires_at = Some(expires_at);
        self
    }

    /// Single write path for the member map: inserts the (company, user) row
    /// or rewrites the existing one in place.
    pub fn upsert(&self, conn: &mut PgConnection) -> Result<CompanyMember, CompanyMemberError> {
        diesel::insert_into(company_members::table)
            .values(self)
            .on_conflict((company_members::company_id, company_members::user_id))
            .do_update()
            .set((
                company_members::role.eq(&self.role),
                company_members::status.eq(&self.status),
                company_members::joined_at.eq(self.joined_at),
                company_members::invited_by.eq(self.invited_by),
                company_members::invite_token_hash.eq(&self.invite_token_hash),
                company_members::invite_expires_at.eq(self.invite_expires_at),
                company_members::updated_at.eq(diesel::dsl::now),
            ))
            .get_result::<CompanyMember>(conn)
            .map_err(CompanyMemberError::DatabaseError)
    }
}

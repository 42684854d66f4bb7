use crate::access::{can_perform, Action, Target};
use crate::email::send_invitation_email;
use crate::email::send_password_reset_confirmation_email;
use crate::email::send_password_reset_email;
use crate::jwt::validate_jwt;
use crate::models::companies::{Company, NewCompany};
use crate::models::company_members::{CompanyMember, CompanyRole, MemberStatus, NewCompanyMember};
use crate::web::{
    auth_routes, company_routes, health_routes, me_routes, project_routes, tag_routes, team_routes,
    video_routes,
};
use crate::{
    db::{setup_db, DBConnection, DBError},
    models::users::{NewUser, User, UserError},
};
use axum::{
    http::{Method, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use password_auth::{generate_hash, verify_password};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::{self};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod access;
mod db;
mod email;
mod jwt;
mod models;
mod web;

const INVITE_TOKEN_EXPIRY_DAYS: i64 = 7;
const RESET_TOKEN_EXPIRY_HOURS: i64 = 1;
const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    TaskJoin(#[from] task::JoinError),

    #[error(transparent)]
    StdIo(#[from] std::io::Error),

    #[error(transparent)]
    TryInit(#[from] tracing_subscriber::util::TryInitError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DBError),

    #[error("User not found")]
    UserNotFound,

    #[error("Builder error: {0}")]
    BuilderError(String),

    #[error("User with this email already exists")]
    UserAlreadyExists,

    #[error("User is already a member of this company")]
    AlreadyMember,

    #[error("Company member not found")]
    MemberNotFound,

    #[error("The company owner's membership cannot be changed")]
    CannotModifyOwner,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Password is required to accept this invitation")]
    PasswordRequired,

    #[error("Password must be at least 8 characters")]
    WeakPassword,

    #[error("Insufficient privileges")]
    InsufficientPrivileges,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid email or password")]
    InvalidUsernameOrPassword,

    #[error("Invalid JWT")]
    InvalidJwt,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal server error")]
    InternalServerError,

    #[error("Bad Request")]
    BadRequest,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Password must be at least 8 characters")]
    WeakPassword,

    #[error("Password is required to accept this invitation")]
    PasswordRequired,

    #[error("User not found")]
    UserNotFound,

    #[error("Resource not found")]
    NotFound,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("User is already a member of this company")]
    AlreadyMember,

    #[error("A tag with this name already exists")]
    DuplicateTagName,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            ApiError::InvalidUsernameOrPassword => StatusCode::UNAUTHORIZED,
            ApiError::InvalidJwt => StatusCode::UNAUTHORIZED,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
            ApiError::WeakPassword => StatusCode::BAD_REQUEST,
            ApiError::PasswordRequired => StatusCode::BAD_REQUEST,
            ApiError::UserNotFound => StatusCode::NOT_FOUND,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::EmailAlreadyExists => StatusCode::CONFLICT,
            ApiError::AlreadyMember => StatusCode::CONFLICT,
            ApiError::DuplicateTagName => StatusCode::CONFLICT,
        };
        (
            status,
            Json(ErrorResponse {
                status: status.as_u16(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<DBError> for ApiError {
    fn from(err: DBError) -> Self {
        error!("Database error: {:?}", err);
        match err {
            DBError::UserNotFound => ApiError::UserNotFound,
            DBError::UserError(UserError::DuplicateEmail) => ApiError::EmailAlreadyExists,
            DBError::CompanyNotFound
            | DBError::CompanyMemberNotFound
            | DBError::ProjectNotFound
            | DBError::VideoNotFound
            | DBError::TagNotFound => ApiError::NotFound,
            _ => ApiError::InternalServerError,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    status: u16,
    message: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    jwt_keys: jwt::JwtKeys,
    access_token_maxage: i64,
    refresh_token_maxage: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Local,
    Dev,
    Preview,
    Prod,
    Custom(String),
}

impl AppMode {
    fn frontend_url(&self) -> &str {
        match self {
            AppMode::Local => "http://localhost:5173",
            AppMode::Dev => "https://dev.reelflow.app",
            AppMode::Preview => "https://preview.reelflow.app",
            AppMode::Prod => "https://reelflow.app",
            AppMode::Custom(_) => "https://preview.reelflow.app",
        }
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppMode::Local => write!(f, "local"),
            AppMode::Dev => write!(f, "dev"),
            AppMode::Preview => write!(f, "preview"),
            AppMode::Prod => write!(f, "prod"),
            AppMode::Custom(_) => write!(f, "custom"),
        }
    }
}

impl FromStr for AppMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(AppMode::Local),
            "dev" => Ok(AppMode::Dev),
            "preview" => Ok(AppMode::Preview),
            "prod" => Ok(AppMode::Prod),
            "custom" => {
                // For custom mode, get the ENV_NAME
                match std::env::var("ENV_NAME") {
                    Ok(env_name) => Ok(AppMode::Custom(env_name)),
                    Err(_) => Err("ENV_NAME must be set when using custom mode".to_string()),
                }
            }
            _ => Err(format!("Invalid app mode: {}", s)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    app_mode: AppMode,
    db: Arc<dyn DBConnection + Send + Sync>,
    config: Config,
    resend_api_key: Option<String>,
}

#[derive(Default)]
pub struct AppStateBuilder {
    app_mode: Option<AppMode>,
    db: Option<Arc<dyn DBConnection + Send + Sync>>,
    jwt_secret: Option<String>,
    resend_api_key: Option<String>,
}

impl AppStateBuilder {
    pub fn app_mode(mut self, app_mode: AppMode) -> Self {
        self.app_mode = Some(app_mode);
        self
    }

    pub fn db(mut self, db: Arc<dyn DBConnection + Send + Sync>) -> Self {
        self.db = Some(db);
        self
    }

    pub fn jwt_secret(mut self, jwt_secret: String) -> Self {
        self.jwt_secret = Some(jwt_secret);
        self
    }

    pub fn resend_api_key(mut self, resend_api_key: Option<String>) -> Self {
        self.resend_api_key = resend_api_key;
        self
    }

    pub async fn build(self) -> Result<AppState, Error> {
        let app_mode = self
            .app_mode
            .ok_or(Error::BuilderError("app_mode is required".to_string()))?;
        let db = self
            .db
            .ok_or(Error::BuilderError("db is required".to_string()))?;
        let jwt_secret = self
            .jwt_secret
            .ok_or(Error::BuilderError("jwt_secret is required".to_string()))?;

        let config = Config {
            jwt_keys: jwt::JwtKeys::new(jwt_secret.into_bytes()),
            access_token_maxage: 60,  // 60 minutes
            refresh_token_maxage: 30, // 30 days
        };

        Ok(AppState {
            app_mode,
            db,
            config,
            resend_api_key: self.resend_api_key,
        })
    }
}

/// How an invite request was satisfied: a known account joins on the spot,
/// everyone else gets an emailed invitation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InviteOutcome {
    DirectAdd,
    InvitationSent,
}

impl InviteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InviteOutcome::DirectAdd => "direct_add",
            InviteOutcome::InvitationSent => "invitation_sent",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcceptedInvite {
    pub email: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub needs_password_reset: bool,
}

impl AppState {
    async fn register_user(
        &self,
        name: String,
        email: String,
        password: String,
        company_name: String,
    ) -> Result<(User, Company), Error> {
        let email = email.trim().to_lowercase();

        match self.db.get_user_by_email(&email) {
            Ok(Some(_)) => return Err(Error::UserAlreadyExists),
            Ok(None) => {}
            Err(e) => return Err(Error::DatabaseError(e)),
        }

        // Hashing the password is blocking and potentially slow, so we'll do
        // so via `spawn_blocking`.
        let password_hash = task::spawn_blocking(move || generate_hash(password)).await?;

        tracing::debug!("registering new user: {}", email);

        let new_user = NewUser::new(email, password_hash).with_name(name);
        let user = self.db.create_user(new_user)?;

        // Every account starts with a company it owns
        let company = self
            .db
            .create_company_with_owner(NewCompany::new(company_name, user.uuid))?;
        self.db.set_user_company(&user, Some(company.id))?;

        let user = self.db.get_user_by_uuid(user.uuid)?;

        tracing::info!("registered new user: {} {}", user.email, user.uuid);

        Ok((user, company))
    }

    async fn authenticate_user(
        &self,
        email: String,
        password: String,
    ) -> Result<Option<User>, Error> {
        let email = email.trim().to_lowercase();

        let user = match self.db.get_user_by_email(&email)? {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown email");
                return Ok(None);
            }
        };

        // Verifying the password is blocking and potentially slow, so we'll
        // do so via `spawn_blocking`.
        let password_hash = user.password_hash.clone();
        let res = task::spawn_blocking(move || verify_password(password, &password_hash)).await?;

        match res {
            Ok(_) => Ok(Some(user)),
            Err(_) => Ok(None),
        }
    }

    async fn get_user(&self, user_uuid: Uuid) -> Result<User, Error> {
        let user = self
            .db
            .get_user_by_uuid(user_uuid)
            .map_err(|_| Error::UserNotFound)?;
        Ok(user)
    }

    async fn request_password_reset(&self, email: String) -> Result<(), Error> {
        let email = email.trim().to_lowercase();

        match self.db.get_user_by_email(&email)? {
            Some(user) => {
                let reset_token = generate_token();
                let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_EXPIRY_HOURS);
                self.db
                    .set_user_reset(&user, &hash_token(&reset_token), expires_at)?;

                // Send the actual email in the background
                let app_mode = self.app_mode.clone();
                let resend_api_key = self.resend_api_key.clone();
                let user_email = user.email.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        send_password_reset_email(app_mode, resend_api_key, user_email, reset_token)
                            .await
                    {
                        error!("Failed to send password reset email: {:?}", e);
                    }
                });
            }
            None => {
                // The caller must not learn whether the email has an account
                debug!("Password reset requested for non-existent email: {}", email);
            }
        }

        Ok(())
    }

    async fn lookup_password_reset(&self, token: &str) -> Result<User, Error> {
        self.db
            .get_user_by_reset_token(&hash_token(token))?
            .ok_or(Error::InvalidOrExpiredToken)
    }

    async fn reset_password(&self, token: String, new_password: String) -> Result<User, Error> {
        let user = self
            .db
            .get_user_by_reset_token(&hash_token(&token))?
            .ok_or(Error::InvalidOrExpiredToken)?;

        ensure_password_strength(&new_password)?;

        let password_hash = task::spawn_blocking(move || generate_hash(new_password)).await?;
        self.db.consume_user_reset(&user, password_hash)?;

        // Send confirmation email in the background
        let app_mode = self.app_mode.clone();
        let resend_api_key = self.resend_api_key.clone();
        let user_email = user.email.clone();
        tokio::spawn(async move {
            if let Err(e) =
                send_password_reset_confirmation_email(app_mode, resend_api_key, user_email).await
            {
                error!("Failed to send password reset confirmation email: {:?}", e);
            }
        });

        self.get_user(user.uuid).await
    }

    /// Company-scoped invite endpoint: an existing account is attached to the
    /// company immediately, an unknown email gets an invitation.
    async fn add_or_invite_member(
        &self,
        company: &Company,
        actor: &User,
        email: String,
        name: Option<String>,
        role: CompanyRole,
    ) -> Result<InviteOutcome, Error> {
        self.ensure_member_action(company, actor, Action::InviteMember)?;

        let email = email.trim().to_lowercase();

        match self.db.get_user_by_email(&email)? {
            Some(target_user) => {
                if let Some(member) = self.db.get_company_member(company.id, target_user.uuid)? {
                    if member.status() == MemberStatus::Active {
                        return Err(Error::AlreadyMember);
                    }
                }

                let new_member = NewCompanyMember::new(company.id, target_user.uuid, role)
                    .with_invited_by(actor.uuid);
                // Only an account without a home company adopts this one
                let new_company_id = if target_user.company_id.is_none() {
                    Some(company.id)
                } else {
                    None
                };
                self.db
                    .add_member_transaction(new_member, &target_user, new_company_id)?;

                tracing::info!("added member {} to {}", target_user.email, company.name);

                Ok(InviteOutcome::DirectAdd)
            }
            None => {
                let target_user = self.create_placeholder_user(email, name).await?;
                self.send_invite(company, actor, &target_user, role).await?;
                Ok(InviteOutcome::InvitationSent)
            }
        }
    }

    /// Invitation-only variant: every address goes through the token round
    /// trip, creating a placeholder account first when none exists.
    async fn invite_team_member(
        &self,
        company: &Company,
        actor: &User,
        email: String,
        name: Option<String>,
        role: CompanyRole,
    ) -> Result<(), Error> {
        self.ensure_member_action(company, actor, Action::InviteMember)?;

        let email = email.trim().to_lowercase();

        let target_user = match self.db.get_user_by_email(&email)? {
            Some(user) => user,
            None => self.create_placeholder_user(email, name).await?,
        };

        if let Some(member) = self.db.get_company_member(company.id, target_user.uuid)? {
            if member.status() == MemberStatus::Active {
                return Err(Error::AlreadyMember);
            }
        }

        self.send_invite(company, actor, &target_user, role).await
    }

    async fn accept_invitation(
        &self,
        token: String,
        name: Option<String>,
        password: Option<String>,
    ) -> Result<AcceptedInvite, Error> {
        let user = self
            .db
            .get_user_by_invite_token(&hash_token(&token))?
            .ok_or(Error::InvalidOrExpiredToken)?;

        // A placeholder account has no usable credential yet, so the invite
        // must supply one
        let new_password_hash = match password {
            Some(password) => {
                ensure_password_strength(&password)?;
                Some(task::spawn_blocking(move || generate_hash(password)).await?)
            }
            None if user.needs_password_reset => return Err(Error::PasswordRequired),
            None => None,
        };

        let company_id = match user.pending_company_id {
            Some(company_id) => company_id,
            None => {
                error!("Invite token for user {} has no pending company", user.uuid);
                return Err(Error::InvalidOrExpiredToken);
            }
        };

        let company = self.db.get_company_by_id(company_id)?;
        let member = match self.db.get_company_member(company.id, user.uuid)? {
            Some(member) => member,
            None => {
                // Recreate the pending row if it went missing, so activation
                // has a row to flip
                self.db.upsert_company_member(NewCompanyMember::pending(
                    company.id,
                    user.uuid,
                    CompanyRole::Member,
                ))?
            }
        };

        let new_company_id = if user.company_id.is_none() {
            Some(company.id)
        } else {
            None
        };

        self.db
            .accept_invite_transaction(&user, &member, new_company_id, name, new_password_hash)?;

        let user = self.db.get_user_by_uuid(user.uuid)?;

        tracing::info!("invite accepted: {} joined {}", user.email, company.name);

        Ok(AcceptedInvite {
            email: user.email.clone(),
            name: user.name.clone(),
            company_name: Some(company.name.clone()),
            needs_password_reset: user.needs_password_reset,
        })
    }

    /// Role changes are reserved for the company owner.
    async fn update_member_role(
        &self,
        company: &Company,
        actor: &User,
        target_user_id: Uuid,
        role: CompanyRole,
    ) -> Result<CompanyMember, Error> {
        if company.owner_id != actor.uuid {
            return Err(Error::InsufficientPrivileges);
        }

        let member = self
            .db
            .get_company_member(company.id, target_user_id)?
            .ok_or(Error::MemberNotFound)?;

        // The owner's own row stays owner
        if target_user_id == company.owner_id && role != CompanyRole::Owner {
            return Err(Error::CannotModifyOwner);
        }

        self.db.update_member_role(&member, role)?;

        self.db
            .get_company_member(company.id, target_user_id)?
            .ok_or(Error::MemberNotFound)
    }

    async fn remove_member(
        &self,
        company: &Company,
        actor: &User,
        target_user_id: Uuid,
    ) -> Result<(), Error> {
        self.ensure_member_action(company, actor, Action::RemoveMember)?;

        let member = self
            .db
            .get_company_member(company.id, target_user_id)?
            .ok_or(Error::MemberNotFound)?;

        if target_user_id == company.owner_id {
            return Err(Error::CannotModifyOwner);
        }

        let target_user = self.db.get_user_by_uuid(target_user_id)?;

        let clear_company = target_user.company_id == Some(company.id);
        // A pending target loses its outstanding invite along with the row
        let clear_invite = member.status() == MemberStatus::Pending
            && target_user.pending_company_id == Some(company.id);

        self.db
            .remove_member_transaction(&member, &target_user, clear_company, clear_invite)?;

        tracing::info!("removed member {} from {}", target_user.email, company.name);

        Ok(())
    }

    fn ensure_member_action(
        &self,
        company: &Company,
        actor: &User,
        action: Action,
    ) -> Result<(), Error> {
        let membership = self.db.get_company_member(company.id, actor.uuid)?;
        let target = Target::Company {
            company,
            membership: membership.as_ref(),
        };
        if !can_perform(actor, &target, action) {
            return Err(Error::InsufficientPrivileges);
        }
        Ok(())
    }

    /// A placeholder account that cannot log in until its invite sets a real
    /// password.
    async fn create_placeholder_user(
        &self,
        email: String,
        name: Option<String>,
    ) -> Result<User, Error> {
        let placeholder_hash = task::spawn_blocking(|| generate_hash(generate_token())).await?;
        let mut new_user = NewUser::new(email, placeholder_hash).with_needs_password_reset();
        if let Some(name) = name {
            new_user = new_user.with_name(name);
        }
        Ok(self.db.create_user(new_user)?)
    }

    /// Issues a fresh invite token for the target and mails the acceptance
    /// link. Re-inviting replaces any previous pending token for the company.
    async fn send_invite(
        &self,
        company: &Company,
        actor: &User,
        target_user: &User,
        role: CompanyRole,
    ) -> Result<(), Error> {
        let invite_token = generate_token();
        let token_hash = hash_token(&invite_token);
        let expires_at = Utc::now() + Duration::days(INVITE_TOKEN_EXPIRY_DAYS);

        self.db
            .set_user_invite(target_user, &token_hash, expires_at, company.id)?;

        let pending = NewCompanyMember::pending(company.id, target_user.uuid, role)
            .with_invited_by(actor.uuid)
            .with_invite_token(token_hash, expires_at);
        self.db.upsert_company_member(pending)?;

        // Delivery failures are logged, not surfaced; the invite can be
        // re-sent
        let app_mode = self.app_mode.clone();
        let resend_api_key = self.resend_api_key.clone();
        let to_email = target_user.email.clone();
        let company_name = company.name.clone();
        tokio::spawn(async move {
            if let Err(e) = send_invitation_email(
                app_mode,
                resend_api_key,
                to_email,
                company_name,
                invite_token,
            )
            .await
            {
                error!("Failed to send invitation email: {:?}", e);
            }
        });

        Ok(())
    }
}

fn generate_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    const TOKEN_LEN: usize = 32;

    let mut random_bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill(&mut random_bytes[..]);

    random_bytes
        .iter()
        .map(|&b| CHARSET[b as usize % CHARSET.len()] as char)
        .collect()
}

/// Only this digest is ever stored; a leaked database row does not expose a
/// live invite or reset link.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn ensure_password_strength(password: &str) -> Result<(), Error> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(Error::WeakPassword);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::debug!("Starting application");

    // Load .env file
    dotenv::dotenv().ok();

    let app_mode = std::env::var("APP_MODE")
        .unwrap_or_else(|_| "local".to_string())
        .parse::<AppMode>()
        .expect("Invalid APP_MODE");

    tracing_subscriber::registry()
        .with(EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
            |_| "reelflow=debug,tower_http=debug".into(),
        )))
        .with(tracing_subscriber::fmt::layer().with_ansi(false))
        .try_init()?;

    let pg_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = setup_db(pg_url);

    let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");

    let resend_api_key = std::env::var("RESEND_API_KEY").ok();
    if resend_api_key.is_none() {
        warn!("RESEND_API_KEY not set, transactional email is disabled");
    }

    let app_state = AppStateBuilder::default()
        .app_mode(app_mode.clone())
        .db(db)
        .jwt_secret(jwt_secret)
        .resend_api_key(resend_api_key)
        .build()
        .await?;
    tracing::info!("App state created, app_mode: {:?}", app_mode);

    let app_state = Arc::new(app_state);

    let cors = CorsLayer::new()
        // allow the standard REST verbs when accessing the resource
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        // allow all headers
        .allow_headers(Any)
        // allow requests from any origin
        .allow_origin(Any);

    let app = me_routes(app_state.clone())
        .merge(company_routes(app_state.clone()))
        .merge(team_routes(app_state.clone()))
        .merge(project_routes(app_state.clone()))
        .merge(video_routes(app_state.clone()))
        .merge(tag_routes(app_state.clone()))
        .route_layer(from_fn_with_state(app_state.clone(), validate_jwt))
        .merge(health_routes(app_state.clone()))
        .merge(auth_routes(app_state.clone()))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();

    tracing::info!("Listening on http://localhost:3000");

    Ok(axum::serve(listener, app.into_make_service()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::MockDb;

    async fn test_state() -> AppState {
        AppStateBuilder::default()
            .app_mode(AppMode::Local)
            .db(Arc::new(MockDb::new()))
            .jwt_secret("0123456789abcdef0123456789abcdef".to_string())
            .build()
            .await
            .unwrap()
    }

    async fn signup(state: &AppState, email: &str, company: &str) -> (User, Company) {
        state
            .register_user(
                "Avery".to_string(),
                email.to_string(),
                "correct horse battery".to_string(),
                company.to_string(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn signup_creates_owner_membership() {
        let state = test_state().await;
        let (user, company) = signup(&state, "owner@example.com", "Acme Studio").await;

        assert_eq!(user.company_id, Some(company.id));

        let member = state
            .db
            .get_company_member(company.id, user.uuid)
            .unwrap()
            .unwrap();
        assert_eq!(member.role(), CompanyRole::Owner);
        assert_eq!(member.status(), MemberStatus::Active);
        assert!(member.joined_at.is_some());
    }

    #[tokio::test]
    async fn signup_normalizes_email_and_rejects_duplicates() {
        let state = test_state().await;
        let (user, _) = signup(&state, "  Casey@Example.COM ", "Acme Studio").await;
        assert_eq!(user.email, "casey@example.com");

        let err = state
            .register_user(
                "Casey".to_string(),
                "casey@example.com".to_string(),
                "another password".to_string(),
                "Other Co".to_string(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserAlreadyExists));
    }

    #[tokio::test]
    async fn login_verifies_password() {
        let state = test_state().await;
        signup(&state, "login@example.com", "Acme Studio").await;

        let user = state
            .authenticate_user(
                "login@example.com".to_string(),
                "correct horse battery".to_string(),
            )
            .await
            .unwrap();
        assert!(user.is_some());

        let rejected = state
            .authenticate_user(
                "login@example.com".to_string(),
                "wrong password".to_string(),
            )
            .await
            .unwrap();
        assert!(rejected.is_none());

        let unknown = state
            .authenticate_user(
                "nobody@example.com".to_string(),
                "whatever else".to_string(),
            )
            .await
            .unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn invite_unknown_email_creates_placeholder() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;

        let outcome = state
            .add_or_invite_member(
                &company,
                &owner,
                "new.editor@example.com".to_string(),
                Some("Robin".to_string()),
                CompanyRole::Member,
            )
            .await
            .unwrap();
        assert_eq!(outcome, InviteOutcome::InvitationSent);

        let invited = state
            .db
            .get_user_by_email("new.editor@example.com")
            .unwrap()
            .unwrap();
        assert!(invited.needs_password_reset);
        assert!(invited.invite_token_hash.is_some());
        assert_eq!(invited.pending_company_id, Some(company.id));

        let member = state
            .db
            .get_company_member(company.id, invited.uuid)
            .unwrap()
            .unwrap();
        assert_eq!(member.status(), MemberStatus::Pending);
        assert_eq!(member.invited_by, Some(owner.uuid));
        assert_eq!(member.invite_token_hash, invited.invite_token_hash);
    }

    #[tokio::test]
    async fn existing_account_is_added_directly() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;
        let (other, other_company) = signup(&state, "pal@example.com", "Pal Films").await;

        let outcome = state
            .add_or_invite_member(
                &company,
                &owner,
                "pal@example.com".to_string(),
                None,
                CompanyRole::Manager,
            )
            .await
            .unwrap();
        assert_eq!(outcome, InviteOutcome::DirectAdd);

        let member = state
            .db
            .get_company_member(company.id, other.uuid)
            .unwrap()
            .unwrap();
        assert_eq!(member.status(), MemberStatus::Active);
        assert_eq!(member.role(), CompanyRole::Manager);

        // The home company reference is not stolen from an existing account
        let other = state.db.get_user_by_uuid(other.uuid).unwrap();
        assert_eq!(other.company_id, Some(other_company.id));

        let err = state
            .add_or_invite_member(
                &company,
                &owner,
                "pal@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyMember));
    }

    #[tokio::test]
    async fn invitation_requires_invite_privilege() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;
        let (outsider, _) = signup(&state, "out@example.com", "Out Co").await;

        let err = state
            .invite_team_member(
                &company,
                &outsider,
                "someone@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPrivileges));

        // Managers may remove members but not invite them
        state
            .add_or_invite_member(
                &company,
                &owner,
                "out@example.com".to_string(),
                None,
                CompanyRole::Manager,
            )
            .await
            .unwrap();
        let err = state
            .invite_team_member(
                &company,
                &outsider,
                "someone@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPrivileges));
    }

    #[tokio::test]
    async fn accept_invitation_round_trip() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;

        state
            .invite_team_member(
                &company,
                &owner,
                "editor@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();

        // Swap in a token we know, the way the emailed link would carry it
        let invited = state
            .db
            .get_user_by_email("editor@example.com")
            .unwrap()
            .unwrap();
        let expires_at = Utc::now() + Duration::days(INVITE_TOKEN_EXPIRY_DAYS);
        state
            .db
            .set_user_invite(&invited, &hash_token("known-token"), expires_at, company.id)
            .unwrap();

        let accepted = state
            .accept_invitation(
                "known-token".to_string(),
                Some("Robin".to_string()),
                Some("a fresh password".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(accepted.email, "editor@example.com");
        assert_eq!(accepted.company_name.as_deref(), Some("Acme Studio"));
        assert!(!accepted.needs_password_reset);

        let joined = state.db.get_user_by_uuid(invited.uuid).unwrap();
        assert_eq!(joined.company_id, Some(company.id));
        assert_eq!(joined.name.as_deref(), Some("Robin"));
        assert!(joined.invite_token_hash.is_none());
        assert!(joined.pending_company_id.is_none());

        let member = state
            .db
            .get_company_member(company.id, invited.uuid)
            .unwrap()
            .unwrap();
        assert_eq!(member.status(), MemberStatus::Active);
        assert!(member.joined_at.is_some());
        assert!(member.invite_token_hash.is_none());

        // The invite password is now the credential
        let login = state
            .authenticate_user(
                "editor@example.com".to_string(),
                "a fresh password".to_string(),
            )
            .await
            .unwrap();
        assert!(login.is_some());

        // A consumed token cannot be replayed
        let err = state
            .accept_invitation("known-token".to_string(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn placeholder_must_set_password_on_accept() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;
        state
            .invite_team_member(
                &company,
                &owner,
                "new@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();

        let invited = state
            .db
            .get_user_by_email("new@example.com")
            .unwrap()
            .unwrap();
        let expires_at = Utc::now() + Duration::days(INVITE_TOKEN_EXPIRY_DAYS);
        state
            .db
            .set_user_invite(&invited, &hash_token("fresh-token"), expires_at, company.id)
            .unwrap();

        let err = state
            .accept_invitation("fresh-token".to_string(), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PasswordRequired));

        let err = state
            .accept_invitation("fresh-token".to_string(), None, Some("short".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WeakPassword));

        // Rejections leave the token live
        state
            .accept_invitation(
                "fresh-token".to_string(),
                None,
                Some("long enough".to_string()),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_invite_is_rejected() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;
        state
            .invite_team_member(
                &company,
                &owner,
                "late@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();

        let invited = state
            .db
            .get_user_by_email("late@example.com")
            .unwrap()
            .unwrap();
        state
            .db
            .set_user_invite(
                &invited,
                &hash_token("stale-token"),
                Utc::now() - Duration::minutes(1),
                company.id,
            )
            .unwrap();

        let err = state
            .accept_invitation(
                "stale-token".to_string(),
                None,
                Some("good password".to_string()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn reinvite_rotates_the_token() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;

        state
            .invite_team_member(
                &company,
                &owner,
                "slow@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();
        let first = state
            .db
            .get_user_by_email("slow@example.com")
            .unwrap()
            .unwrap()
            .invite_token_hash;

        state
            .invite_team_member(
                &company,
                &owner,
                "slow@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();
        let invited = state
            .db
            .get_user_by_email("slow@example.com")
            .unwrap()
            .unwrap();

        assert_ne!(first, invited.invite_token_hash);
        let member = state
            .db
            .get_company_member(company.id, invited.uuid)
            .unwrap()
            .unwrap();
        assert_eq!(member.invite_token_hash, invited.invite_token_hash);
    }

    #[tokio::test]
    async fn only_the_owner_changes_roles() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;
        let (admin, _) = signup(&state, "admin@example.com", "Admin Co").await;
        state
            .add_or_invite_member(
                &company,
                &owner,
                "admin@example.com".to_string(),
                None,
                CompanyRole::Admin,
            )
            .await
            .unwrap();
        let (member_user, _) = signup(&state, "member@example.com", "Member Co").await;
        state
            .add_or_invite_member(
                &company,
                &owner,
                "member@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();

        // Even an active admin cannot touch roles
        let err = state
            .update_member_role(&company, &admin, member_user.uuid, CompanyRole::Manager)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPrivileges));

        let updated = state
            .update_member_role(&company, &owner, member_user.uuid, CompanyRole::Manager)
            .await
            .unwrap();
        assert_eq!(updated.role(), CompanyRole::Manager);

        let err = state
            .update_member_role(&company, &owner, owner.uuid, CompanyRole::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CannotModifyOwner));
    }

    #[tokio::test]
    async fn owner_cannot_be_removed() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;
        let (manager, _) = signup(&state, "mgr@example.com", "Mgr Co").await;
        state
            .add_or_invite_member(
                &company,
                &owner,
                "mgr@example.com".to_string(),
                None,
                CompanyRole::Manager,
            )
            .await
            .unwrap();

        let err = state
            .remove_member(&company, &manager, owner.uuid)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CannotModifyOwner));

        let err = state
            .remove_member(&company, &owner, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MemberNotFound));
    }

    #[tokio::test]
    async fn removing_a_pending_member_clears_the_invite() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;
        state
            .invite_team_member(
                &company,
                &owner,
                "gone@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();
        let invited = state
            .db
            .get_user_by_email("gone@example.com")
            .unwrap()
            .unwrap();

        state
            .remove_member(&company, &owner, invited.uuid)
            .await
            .unwrap();

        assert!(state
            .db
            .get_company_member(company.id, invited.uuid)
            .unwrap()
            .is_none());
        let invited = state.db.get_user_by_uuid(invited.uuid).unwrap();
        assert!(invited.invite_token_hash.is_none());
        assert!(invited.pending_company_id.is_none());
    }

    #[tokio::test]
    async fn removal_clears_the_home_company_reference() {
        let state = test_state().await;
        let (owner, company) = signup(&state, "boss@example.com", "Acme Studio").await;

        // Joining via invite made this company the member's home company
        state
            .invite_team_member(
                &company,
                &owner,
                "home@example.com".to_string(),
                None,
                CompanyRole::Member,
            )
            .await
            .unwrap();
        let invited = state
            .db
            .get_user_by_email("home@example.com")
            .unwrap()
            .unwrap();
        let expires_at = Utc::now() + Duration::days(INVITE_TOKEN_EXPIRY_DAYS);
        state
            .db
            .set_user_invite(
                &invited,
                &hash_token("joining-token"),
                expires_at,
                company.id,
            )
            .unwrap();
        state
            .accept_invitation(
                "joining-token".to_string(),
                None,
                Some("a real password".to_string()),
            )
            .await
            .unwrap();

        state
            .remove_member(&company, &owner, invited.uuid)
            .await
            .unwrap();

        let removed = state.db.get_user_by_uuid(invited.uuid).unwrap();
        assert_eq!(removed.company_id, None);
    }

    #[tokio::test]
    async fn password_reset_round_trip() {
        let state = test_state().await;
        let (user, _) = signup(&state, "forgetful@example.com", "Acme Studio").await;

        state
            .request_password_reset("Forgetful@Example.com".to_string())
            .await
            .unwrap();
        let stored = state.db.get_user_by_uuid(user.uuid).unwrap();
        assert!(stored.reset_token_hash.is_some());

        // Swap in a token we know, the way the emailed link would carry it
        state
            .db
            .set_user_reset(
                &user,
                &hash_token("reset-token"),
                Utc::now() + Duration::hours(RESET_TOKEN_EXPIRY_HOURS),
            )
            .unwrap();

        let found = state.lookup_password_reset("reset-token").await.unwrap();
        assert_eq!(found.uuid, user.uuid);

        let err = state
            .reset_password("reset-token".to_string(), "1234567".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WeakPassword));

        state
            .reset_password("reset-token".to_string(), "12345678".to_string())
            .await
            .unwrap();

        let login = state
            .authenticate_user("forgetful@example.com".to_string(), "12345678".to_string())
            .await
            .unwrap();
        assert!(login.is_some());

        // The link is single use
        let err = state
            .reset_password("reset-token".to_string(), "another pass".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOrExpiredToken));
    }

    #[tokio::test]
    async fn reset_requests_never_reveal_accounts() {
        let state = test_state().await;
        state
            .request_password_reset("whoever@example.com".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_reset_token_is_rejected() {
        let state = test_state().await;
        let err = state
            .lookup_password_reset("no-such-token")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOrExpiredToken));
    }
}

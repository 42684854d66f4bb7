use crate::email::send_welcome_email;
use crate::jwt::{validate_token, NewToken, TokenType, REFRESH_TOKEN_AUDIENCE};
use crate::{ApiError, AppState, Error};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::spawn;
use tracing::{debug, error};
use uuid::Uuid;
use validator::Validate;

use super::common::{CompanyResponse, UserResponse};
use super::common::resolve_company_uuid;
use super::validation::validate_alphanumeric_with_symbols;

pub fn router(app_state: Arc<AppState>) -> Router<()> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/auth/refresh", post(refresh_token))
        .route("/auth/invite/accept", post(accept_invite))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset", get(lookup_reset_token))
        .route("/password/reset", post(reset_password))
        .with_state(app_state)
}

#[derive(Deserialize, Clone, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email must not exceed 255 characters"))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 64,
        message = "Password must be between 8 and 64 characters"
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub company_name: String,
}

#[derive(Deserialize, Clone, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email must not exceed 255 characters"))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 64,
        message = "Password must be between 8 and 64 characters"
    ))]
    pub password: String,
}

#[derive(Deserialize, Clone, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email must not exceed 255 characters"))]
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetTokenQuery {
    pub token: String,
}

#[derive(Deserialize, Clone, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(
        min = 8,
        max = 64,
        message = "Password must be between 8 and 64 characters"
    ))]
    pub password: String,
}

#[derive(Deserialize, Clone, Validate)]
pub struct AcceptInviteRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1, max = 50))]
    #[validate(custom(function = "validate_alphanumeric_with_symbols"))]
    pub name: Option<String>,
    #[validate(length(
        min = 8,
        max = 64,
        message = "Password must be between 8 and 64 characters"
    ))]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub user: UserResponse,
    pub company: CompanyResponse,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct AcceptInviteResponse {
    pub email: String,
    pub name: Option<String>,
    pub company_name: Option<String>,
    pub needs_password_reset: bool,
}

async fn signup(
    State(data): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError> {
    debug!("Entering signup function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let (user, company) = match data
        .register_user(
            payload.name,
            payload.email,
            payload.password,
            payload.company_name,
        )
        .await
    {
        Ok(created) => created,
        Err(Error::UserAlreadyExists) => {
            tracing::warn!("Cannot register user that already exists");
            return Err(ApiError::EmailAlreadyExists);
        }
        Err(e) => {
            error!("Error registering user: {:?}", e);
            return Err(ApiError::InternalServerError);
        }
    };

    // Welcome email goes out in the background
    let app_mode = data.app_mode.clone();
    let resend_api_key = data.resend_api_key.clone();
    let to_email = user.email.clone();
    spawn(async move {
        if let Err(e) = send_welcome_email(app_mode, resend_api_key, to_email).await {
            error!("Could not schedule welcome email: {e}");
        }
    });

    let access_token = NewToken::new(&user, TokenType::Access, &data)?;
    let refresh_token = NewToken::new(&user, TokenType::Refresh, &data)?;

    let response = SignupResponse {
        user: UserResponse::from_user(&user, Some(company.uuid)),
        company: CompanyResponse::from(&company),
        access_token: access_token.token,
        refresh_token: refresh_token.token,
    };
    debug!("Exiting signup function");
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(data): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    debug!("Entering login function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    match data.authenticate_user(payload.email, payload.password).await {
        Ok(Some(user)) => {
            let access_token = NewToken::new(&user, TokenType::Access, &data)?;
            let refresh_token = NewToken::new(&user, TokenType::Refresh, &data)?;
            let company_uuid = resolve_company_uuid(&data, user.company_id)?;

            let response = AuthResponse {
                user: UserResponse::from_user(&user, company_uuid),
                access_token: access_token.token,
                refresh_token: refresh_token.token,
            };
            debug!("Exiting login function");
            Ok(Json(response))
        }
        Ok(None) => {
            error!("Invalid login attempt");
            Err(ApiError::InvalidUsernameOrPassword)
        }
        Err(e) => {
            error!("Error authenticating user: {:?}", e);
            Err(ApiError::InternalServerError)
        }
    }
}

/// Issues a fresh token pair from a refresh token carried in the
/// Authorization header.
async fn refresh_token(
    State(data): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    debug!("Entering refresh_token function");

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(ToString::to_string));

    let token = match token {
        Some(token) => token,
        None => return Err(ApiError::InvalidJwt),
    };

    let claims = validate_token(&token, &data, REFRESH_TOKEN_AUDIENCE)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::InvalidJwt)?;

    let user = data
        .get_user(user_id)
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    let new_access_token = NewToken::new(&user, TokenType::Access, &data)?;
    let new_refresh_token = NewToken::new(&user, TokenType::Refresh, &data)?;

    let response = RefreshResponse {
        access_token: new_access_token.token,
        refresh_token: new_refresh_token.token,
    };
    debug!("Exiting refresh_token function");
    Ok(Json(response))
}

async fn forgot_password(
    State(data): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering forgot_password function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    // Failures are logged but never surfaced; the response must not reveal
    // whether the email has an account
    if let Err(e) = data.request_password_reset(payload.email).await {
        error!("Error in password reset request: {:?}", e);
    }

    debug!("Exiting forgot_password function");
    Ok(Json(json!({
        "message": "If an account with that email exists, we have sent a password reset link."
    })))
}

/// Resolves a reset token to the account email, so the reset form can show
/// who is resetting before a new password is chosen.
async fn lookup_reset_token(
    State(data): State<Arc<AppState>>,
    Query(query): Query<ResetTokenQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering lookup_reset_token function");

    let user = data
        .lookup_password_reset(&query.token)
        .await
        .map_err(|_| ApiError::InvalidOrExpiredToken)?;

    debug!("Exiting lookup_reset_token function");
    Ok(Json(json!({ "email": user.email })))
}

async fn reset_password(
    State(data): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    debug!("Entering reset_password function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    data.reset_password(payload.token, payload.password)
        .await
        .map_err(|e| match e {
            Error::WeakPassword => ApiError::WeakPassword,
            Error::InvalidOrExpiredToken => ApiError::InvalidOrExpiredToken,
            e => {
                error!("Error resetting password: {:?}", e);
                ApiError::InternalServerError
            }
        })?;

    debug!("Exiting reset_password function");
    Ok(Json(json!({
        "message": "Password reset successful. You can now log in with your new password."
    })))
}

async fn accept_invite(
    State(data): State<Arc<AppState>>,
    Json(payload): Json<AcceptInviteRequest>,
) -> Result<Json<AcceptInviteResponse>, ApiError> {
    debug!("Entering accept_invite function");

    if let Err(errors) = payload.validate() {
        error!("Validation error: {:?}", errors);
        return Err(ApiError::BadRequest);
    }

    let accepted = data
        .accept_invitation(payload.token, payload.name, payload.password)
        .await
        .map_err(|e| match e {
            Error::InvalidOrExpiredToken => ApiError::InvalidOrExpiredToken,
            Error::PasswordRequired => ApiError::PasswordRequired,
            Error::WeakPassword => ApiError::WeakPassword,
            e => {
                error!("Error accepting invitation: {:?}", e);
                ApiError::InternalServerError
            }
        })?;

    let response = AcceptInviteResponse {
        email: accepted.email,
        name: accepted.name,
        company_name: accepted.company_name,
        needs_password_reset: accepted.needs_password_reset,
    };
    debug!("Exiting accept_invite function");
    Ok(Json(response))
}

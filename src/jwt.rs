use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::db::DBError;
use crate::{ApiError, AppState, User};

pub(crate) const ACCESS_TOKEN_AUDIENCE: &str = "access";
pub(crate) const REFRESH_TOKEN_AUDIENCE: &str = "refresh";

pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn audience(&self) -> &'static str {
        match self {
            TokenType::Access => ACCESS_TOKEN_AUDIENCE,
            TokenType::Refresh => REFRESH_TOKEN_AUDIENCE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewToken {
    pub token: String,
}

#[derive(Clone)]
pub struct JwtKeys {
    secret: Vec<u8>,
}

impl JwtKeys {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys").field("secret", &"[redacted]").finish()
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct TokenClaims {
    pub sub: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

impl NewToken {
    pub fn new(user: &User, token_type: TokenType, app_state: &AppState) -> Result<Self, ApiError> {
        let duration = match token_type {
            TokenType::Access => Duration::minutes(app_state.config.access_token_maxage),
            TokenType::Refresh => Duration::days(app_state.config.refresh_token_maxage),
        };

        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.uuid.to_string(),
            aud: token_type.audience().to_string(),
            iat: now.timestamp() as usize,
            exp: (now + duration).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &app_state.config.jwt_keys.encoding_key(),
        )
        .map_err(|e| {
            tracing::error!("Error creating token: {:?}", e);
            ApiError::InternalServerError
        })?;

        Ok(NewToken { token })
    }
}

pub async fn validate_jwt(
    State(data): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    tracing::debug!("Entering validate_jwt");
    let token = match req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_header| auth_header.to_str().ok())
        .and_then(|auth_value| auth_value.strip_prefix("Bearer ").map(ToString::to_string))
    {
        Some(token) => token,
        None => return ApiError::InvalidJwt.into_response(),
    };

    tracing::trace!("Validating JWT");

    let claims = match validate_token(&token, &data, ACCESS_TOKEN_AUDIENCE) {
        Ok(claims) => claims,
        Err(_) => return ApiError::InvalidJwt.into_response(),
    };

    let user_uuid: Uuid = match Uuid::parse_str(&claims.sub) {
        Ok(uuid) => uuid,
        Err(e) => {
            tracing::error!("Error parsing user uuid: {:?}", e);
            return ApiError::InvalidJwt.into_response();
        }
    };

    let user = match data.db.get_user_by_uuid(user_uuid) {
        Ok(user) => user,
        Err(DBError::UserNotFound) => return ApiError::InvalidJwt.into_response(),
        Err(e) => {
            tracing::error!("Error getting user: {:?}", e);
            return ApiError::InternalServerError.into_response();
        }
    };

    req.extensions_mut().insert(user);
    tracing::debug!("Exiting validate_jwt");
    next.run(req).await
}

pub(crate) fn validate_token(
    original_token: &str,
    data: &AppState,
    expected_audience: &str,
) -> Result<TokenClaims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.set_audience(&[expected_audience]); // Only accept expected audience

    match decode::<TokenClaims>(
        original_token,
        &data.config.jwt_keys.decoding_key(),
        &validation,
    ) {
        Ok(token_data) => Ok(token_data.claims),
        Err(e) => {
            tracing::debug!("Token validation failed: {:?}", e);
            Err(ApiError::InvalidJwt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::MockDb;
    use crate::models::users::NewUser;
    use crate::{AppMode, AppStateBuilder};

    async fn test_state() -> Arc<AppState> {
        let state = AppStateBuilder::default()
            .app_mode(AppMode::Local)
            .db(Arc::new(MockDb::new()))
            .jwt_secret("0123456789abcdef0123456789abcdef".to_string())
            .build()
            .await
            .unwrap();
        Arc::new(state)
    }

    #[tokio::test]
    async fn access_token_round_trip() {
        let state = test_state().await;
        let user = state
            .db
            .create_user(NewUser::new("jwt@example.com".to_string(), "hash".to_string()))
            .unwrap();

        let token = NewToken::new(&user, TokenType::Access, &state).unwrap();
        let claims = validate_token(&token.token, &state, ACCESS_TOKEN_AUDIENCE).unwrap();

        assert_eq!(claims.sub, user.uuid.to_string());
        assert_eq!(claims.aud, ACCESS_TOKEN_AUDIENCE);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let state = test_state().await;
        let user = state
            .db
            .create_user(NewUser::new("aud@example.com".to_string(), "hash".to_string()))
            .unwrap();

        let token = NewToken::new(&user, TokenType::Refresh, &state).unwrap();
        assert!(validate_token(&token.token, &state, ACCESS_TOKEN_AUDIENCE).is_err());
        assert!(validate_token(&token.token, &state, REFRESH_TOKEN_AUDIENCE).is_ok());
    }

    #[tokio::test]
    async fn malformed_token_is_rejected() {
        let state = test_state().await;
        assert!(validate_token("not-a-jwt", &state, ACCESS_TOKEN_AUDIENCE).is_err());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let state = test_state().await;
        let user = state
            .db
            .create_user(NewUser::new("exp@example.com".to_string(), "hash".to_string()))
            .unwrap();

        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.uuid.to_string(),
            aud: ACCESS_TOKEN_AUDIENCE.to_string(),
            iat: (now - Duration::hours(2)).timestamp() as usize,
            exp: (now - Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &state.config.jwt_keys.encoding_key(),
        )
        .unwrap();

        assert!(validate_token(&token, &state, ACCESS_TOKEN_AUDIENCE).is_err());
    }
}

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    error::AppError, middleware::access::Role, services::auth_service::decode_token,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let missing = || AppError::Unauthorized("No token provided".into());
    let auth_str = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(missing)?
        .to_str()
        .map_err(|_| missing())?;

    let token = auth_str.strip_prefix("Bearer ").ok_or_else(missing)?.trim();
    if token.is_empty() {
        return Err(missing());
    }
    Ok(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let state = AppState::from_ref(state);

        let claims = decode_token(&state.jwt, token)?;
        let invalid = || AppError::Unauthorized("Invalid or expired token".into());
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| invalid())?;
        let role = claims.role.parse::<Role>().map_err(|_| invalid())?;

        Ok(AuthUser { user_id, role })
    }
}

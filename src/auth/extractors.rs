use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use super::{jwt::JwtKeys, AuthError};
use crate::error::AppError;

/// Username of a caller holding a valid bearer token.
///
/// Extraction runs before the handler body, so a rejected request never
/// reaches the store.
#[derive(Debug)]
pub struct AuthUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::InvalidOrExpiredToken)?;

        let token = bearer_token(header).ok_or(AuthError::InvalidOrExpiredToken)?;

        let claims = JwtKeys::from_ref(state).verify(token).map_err(|e| {
            warn!("invalid or expired token");
            e
        })?;

        Ok(AuthUser(claims.sub))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

use crate::state::AppState;
use axum::Router;
use thiserror::Error;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod passkey;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use extractors::AuthUser;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::user_routes())
}

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{CreateUserRequest, LoginRequest, PublicUser, TokenResponse, UpdateUserRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        passkey::{require_passkey, BulkDeleted, PasskeyQuery},
        repo_types::User,
        services, AuthError,
    },
    error::AppError,
    state::AppState,
    store::Repository,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/users",
            get(list_users).post(create_user).delete(delete_all_users),
        )
        .route(
            "/auth/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let mut tx = state.db.begin().await?;
    let token =
        services::issue_token(&mut tx, &keys, payload.username.trim(), &payload.password).await?;
    tx.commit().await?;
    Ok(Json(TokenResponse::bearer(token)))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(username): AuthUser,
) -> Result<Json<PublicUser>, AppError> {
    let mut tx = state.db.begin().await?;
    let user = User::find_by_username(&mut tx, &username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    tx.commit().await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<PublicUser>>, AppError> {
    let mut tx = state.db.begin().await?;
    let users = Repository::<User>::list(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, AppError> {
    let mut tx = state.db.begin().await?;
    let user = Repository::<User>::get(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound)?;
    tx.commit().await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn create_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let mut tx = state.db.begin().await?;
    let user = services::create_user(&mut tx, &payload.username, &payload.password).await?;
    tx.commit().await?;
    info!(%caller, user_id = %user.id, "user created via api");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let mut tx = state.db.begin().await?;
    let user = services::update_user(
        &mut tx,
        id,
        payload.username,
        payload.password,
        payload.disabled,
    )
    .await?;
    tx.commit().await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    if !Repository::<User>::delete(&mut tx, id).await? {
        return Err(AppError::NotFound);
    }
    tx.commit().await?;
    info!(%caller, user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, query))]
pub async fn delete_all_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<PasskeyQuery>,
) -> Result<Json<BulkDeleted>, AppError> {
    require_passkey(&state.config, &query)?;

    let mut tx = state.db.begin().await?;
    let deleted = Repository::<User>::delete_all(&mut tx).await?;
    tx.commit().await?;
    info!(%caller, deleted, "all users deleted");
    Ok(Json(BulkDeleted { deleted }))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateResponseRequest, UpdateResponseRequest},
    repo::{NewResponse, Response, ResponseChanges},
    services,
};
use crate::{
    auth::{
        passkey::{require_passkey, BulkDeleted, PasskeyQuery},
        AuthUser,
    },
    error::AppError,
    state::AppState,
    store::Repository,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/responses",
            get(list_responses)
                .post(create_response)
                .delete(delete_all_responses),
        )
        .route("/responses/all", get(list_all_responses))
        .route(
            "/responses/:id",
            get(get_response)
                .patch(update_response)
                .delete(delete_response),
        )
}

/// Public: this is what the RSVP form posts to.
#[instrument(skip(state, payload))]
pub async fn create_response(
    State(state): State<AppState>,
    Json(payload): Json<CreateResponseRequest>,
) -> Result<(StatusCode, Json<Response>), AppError> {
    let new = NewResponse::try_from(payload)?;
    let mut tx = state.db.begin().await?;
    let response = services::create_response(&mut tx, new).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[instrument(skip(state))]
pub async fn list_responses(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<Response>>, AppError> {
    let mut tx = state.db.begin().await?;
    let responses = Repository::<Response>::list(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(responses))
}

/// Administrative read, soft-deleted responses included.
#[instrument(skip(state))]
pub async fn list_all_responses(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<Response>>, AppError> {
    let mut tx = state.db.begin().await?;
    let responses = Repository::<Response>::list_all(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(responses))
}

#[instrument(skip(state))]
pub async fn get_response(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Response>, AppError> {
    let mut tx = state.db.begin().await?;
    let response = Repository::<Response>::get(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound)?;
    tx.commit().await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn update_response(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateResponseRequest>,
) -> Result<Json<Response>, AppError> {
    let changes = ResponseChanges::try_from(payload)?;
    let mut tx = state.db.begin().await?;
    let response = Repository::<Response>::update(&mut tx, id, changes)
        .await?
        .ok_or(AppError::NotFound)?;
    tx.commit().await?;
    Ok(Json(response))
}

#[instrument(skip(state))]
pub async fn delete_response(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    if !Repository::<Response>::delete(&mut tx, id).await? {
        return Err(AppError::NotFound);
    }
    tx.commit().await?;
    info!(%caller, response_id = %id, "response deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, query))]
pub async fn delete_all_responses(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<PasskeyQuery>,
) -> Result<Json<BulkDeleted>, AppError> {
    require_passkey(&state.config, &query)?;

    let mut tx = state.db.begin().await?;
    let deleted = Repository::<Response>::delete_all(&mut tx).await?;
    tx.commit().await?;
    info!(%caller, deleted, "all responses deleted");
    Ok(Json(BulkDeleted { deleted }))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::CreateProgressRequest,
    repo::{self, HeadlineAverage, HeadlineCount, HeadlineStats, NewProgressEvent, ProgressEvent},
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
            "/progress",
            get(list_events).post(create_event).delete(delete_all_events),
        )
        .route("/progress/avg", get(average_by_headline))
        .route("/progress/count", get(count_by_headline))
        .route("/progress/stats", get(stats_by_headline))
        .route("/progress/:id", get(get_event).delete(delete_event))
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProgressEvent>>, AppError> {
    let mut tx = state.db.begin().await?;
    let events = Repository::<ProgressEvent>::list(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(events))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressEvent>, AppError> {
    let mut tx = state.db.begin().await?;
    let event = Repository::<ProgressEvent>::get(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound)?;
    tx.commit().await?;
    Ok(Json(event))
}

#[instrument(skip(state))]
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateProgressRequest>,
) -> Result<(StatusCode, Json<ProgressEvent>), AppError> {
    let new = NewProgressEvent::try_from(payload)?;
    let mut tx = state.db.begin().await?;
    let event = Repository::<ProgressEvent>::create(&mut tx, new).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(event)))
}

#[instrument(skip(state))]
pub async fn average_by_headline(
    State(state): State<AppState>,
) -> Result<Json<Vec<HeadlineAverage>>, AppError> {
    let mut tx = state.db.begin().await?;
    let rows = repo::averages(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn count_by_headline(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<HeadlineCount>>, AppError> {
    let mut tx = state.db.begin().await?;
    let rows = repo::counts(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn stats_by_headline(
    State(state): State<AppState>,
) -> Result<Json<Vec<HeadlineStats>>, AppError> {
    let mut tx = state.db.begin().await?;
    let rows = repo::stats(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    if !Repository::<ProgressEvent>::delete(&mut tx, id).await? {
        return Err(AppError::NotFound);
    }
    tx.commit().await?;
    info!(%caller, event_id = %id, "progress event deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, query))]
pub async fn delete_all_events(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<PasskeyQuery>,
) -> Result<Json<BulkDeleted>, AppError> {
    require_passkey(&state.config, &query)?;

    let mut tx = state.db.begin().await?;
    let deleted = Repository::<ProgressEvent>::delete_all(&mut tx).await?;
    tx.commit().await?;
    info!(%caller, deleted, "progress log cleared");
    Ok(Json(BulkDeleted { deleted }))
}

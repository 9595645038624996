use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateGuestRequest, LinkGuestRequest, UpdateGuestRequest},
    repo::{self, Guest, GuestChanges, GuestView, NewGuest, RespondedGuest},
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
            "/guests",
            get(list_guests).post(create_guest).delete(delete_all_guests),
        )
        .route("/guests/all", get(list_all_guests))
        .route("/guests/responded", get(list_responded))
        .route("/guests/batch", post(create_guests))
        .route(
            "/guests/:id",
            get(get_guest)
                .post(link_guest)
                .patch(update_guest)
                .delete(delete_guest),
        )
}

#[instrument(skip(state))]
pub async fn list_guests(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<GuestView>>, AppError> {
    let mut tx = state.db.begin().await?;
    let guests = repo::list_views(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(guests))
}

/// Administrative read, soft-deleted guests included.
#[instrument(skip(state))]
pub async fn list_all_guests(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<Guest>>, AppError> {
    let mut tx = state.db.begin().await?;
    let guests = Repository::<Guest>::list_all(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(guests))
}

#[instrument(skip(state))]
pub async fn list_responded(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<RespondedGuest>>, AppError> {
    let mut tx = state.db.begin().await?;
    let rows = repo::list_responded(&mut tx).await?;
    tx.commit().await?;
    Ok(Json(rows))
}

#[instrument(skip(state))]
pub async fn get_guest(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GuestView>, AppError> {
    let mut tx = state.db.begin().await?;
    let guest = repo::get_view(&mut tx, id)
        .await?
        .ok_or(AppError::NotFound)?;
    tx.commit().await?;
    Ok(Json(guest))
}

#[instrument(skip(state, payload))]
pub async fn create_guest(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Json(payload): Json<CreateGuestRequest>,
) -> Result<(StatusCode, Json<Guest>), AppError> {
    let new = NewGuest::try_from(payload)?;
    let mut tx = state.db.begin().await?;
    let guest = Repository::<Guest>::create(&mut tx, new).await?;
    tx.commit().await?;
    Ok((StatusCode::CREATED, Json(guest)))
}

/// All-or-nothing: one invalid entry rejects the whole batch.
#[instrument(skip(state, payload))]
pub async fn create_guests(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Json(payload): Json<Vec<CreateGuestRequest>>,
) -> Result<(StatusCode, Json<Vec<Guest>>), AppError> {
    let new: Vec<NewGuest> = payload
        .into_iter()
        .map(NewGuest::try_from)
        .collect::<Result<_, _>>()?;

    let mut tx = state.db.begin().await?;
    let mut guests = Vec::with_capacity(new.len());
    for guest in new {
        guests.push(Repository::<Guest>::create(&mut tx, guest).await?);
    }
    tx.commit().await?;
    info!(count = guests.len(), "guests imported");
    Ok((StatusCode::CREATED, Json(guests)))
}

/// Manual override of the name-based linkage.
#[instrument(skip(state))]
pub async fn link_guest(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkGuestRequest>,
) -> Result<Json<Guest>, AppError> {
    let mut tx = state.db.begin().await?;
    let guest = repo::link_response(&mut tx, id, payload.response_id)
        .await?
        .ok_or_else(|| {
            warn!(guest_id = %id, "link for unknown guest");
            AppError::NotFound
        })?;
    tx.commit().await?;
    info!(guest_id = %id, response_id = %payload.response_id, "guest linked");
    Ok(Json(guest))
}

#[instrument(skip(state, payload))]
pub async fn update_guest(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGuestRequest>,
) -> Result<Json<Guest>, AppError> {
    let changes = GuestChanges::try_from(payload)?;
    let mut tx = state.db.begin().await?;
    let guest = Repository::<Guest>::update(&mut tx, id, changes)
        .await?
        .ok_or(AppError::NotFound)?;
    tx.commit().await?;
    Ok(Json(guest))
}

#[instrument(skip(state))]
pub async fn delete_guest(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state.db.begin().await?;
    if !Repository::<Guest>::delete(&mut tx, id).await? {
        return Err(AppError::NotFound);
    }
    tx.commit().await?;
    info!(%caller, guest_id = %id, "guest deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, query))]
pub async fn delete_all_guests(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(query): Query<PasskeyQuery>,
) -> Result<Json<BulkDeleted>, AppError> {
    require_passkey(&state.config, &query)?;

    let mut tx = state.db.begin().await?;
    let deleted = Repository::<Guest>::delete_all(&mut tx).await?;
    tx.commit().await?;
    info!(%caller, deleted, "all guests deleted");
    Ok(Json(BulkDeleted { deleted }))
}

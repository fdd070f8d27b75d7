//! Endpoints any signed-in user can call about themselves.

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use crate::data::profiles::UserWithRole;
use crate::data::{LoadRepository, NotificationRepository, ProfileChanges, ProfileRepository};
use crate::entities::{load, notification, profile};
use crate::error::{AppError, AppResult};
use crate::handlers::live::snapshot_stream;
use crate::refresh::views;
use crate::utils::jwt::Claims;

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<UserWithRole>> {
    let profiles = ProfileRepository::new(&state.db, &state.changes);
    let profile = profiles
        .get_profile(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;
    let role = profiles.get_role(claims.sub).await?;

    Ok(Json(UserWithRole { profile, role }))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ProfileChanges>,
) -> AppResult<Json<profile::Model>> {
    let profile = ProfileRepository::new(&state.db, &state.changes)
        .update_profile(claims.sub, payload)
        .await?;

    Ok(Json(profile))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<notification::Model>>> {
    let notifications = NotificationRepository::new(&state.db, &state.changes)
        .get_notifications(claims.sub)
        .await?;

    Ok(Json(notifications))
}

pub async fn mark_notifications_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<MarkedRead>> {
    let updated = NotificationRepository::new(&state.db, &state.changes)
        .mark_all_read(claims.sub)
        .await?;

    Ok(Json(MarkedRead { updated }))
}

/// Live inbox for the signed-in user
pub async fn live_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl axum::response::IntoResponse {
    let view = views::notifications(&state.db, &state.changes);
    view.initialize(Some(claims.sub));

    snapshot_stream(view)
}

/// Live list of loads the user posted or carries
pub async fn live_loads(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl axum::response::IntoResponse {
    let view = views::user_loads(&state.db, &state.changes);
    view.initialize(Some(claims.sub));

    snapshot_stream(view)
}

/// Other open loads from the same shipper
pub async fn related_loads(
    State(state): State<AppState>,
    Path(load_id): Path<Uuid>,
) -> AppResult<Json<Vec<load::Model>>> {
    let loads = LoadRepository::new(&state.db, &state.changes);
    let current = loads
        .find_load(load_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Load not found".to_string()))?;

    Ok(Json(
        loads
            .get_other_loads_by_owner(current.owner_id, current.id)
            .await?,
    ))
}

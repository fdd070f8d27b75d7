use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::AppState;
use crate::data::fleet::DriverWithProfile;
use crate::data::{
    BidRepository, FleetRepository, LoadRepository, PostLoad, ShipperStats, StatsRepository,
};
use crate::entities::{LoadStatus, load, load_bid};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;

/// Fetch a load and check the caller posted it
async fn owned_load(state: &AppState, load_id: Uuid, owner_id: Uuid) -> AppResult<load::Model> {
    let load = LoadRepository::new(&state.db, &state.changes)
        .find_load(load_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Load not found".to_string()))?;

    if load.owner_id != owner_id {
        return Err(AppError::Forbidden("You do not own this load".to_string()));
    }
    Ok(load)
}

pub async fn post_load(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PostLoad>,
) -> AppResult<(StatusCode, Json<load::Model>)> {
    if payload.origin.trim().is_empty() || payload.destination.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Origin and destination are required".to_string(),
        ));
    }

    let load = LoadRepository::new(&state.db, &state.changes)
        .post_load(payload, claims.sub)
        .await?;

    Ok((StatusCode::CREATED, Json(load)))
}

pub async fn my_loads(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<load::Model>>> {
    let loads = LoadRepository::new(&state.db, &state.changes)
        .get_user_loads(claims.sub)
        .await?;

    Ok(Json(loads))
}

/// Delete a load that no driver has taken yet
pub async fn delete_load(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(load_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let load = owned_load(&state, load_id, claims.sub).await?;
    if load.status != LoadStatus::Available {
        return Err(AppError::Conflict(
            "Only available loads can be deleted".to_string(),
        ));
    }

    LoadRepository::new(&state.db, &state.changes)
        .delete_load(load_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel_load(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(load_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    owned_load(&state, load_id, claims.sub).await?;

    LoadRepository::new(&state.db, &state.changes)
        .cancel_load(load_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn load_bids(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(load_id): Path<Uuid>,
) -> AppResult<Json<Vec<load_bid::Model>>> {
    owned_load(&state, load_id, claims.sub).await?;

    let bids = BidRepository::new(&state.db, &state.changes)
        .get_bids_for_load(load_id)
        .await?;

    Ok(Json(bids))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ShipperStats>> {
    Ok(Json(
        StatsRepository::new(&state.db)
            .get_shipper_stats(claims.sub)
            .await?,
    ))
}

/// Registered drivers a shipper can contact
pub async fn list_drivers(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DriverWithProfile>>> {
    let drivers = FleetRepository::new(&state.db, &state.changes)
        .get_all_drivers()
        .await?;

    Ok(Json(drivers))
}

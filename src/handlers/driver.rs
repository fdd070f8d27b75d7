use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::data::loads::LoadWithOwner;
use crate::data::{
    BidRepository, DriverStats, FleetRepository, LoadRepository, NewSubDriver, NewTruck,
    NotificationRepository, StatsRepository,
};
use crate::entities::{LoadStatus, load, load_bid, sub_driver, truck};
use crate::error::{AppError, AppResult};
use crate::handlers::live::snapshot_stream;
use crate::refresh::views;
use crate::utils::jwt::Claims;
use crate::utils::numeric::NumericInput;

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub price: NumericInput,
    pub message: Option<String>,
}

async fn find_load(state: &AppState, load_id: Uuid) -> AppResult<load::Model> {
    LoadRepository::new(&state.db, &state.changes)
        .find_load(load_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Load not found".to_string()))
}

// ============ Loads ============

/// Open loads, excluding the driver's own postings
pub async fn available_loads(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<LoadWithOwner>>> {
    let loads = LoadRepository::new(&state.db, &state.changes)
        .get_available_loads()
        .await?
        .into_iter()
        .filter(|l| l.load.owner_id != claims.sub)
        .collect();

    Ok(Json(loads))
}

/// The load board as a live event stream
pub async fn live_available_loads(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> impl IntoResponse {
    let board = views::available_loads(&state.db, &state.changes);
    board.initialize(Some(claims.sub));

    snapshot_stream(board)
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

/// Take an available load. The owner is notified on a best-effort basis.
pub async fn accept_load(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(load_id): Path<Uuid>,
) -> AppResult<Json<load::Model>> {
    let load = find_load(&state, load_id).await?;
    if load.owner_id == claims.sub {
        return Err(AppError::BadRequest(
            "You cannot accept your own load".to_string(),
        ));
    }

    LoadRepository::new(&state.db, &state.changes)
        .accept_load(load_id, claims.sub)
        .await?;

    NotificationRepository::new(&state.db, &state.changes)
        .notify_best_effort(
            load.owner_id,
            "Load accepted",
            &format!(
                "Your load from {} to {} was accepted by a driver",
                load.origin, load.destination
            ),
        )
        .await;

    Ok(Json(find_load(&state, load_id).await?))
}

/// Hand an in-progress load back to the board
pub async fn release_load(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(load_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let load = find_load(&state, load_id).await?;
    if load.driver_id != Some(claims.sub) {
        return Err(AppError::Forbidden(
            "This load is not assigned to you".to_string(),
        ));
    }
    if load.status != LoadStatus::InProgress {
        return Err(AppError::Conflict("Load is not in progress".to_string()));
    }

    LoadRepository::new(&state.db, &state.changes)
        .cancel_load_assignment(load_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_load(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(load_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    LoadRepository::new(&state.db, &state.changes)
        .complete_load(load_id, claims.sub)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_bid(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(load_id): Path<Uuid>,
    Json(payload): Json<BidRequest>,
) -> AppResult<(StatusCode, Json<load_bid::Model>)> {
    let load = find_load(&state, load_id).await?;
    if load.status != LoadStatus::Available {
        return Err(AppError::Conflict("Load is no longer available".to_string()));
    }

    let price = payload.price.coerce();
    if price <= 0.0 {
        return Err(AppError::BadRequest("Bid price must be positive".to_string()));
    }

    let bid = BidRepository::new(&state.db, &state.changes)
        .submit_bid(load_id, claims.sub, price, payload.message)
        .await?;

    Ok((StatusCode::CREATED, Json(bid)))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<DriverStats>> {
    Ok(Json(
        StatsRepository::new(&state.db)
            .get_driver_stats(claims.sub)
            .await?,
    ))
}

// ============ Fleet ============

pub async fn list_trucks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<truck::Model>>> {
    let trucks = FleetRepository::new(&state.db, &state.changes)
        .get_trucks(claims.sub)
        .await?;

    Ok(Json(trucks))
}

pub async fn add_truck(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewTruck>,
) -> AppResult<(StatusCode, Json<truck::Model>)> {
    if payload.plate_number.trim().is_empty() {
        return Err(AppError::BadRequest("Plate number is required".to_string()));
    }

    let truck = FleetRepository::new(&state.db, &state.changes)
        .add_truck(payload, claims.sub)
        .await?;

    Ok((StatusCode::CREATED, Json(truck)))
}

pub async fn delete_truck(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(truck_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let removed = FleetRepository::new(&state.db, &state.changes)
        .delete_truck(truck_id, claims.sub)
        .await?;

    if removed == 0 {
        return Err(AppError::NotFound("Truck not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_sub_drivers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<sub_driver::Model>>> {
    let drivers = FleetRepository::new(&state.db, &state.changes)
        .get_sub_drivers(claims.sub)
        .await?;

    Ok(Json(drivers))
}

pub async fn add_sub_driver(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewSubDriver>,
) -> AppResult<(StatusCode, Json<sub_driver::Model>)> {
    if payload.driver_name.trim().is_empty() {
        return Err(AppError::BadRequest("Driver name is required".to_string()));
    }

    let driver = FleetRepository::new(&state.db, &state.changes)
        .add_sub_driver(payload, claims.sub)
        .await?;

    Ok((StatusCode::CREATED, Json(driver)))
}

pub async fn delete_sub_driver(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(sub_driver_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let removed = FleetRepository::new(&state.db, &state.changes)
        .delete_sub_driver(sub_driver_id, claims.sub)
        .await?;

    if removed == 0 {
        return Err(AppError::NotFound("Sub-driver not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

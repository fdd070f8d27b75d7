use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::AppState;
use crate::data::loads::LoadWithOwner;
use crate::data::profiles::UserWithRole;
use crate::data::tickets::TicketWithAuthor;
use crate::data::{
    AdminStats, FleetRepository, LoadRepository, NotificationRepository, ProfileRepository,
    StatsRepository, TicketRepository,
};
use crate::entities::{notification, sub_driver};
use crate::error::{AppError, AppResult};
use crate::handlers::live::snapshot_stream;
use crate::refresh::views;

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
}

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<AdminStats>> {
    Ok(Json(StatsRepository::new(&state.db).get_admin_stats().await?))
}

/// Stats and users, pushed whenever either changes
pub async fn live_dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let dashboard = views::admin_dashboard(&state.db, &state.changes);
    dashboard.initialize(Some(()));

    snapshot_stream(dashboard)
}

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserWithRole>>> {
    let users = ProfileRepository::new(&state.db, &state.changes)
        .get_all_users()
        .await?;

    Ok(Json(users))
}

pub async fn list_loads(State(state): State<AppState>) -> AppResult<Json<Vec<LoadWithOwner>>> {
    let loads = LoadRepository::new(&state.db, &state.changes)
        .get_all_loads()
        .await?;

    Ok(Json(loads))
}

pub async fn list_tickets(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TicketWithAuthor>>> {
    Ok(Json(TicketRepository::new(&state.db).get_tickets().await?))
}

pub async fn list_sub_drivers(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<sub_driver::Model>>> {
    let drivers = FleetRepository::new(&state.db, &state.changes)
        .get_all_sub_drivers()
        .await?;

    Ok(Json(drivers))
}

/// Send a notification to any user
pub async fn send_notification(
    State(state): State<AppState>,
    Json(payload): Json<SendNotificationRequest>,
) -> AppResult<(StatusCode, Json<notification::Model>)> {
    if payload.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let profile = ProfileRepository::new(&state.db, &state.changes)
        .get_profile(payload.user_id)
        .await?;
    if profile.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let notification = NotificationRepository::new(&state.db, &state.changes)
        .send_notification(payload.user_id, &payload.title, &payload.message)
        .await?;

    Ok((StatusCode::CREATED, Json(notification)))
}

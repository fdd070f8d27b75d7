use axum::{Json, extract::State, http::StatusCode};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::data::{AuthService, AuthenticatedUser, RegisterInput};
use crate::entities::Role;
use crate::error::AppResult;
use crate::utils::jwt::{create_token, verify_token};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: String,
    pub role: Role,
}

fn issue(state: &AppState, user: AuthenticatedUser) -> AppResult<Json<AuthResponse>> {
    let email = user.profile.email.clone().unwrap_or_default();
    let token = create_token(
        user.profile.id,
        &email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(AuthResponse {
        token,
        user: UserInfo {
            id: user.profile.id,
            email: user.profile.email,
            full_name: user.profile.full_name,
            role: user.role,
        },
    }))
}

/// Register a driver or shipper account
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = AuthService::new(&state.db, &state.changes)
        .register(payload)
        .await?;

    Ok((StatusCode::CREATED, issue(&state, user)?))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = AuthService::new(&state.db, &state.changes)
        .login(&payload.email, &payload.password)
        .await?;

    issue(&state, user)
}

/// Login to the admin console; non-admin accounts get no token
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = AuthService::new(&state.db, &state.changes)
        .login_admin(&payload.email, &payload.password)
        .await?;

    issue(&state, user)
}

/// Tokens are stateless; the client discards its copy.
pub async fn logout(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> StatusCode {
    if let Some(TypedHeader(auth)) = auth {
        if let Ok(claims) = verify_token(auth.token(), &state.config.jwt_secret) {
            tracing::info!(user_id = %claims.sub, "signed out");
        }
    }
    StatusCode::NO_CONTENT
}

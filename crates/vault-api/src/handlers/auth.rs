// ============================================================================
// Vault API - Auth Handlers
// File: crates/vault-api/src/handlers/auth.rs
// ============================================================================
//! Authentication HTTP handlers (login, register, profile)

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use vault_core::domain::{AuthUser, NewRegistration, User};
use vault_core::services::LoginResult;

use crate::error::ApiError;
use crate::extractors::{AppJson, CurrentUser};
use crate::state::AppState;

/// Login request payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login handler - POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResult>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".into()));
    }
    let result = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(result))
}

/// Register handler - POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<NewRegistration>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.auth.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Current user - GET /auth/profile
pub async fn profile(CurrentUser(user): CurrentUser) -> Json<AuthUser> {
    Json(user)
}

//! User directory handlers

use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use vault_core::domain::{User, UserStatus};

use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, AppQuery, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub status: String,
}

fn parse_status(value: &str) -> Result<UserStatus, ApiError> {
    UserStatus::from_str(value)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown user status: {}", value)))
}

/// GET /users?status=
pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    Ok(Json(state.users.find_all(status).await?))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.find_by_id(&id).await?))
}

/// POST|PATCH /users/{id}/status
pub async fn update_user_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserStatusRequest>,
) -> Result<Json<User>, ApiError> {
    let status = parse_status(&payload.status)?;
    Ok(Json(state.users.update_status(&id, status, &user).await?))
}

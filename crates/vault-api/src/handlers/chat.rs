//! Chat gateway and session handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use vault_core::domain::{ChatSession, ChatSessionDetail, ChatSessionSummary};
use vault_core::services::ChatCompletionInput;

use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SessionTitleRequest {
    pub title: Option<String>,
}

/// POST /chat/completions
pub async fn completions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(input): AppJson<ChatCompletionInput>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.chat.complete(input, &user).await?))
}

/// GET /chat/models
pub async fn models(State(state): State<AppState>, CurrentUser(_user): CurrentUser) -> Json<Value> {
    Json(json!({ "models": state.chat.models() }))
}

/// GET /chat/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<ChatSessionSummary>>, ApiError> {
    Ok(Json(state.chat.list_sessions(&user).await?))
}

/// POST /chat/sessions. The body is optional.
pub async fn create_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<(StatusCode, Json<ChatSession>), ApiError> {
    let request: SessionTitleRequest = if body.iter().all(u8::is_ascii_whitespace) {
        SessionTitleRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };
    let session = state.chat.create_session(request.title, &user).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /chat/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ChatSessionDetail>, ApiError> {
    Ok(Json(state.chat.get_session(&id, &user).await?))
}

/// PATCH /chat/sessions/{id}
pub async fn rename_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<SessionTitleRequest>,
) -> Result<Json<ChatSession>, ApiError> {
    let title = payload.title.unwrap_or_default();
    Ok(Json(state.chat.rename_session(&id, &title, &user).await?))
}

/// DELETE /chat/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.chat.delete_session(&id, &user).await?;
    Ok(StatusCode::NO_CONTENT)
}

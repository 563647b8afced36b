//! Fund directory handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use vault_core::domain::{Fund, FundChanges, NewFund};

use crate::error::ApiError;
use crate::extractors::{AppJson, AppPath, CurrentUser};
use crate::state::AppState;

/// POST /funds
pub async fn create_fund(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(payload): AppJson<NewFund>,
) -> Result<(StatusCode, Json<Fund>), ApiError> {
    let fund = state.funds.create(payload, &user).await?;
    Ok((StatusCode::CREATED, Json(fund)))
}

/// GET /funds
pub async fn list_funds(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Fund>>, ApiError> {
    Ok(Json(state.funds.find_all(&user).await?))
}

/// GET /funds/{id}
pub async fn get_fund(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<Fund>, ApiError> {
    Ok(Json(state.funds.find_one(&id).await?))
}

/// PATCH /funds/{id}
pub async fn update_fund(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<FundChanges>,
) -> Result<Json<Fund>, ApiError> {
    Ok(Json(state.funds.update(&id, payload, &user).await?))
}

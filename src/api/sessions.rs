use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::db::{Session, SessionCreate, SessionUpdate};

use super::{auth::AuthUser, error::ApiError, ApiResponse, ApiResult, AppState};

pub async fn create_session(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    payload: Result<Json<SessionCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Session>>), ApiError> {
    let Json(body) = payload?;
    let session = state.service.create_session(&user, body).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(session)))
}

pub async fn list_sessions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Vec<Session>> {
    Ok(ApiResponse::ok(state.service.list_sessions(&user).await?))
}

pub async fn active_session(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Option<Session>> {
    Ok(ApiResponse::ok(state.service.active_session(&user).await?))
}

pub async fn today_sessions(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Vec<Session>> {
    let sessions = state.service.list_sessions_on_day(&user, Utc::now()).await?;
    Ok(ApiResponse::ok(sessions))
}

pub async fn get_session(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Session> {
    Ok(ApiResponse::ok(state.service.get_session(&user, &id).await?))
}

pub async fn update_session(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SessionUpdate>, JsonRejection>,
) -> ApiResult<Session> {
    let Json(update) = payload?;
    let session = state.service.update_session(&user, &id, update).await?;
    Ok(ApiResponse::ok(session))
}

pub async fn end_session(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Session> {
    Ok(ApiResponse::ok(state.service.end_session(&user, &id).await?))
}

pub async fn delete_session(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.service.delete_session(&user, &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Session deleted",
    })))
}

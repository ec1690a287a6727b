//! Request handlers for the guidepost API.

use super::auth::Identity;
use super::AppState;
use crate::error::{ApiError, ApiResult};
use crate::conversation::Message;
use crate::types::{
    CompletionOutcome, Path as CurriculumPath, PathProgress, PathStart, TaskStateView,
    TaskWrapperDetail, User,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: User,
    pub token: String,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    let user = state.db.register_user(&req.email, &req.name).map_err(ApiError::from)?;
    let token = state.db.create_session(&user.id).map_err(ApiError::from)?;
    Ok(Json(RegisterResponse { user, token }))
}

pub async fn list_paths(State(state): State<AppState>) -> ApiResult<Json<Vec<CurriculumPath>>> {
    let paths = state.db.list_paths().map_err(ApiError::from)?;
    Ok(Json(paths))
}

pub async fn start_path(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(path_id): Path<String>,
) -> ApiResult<Json<PathStart>> {
    let start = state
        .db
        .start_path(&identity.user_id, &path_id)
        .map_err(ApiError::from)?;
    Ok(Json(start))
}

pub async fn path_progress(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(path_id): Path<String>,
) -> ApiResult<Json<PathProgress>> {
    let progress = state
        .db
        .path_progress(&identity.user_id, &path_id)
        .map_err(ApiError::from)?;
    Ok(Json(progress))
}

#[derive(Serialize)]
pub struct ActivateResponse {
    pub message: String,
    pub task: TaskWrapperDetail,
}

pub async fn activate_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_wrapper_id): Path<String>,
) -> ApiResult<Json<ActivateResponse>> {
    let task = state
        .db
        .activate_task(&identity.user_id, &task_wrapper_id, state.policy)
        .map_err(ApiError::from)?;
    Ok(Json(ActivateResponse {
        message: format!("Task \"{}\" is now active", task.name),
        task,
    }))
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub content: String,
}

pub async fn complete_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_wrapper_id): Path<String>,
    Json(req): Json<CompleteRequest>,
) -> ApiResult<Json<CompletionOutcome>> {
    let outcome = state
        .db
        .complete_task(&identity.user_id, &task_wrapper_id, &req.content)
        .map_err(ApiError::from)?;
    Ok(Json(outcome))
}

#[derive(Deserialize, Default)]
pub struct SkipRequest {
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct SkipResponse {
    pub message: String,
}

pub async fn skip_task(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(task_wrapper_id): Path<String>,
    Json(req): Json<SkipRequest>,
) -> ApiResult<Json<SkipResponse>> {
    state
        .db
        .skip_task(&identity.user_id, &task_wrapper_id, req.reason.as_deref())
        .map_err(ApiError::from)?;
    Ok(Json(SkipResponse {
        message: "Task skipped; it can be activated again later".to_string(),
    }))
}

pub async fn challenge_tasks(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(challenge_id): Path<String>,
) -> ApiResult<Json<Vec<TaskStateView>>> {
    let views = state
        .db
        .task_states(&identity.user_id, &challenge_id)
        .map_err(ApiError::from)?;
    Ok(Json(views))
}

#[derive(Deserialize)]
pub struct MessageRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub reply: String,
}

pub async fn apostle_message(
    State(state): State<AppState>,
    Extension(_identity): Extension<Identity>,
    Path(apostle_id): Path<String>,
    Json(req): Json<MessageRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let apostle = state
        .db
        .get_apostle(&apostle_id)
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::apostle_not_found(&apostle_id))?;

    let reply = state
        .conversation
        .reply(&apostle, &req.history, &req.message)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(MessageResponse { reply }))
}

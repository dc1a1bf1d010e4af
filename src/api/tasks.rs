use super::internal_error;
use crate::models::{CompletionUpdate, StatusFilter, Task, TaskPatch, User};
use crate::state::SharedState;
use crate::store::TaskStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Task not found".to_string())
}

fn parse_status(status: Option<&str>) -> Result<Option<StatusFilter>, (StatusCode, String)> {
    match status {
        None | Some("all") => Ok(None),
        Some("pending") => Ok(Some(StatusFilter::Pending)),
        Some("completed") => Ok(Some(StatusFilter::Completed)),
        Some(_) => Err((
            StatusCode::BAD_REQUEST,
            "status must be one of all, pending, completed".to_string(),
        )),
    }
}

fn require_title(title: &str) -> Result<String, (StatusCode, String)> {
    let title = title.trim();
    if title.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

// GET /api/tasks?status=all|pending|completed
pub async fn list_tasks(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Task>>, (StatusCode, String)> {
    let filter = parse_status(query.status.as_deref())?;
    let tasks = state
        .store
        .list_tasks(&user.id, filter)
        .map_err(internal_error)?;
    Ok(Json(tasks))
}

// POST /api/tasks
pub async fn create_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    let title = require_title(&payload.title)?;
    let task = state
        .store
        .create_task(&user.id, &title, payload.description.as_deref())
        .map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

// GET /api/tasks/:id
pub async fn get_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<u64>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task = state
        .store
        .get_task(id, &user.id)
        .map_err(internal_error)?
        .ok_or_else(not_found)?;
    Ok(Json(task))
}

// PUT /api/tasks/:id
pub async fn update_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<u64>,
    Json(mut patch): Json<TaskPatch>,
) -> Result<Json<Task>, (StatusCode, String)> {
    if let Some(title) = patch.title.as_deref() {
        patch.title = Some(require_title(title)?);
    }
    let task = state
        .store
        .update_task(id, &user.id, patch)
        .map_err(internal_error)?
        .ok_or_else(not_found)?;
    Ok(Json(task))
}

// DELETE /api/tasks/:id
pub async fn delete_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .store
        .delete_task(id, &user.id)
        .map_err(internal_error)?
        .ok_or_else(not_found)?;
    Ok(StatusCode::NO_CONTENT)
}

// PATCH /api/tasks/:id/complete
pub async fn toggle_complete(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Path(id): Path<u64>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let task = state
        .store
        .set_completed(id, &user.id, CompletionUpdate::Toggle)
        .map_err(internal_error)?
        .ok_or_else(not_found)?;
    Ok(Json(task))
}

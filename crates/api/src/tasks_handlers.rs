//! HTTP request handlers for task operations

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde_json::Value;
use taskhub_db::{DbError, FieldMask, Task, TaskListing, TaskQuery, project_task};
use tracing::info;

use crate::DbState;
use crate::body::TaskBody;
use crate::response::{ApiError, ApiResponse};

/// List tasks, or count them when `count=true`
///
/// Query parameters: `where`, `sort`, `select` (JSON), `skip`, `limit`, `count`.
pub async fn list_tasks(
    State(db): State<DbState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<TaskListing>>, ApiError> {
    let query = TaskQuery::from_params(&params);
    info!("Listing tasks (count: {})", query.count);

    let listing = db.lister().run(&query).await?;
    Ok(ResponseJson(ApiResponse::ok(listing)))
}

/// Get a single task by ID, optionally projected by `select`
pub async fn get_task(
    State(db): State<DbState>,
    Path(task_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<Value>>, ApiError> {
    info!("Getting task: {}", task_id);

    let task = db.tasks().get(&task_id).await?.ok_or(ApiError::NotFound)?;
    let mask = FieldMask::parse(params.get("select").map(String::as_str));
    let data = project_task(&task, mask.as_ref()).map_err(DbError::from)?;

    Ok(ResponseJson(ApiResponse::ok(data)))
}

/// Create a new task
pub async fn create_task(
    State(db): State<DbState>,
    TaskBody(draft): TaskBody,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    info!("Creating task: {:?}", draft.name);

    let task = db.assignments().create_task(&draft).await?;
    Ok((StatusCode::CREATED, ResponseJson(ApiResponse::created(task))))
}

/// Replace a task
pub async fn update_task(
    State(db): State<DbState>,
    Path(task_id): Path<String>,
    TaskBody(draft): TaskBody,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    info!("Updating task: {}", task_id);

    let task = db.assignments().update_task(&task_id, &draft).await?;
    Ok(ResponseJson(ApiResponse::ok(task)))
}

/// Delete a task
pub async fn delete_task(
    State(db): State<DbState>,
    Path(task_id): Path<String>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    info!("Deleting task: {}", task_id);

    db.assignments().delete_task(&task_id).await?;
    Ok(ResponseJson(ApiResponse::message("OK")))
}

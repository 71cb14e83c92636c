//! HTTP API layer for taskhub
//!
//! REST endpoints for tasks over the `taskhub-db` store.

use std::sync::Arc;

use axum::{
    Router,
    response::Json as ResponseJson,
    routing::get,
};
use serde_json::{Value, json};
use taskhub_db::Database;
use tower_http::trace::TraceLayer;

pub mod body;
pub mod response;
pub mod tasks_handlers;

use response::ApiResponse;

/// Shared handler state
pub type DbState = Arc<Database>;

/// Creates the tasks API router (nested under /api/tasks)
pub fn create_tasks_router() -> Router<DbState> {
    Router::new()
        .route(
            "/",
            get(tasks_handlers::list_tasks).post(tasks_handlers::create_task),
        )
        .route(
            "/{id}",
            get(tasks_handlers::get_task)
                .put(tasks_handlers::update_task)
                .delete(tasks_handlers::delete_task),
        )
}

/// Liveness check
pub async fn health() -> ResponseJson<ApiResponse<Value>> {
    ResponseJson(ApiResponse::ok(json!({"status": "up"})))
}

/// Build the full application router with request tracing
pub fn create_router(db: DbState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .nest("/api/tasks", create_tasks_router())
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

//! Task status endpoints
//!
//! GET /status (HTML page) and GET /status/check (JSON poll)

use axum::{
    extract::{Query, State},
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::warn;

use super::ui::{status_page, StatusRows};
use super::{parse_task_id, task_not_found, TaskQuery};
use crate::error::ApiResult;
use crate::models::{Task, TaskStatus};
use crate::services::spreadsheet::read_processed;
use crate::AppState;

/// GET /status/check response
#[derive(Debug, Serialize)]
pub struct StatusCheckResponse {
    pub status: TaskStatus,
    pub completed: bool,
}

async fn find_task(state: &AppState, raw_id: &str) -> ApiResult<Task> {
    let task_id = parse_task_id(raw_id)?;
    state
        .store
        .get(&task_id)
        .await
        .ok_or_else(|| task_not_found(raw_id))
}

/// GET /status/check?taskId=
pub async fn check_status(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Json<StatusCheckResponse>> {
    let task = find_task(&state, &query.task_id).await?;

    Ok(Json(StatusCheckResponse {
        status: task.status,
        completed: task.is_completed(),
    }))
}

/// GET /status?taskId=
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Html<String>> {
    let task = find_task(&state, &query.task_id).await?;

    if !task.is_completed() {
        return Ok(Html(status_page(&task, StatusRows::NotReady)));
    }

    let path = state.storage.processed_path(task.task_id);
    let loaded = tokio::task::spawn_blocking(move || read_processed(&path)).await;

    let page = match loaded {
        Ok(Ok(records)) => status_page(&task, StatusRows::Records(&records)),
        Ok(Err(e)) => {
            warn!(task_id = %task.task_id, "Could not read processed data: {}", e);
            status_page(&task, StatusRows::Unavailable(&e.to_string()))
        }
        Err(e) => {
            warn!(task_id = %task.task_id, "Reading processed data aborted: {}", e);
            status_page(&task, StatusRows::Unavailable("processed data unavailable"))
        }
    };

    Ok(Html(page))
}

/// Build status routes
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status))
        .route("/status/check", get(check_status))
}

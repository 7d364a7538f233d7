//! Upload endpoint
//!
//! POST /upload accepts one multipart field named `file`. Browser clients are
//! redirected to the status page; clients sending `Accept: application/json`
//! get 202 with the task id.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::ui::upload_page;
use crate::error::{ApiError, ApiResult};
use crate::models::{Task, TaskStatus};
use crate::services::submit;
use crate::AppState;

/// Multipart field carrying the spreadsheet
pub const FILE_FIELD: &str = "file";

/// POST /upload JSON response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let wants_json = accepts_json(&headers);

    match accept_upload(&state, multipart).await {
        Ok(task) if wants_json => (
            StatusCode::ACCEPTED,
            Json(UploadResponse {
                task_id: task.task_id,
                status: task.status,
            }),
        )
            .into_response(),
        Ok(task) => Redirect::to(&format!("/status?taskId={}", task.task_id)).into_response(),
        Err(e) => {
            warn!("Upload rejected: {}", e);
            if wants_json {
                e.into_response()
            } else {
                (e.status_code(), Html(upload_page(Some(&e.message())))).into_response()
            }
        }
    }
}

async fn accept_upload(state: &AppState, mut multipart: Multipart) -> ApiResult<Task> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let task = submit(
            &state.storage,
            &state.store,
            &state.dispatcher,
            &filename,
            &bytes,
        )
        .await?;
        return Ok(task);
    }

    Err(ApiError::BadRequest("Please select a file to upload".to_string()))
}

fn accepts_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

/// Build upload routes
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

//! Result download endpoints
//!
//! Every lookup runs in the same order:
//! 1. storage guard on the name derived from the raw task id (403)
//! 2. task must exist and be COMPLETED (404)
//! 3. file must exist (404) and be non-empty (500 `EMPTY_FILE`)

use axum::{
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::PathBuf;
use tracing::{debug, warn};

use super::{parse_task_id, task_not_found, TaskQuery};
use crate::error::{ApiError, ApiResult};
use crate::services::report::render_html_report;
use crate::services::spreadsheet::read_processed;
use crate::storage::{processed_file_name, report_file_name};
use crate::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Attachment,
    Inline,
}

/// Resolve a result file of a completed task
async fn resolve_result(state: &AppState, raw_id: &str, file_name: String) -> ApiResult<PathBuf> {
    let path = state.storage.confine(&file_name)?;

    let task_id = parse_task_id(raw_id)?;
    let task = state
        .store
        .get(&task_id)
        .await
        .ok_or_else(|| task_not_found(raw_id))?;
    if !task.is_completed() {
        return Err(ApiError::NotFound(format!(
            "Results not available for task {} ({})",
            task_id, task.status
        )));
    }

    if let Err(e) = state.storage.existing_file(&path).await {
        warn!(task_id = %task_id, "Result lookup failed: {}", e);
        return Err(e.into());
    }
    Ok(path)
}

async fn file_response(
    path: PathBuf,
    file_name: String,
    content_type: &'static str,
    disposition: Disposition,
) -> ApiResult<Response> {
    let bytes = tokio::fs::read(&path).await?;
    debug!(file = %file_name, bytes = bytes.len(), "Serving result file");

    let disposition = match disposition {
        Disposition::Attachment => format!("attachment; filename=\"{}\"", file_name),
        Disposition::Inline => format!("inline; filename=\"{}\"", file_name),
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn serve_pdf(state: AppState, raw_id: String, disposition: Disposition) -> ApiResult<Response> {
    let file_name = report_file_name(&raw_id);
    let path = resolve_result(&state, &raw_id, file_name.clone()).await?;
    file_response(path, file_name, PDF_CONTENT_TYPE, disposition).await
}

/// GET /download/pdf?taskId=
pub async fn download_pdf(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Response> {
    serve_pdf(state, query.task_id, Disposition::Attachment).await
}

/// GET /view/pdf?taskId=
pub async fn view_pdf(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Response> {
    serve_pdf(state, query.task_id, Disposition::Inline).await
}

/// GET /download/xlsx?taskId=
pub async fn download_xlsx(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Response> {
    let file_name = processed_file_name(&query.task_id);
    let path = resolve_result(&state, &query.task_id, file_name.clone()).await?;
    file_response(path, file_name, XLSX_CONTENT_TYPE, Disposition::Attachment).await
}

/// GET /report/html?taskId=
///
/// Regenerated from the processed spreadsheet on each request.
pub async fn html_report(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> ApiResult<Html<String>> {
    let file_name = processed_file_name(&query.task_id);
    let path = resolve_result(&state, &query.task_id, file_name).await?;

    let records = tokio::task::spawn_blocking(move || read_processed(&path))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Html(render_html_report(&records)))
}

/// Build download routes
pub fn download_routes() -> Router<AppState> {
    Router::new()
        .route("/download/pdf", get(download_pdf))
        .route("/view/pdf", get(view_pdf))
        .route("/download/xlsx", get(download_xlsx))
        .route("/report/html", get(html_report))
}

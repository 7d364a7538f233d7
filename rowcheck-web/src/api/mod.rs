//! HTTP API handlers for rowcheck-web

pub mod download;
pub mod health;
pub mod status;
pub mod ui;
pub mod upload;

pub use download::download_routes;
pub use health::health_routes;
pub use status::status_routes;
pub use ui::ui_routes;
pub use upload::upload_routes;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// `?taskId=` query parameter
///
/// Kept as text so that lookups can run the storage guard on the raw value
/// before it is parsed.
#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    #[serde(rename = "taskId")]
    pub task_id: String,
}

/// Parse a task id; malformed ids are reported as unknown tasks
pub fn parse_task_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| task_not_found(raw))
}

pub fn task_not_found(raw: &str) -> ApiError {
    ApiError::NotFound(format!("Task not found: {}", raw))
}

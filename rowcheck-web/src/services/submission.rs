//! Upload submission
//!
//! Validates an upload, persists it, registers a PENDING task and hands the
//! job to the worker pool. Validation happens before any task exists, so a
//! rejected upload leaves no trace in the store.

use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::Task;
use crate::storage::{sanitize_filename, Storage};
use crate::store::TaskStore;
use crate::worker::{Dispatcher, Job};

/// Accepted upload extension (compared case-insensitively)
pub const ACCEPTED_EXTENSION: &str = ".xlsx";

/// Longest stored name that still fits `<uuid>_<name>` in a 255-byte file name
pub const MAX_FILENAME_BYTES: usize = 255 - 37;

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Please select a file to upload")]
    EmptyFile,

    #[error("Only .xlsx files are accepted")]
    UnsupportedType,

    #[error("File name is not usable (control characters or longer than {MAX_FILENAME_BYTES} bytes)")]
    InvalidName,

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task {0} could not be queued")]
    QueueClosed(Uuid),
}

/// Reject uploads that cannot be processed
pub fn validate_upload(filename: &str, bytes: &[u8]) -> Result<(), SubmissionError> {
    if bytes.is_empty() || filename.trim().is_empty() {
        return Err(SubmissionError::EmptyFile);
    }
    if !filename.to_ascii_lowercase().ends_with(ACCEPTED_EXTENSION) {
        return Err(SubmissionError::UnsupportedType);
    }
    let stored = sanitize_filename(filename);
    if stored.len() > MAX_FILENAME_BYTES || stored.chars().any(char::is_control) {
        return Err(SubmissionError::InvalidName);
    }
    Ok(())
}

/// Accept an upload and queue it for processing
///
/// Returns the task as registered (PENDING). If the queue has shut down the
/// task is marked FAILED and an error is returned.
pub async fn submit(
    storage: &Storage,
    store: &TaskStore,
    dispatcher: &Dispatcher,
    filename: &str,
    bytes: &[u8],
) -> Result<Task, SubmissionError> {
    validate_upload(filename, bytes)?;

    let original_filename = sanitize_filename(filename);
    let task_id = Uuid::new_v4();
    let input_path = storage
        .save_upload(task_id, &original_filename, bytes)
        .await?;

    let task = store.create(task_id, original_filename).await;
    info!(
        task_id = %task_id,
        filename = %task.original_filename,
        bytes = bytes.len(),
        "Upload accepted"
    );

    if let Err(e) = dispatcher.dispatch(Job { task_id, input_path }).await {
        error!(task_id = %task_id, "Dispatch failed: {}", e);
        store
            .update(&task_id, |task| task.fail(format!("dispatch failed: {}", e)))
            .await;
        return Err(SubmissionError::QueueClosed(task_id));
    }

    Ok(task)
}

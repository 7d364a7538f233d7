//! Task lifecycle state machine
//!
//! PENDING → PROCESSING → {COMPLETED | FAILED}
//!
//! Terminal states are final. Any other transition is rejected and leaves
//! the task untouched.

use chrono::{DateTime, Utc};
use rowcheck_common::time::now;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Task lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Created, waiting in the job queue
    Pending,
    /// Picked up by a worker
    Processing,
    /// Result spreadsheet and report written
    Completed,
    /// Processing aborted, see error details
    Failed,
}

impl TaskStatus {
    /// Label used in status responses
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Processing)
                | (TaskStatus::Processing, TaskStatus::Completed)
                | (TaskStatus::Processing, TaskStatus::Failed)
                // Dispatch itself can fail before a worker ever sees the task
                | (TaskStatus::Pending, TaskStatus::Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state change
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid task transition {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Record of an applied state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub task_id: Uuid,
    pub old_status: TaskStatus,
    pub new_status: TaskStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// One submitted file's processing lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub task_id: Uuid,

    /// Filename as supplied by the client
    pub original_filename: String,

    /// Result spreadsheet filename (set on completion)
    pub processed_filename: Option<String>,

    /// Current lifecycle status
    pub status: TaskStatus,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Time a terminal state was reached
    pub finished_at: Option<DateTime<Utc>>,

    /// Failure message (FAILED only)
    pub error_details: Option<String>,
}

impl Task {
    /// Create new task in PENDING state
    pub fn new(task_id: Uuid, original_filename: impl Into<String>) -> Self {
        Self {
            task_id,
            original_filename: original_filename.into(),
            processed_filename: None,
            status: TaskStatus::Pending,
            created_at: now(),
            finished_at: None,
            error_details: None,
        }
    }

    /// Transition to new status
    pub fn transition_to(&mut self, new_status: TaskStatus) -> Result<StateTransition, TransitionError> {
        if !self.status.can_transition_to(new_status) {
            return Err(TransitionError {
                from: self.status,
                to: new_status,
            });
        }

        let transition = StateTransition {
            task_id: self.task_id,
            old_status: self.status,
            new_status,
            transitioned_at: now(),
        };
        self.status = new_status;

        if new_status.is_terminal() {
            self.finished_at = Some(transition.transitioned_at);
        }

        Ok(transition)
    }

    /// PENDING → PROCESSING
    pub fn start_processing(&mut self) -> Result<StateTransition, TransitionError> {
        self.transition_to(TaskStatus::Processing)
    }

    /// PROCESSING → COMPLETED, recording the result spreadsheet
    pub fn complete(&mut self, processed_filename: impl Into<String>) -> Result<StateTransition, TransitionError> {
        let transition = self.transition_to(TaskStatus::Completed)?;
        self.processed_filename = Some(processed_filename.into());
        Ok(transition)
    }

    /// → FAILED, recording the failure message
    pub fn fail(&mut self, error_details: impl Into<String>) -> Result<StateTransition, TransitionError> {
        let transition = self.transition_to(TaskStatus::Failed)?;
        self.error_details = Some(error_details.into());
        Ok(transition)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

//! Data models for rowcheck
//!
//! - Task lifecycle state machine
//! - Per-row validated records

pub mod record;
pub mod task;

pub use record::{Age, RecordStatus, ValidatedRecord};
pub use task::{StateTransition, Task, TaskStatus, TransitionError};

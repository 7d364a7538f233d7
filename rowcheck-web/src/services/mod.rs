//! Processing services

pub mod pipeline;
pub mod report;
pub mod row_validator;
pub mod spreadsheet;
pub mod submission;

pub use pipeline::{PipelineError, ProcessingOutput, ReportPipeline};
pub use submission::{submit, validate_upload, SubmissionError};

//! Report pipeline
//!
//! One run turns an uploaded workbook into the two result artifacts:
//! 1. Read data rows from the first sheet
//! 2. Validate each row against the clock's current date
//! 3. Write `processed_<taskId>.xlsx`
//! 4. Render and write `report_<taskId>.pdf`
//!
//! Row-level problems never fail the run; they become `NOT OK` records.
//! Only file-level problems (unreadable workbook, write failures) do.

use rowcheck_common::Clock;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::report::pdf::PdfError;
use super::report::render_pdf;
use super::row_validator::validate_row_record;
use super::spreadsheet::{read_data_rows, write_processed};
use crate::models::ValidatedRecord;
use crate::storage::{processed_file_name, report_file_name, Storage};

/// File-level processing failures
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read spreadsheet: {0}")]
    Read(#[from] calamine::Error),

    #[error("failed to read spreadsheet: workbook has no worksheets")]
    NoWorksheet,

    #[error("failed to write spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Artifacts of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOutput {
    pub processed_filename: String,
    pub record_count: usize,
    pub invalid_count: usize,
}

/// Reads, validates, and writes result artifacts under the storage root
pub struct ReportPipeline {
    storage: Storage,
    clock: Arc<dyn Clock>,
}

impl ReportPipeline {
    pub fn new(storage: Storage, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Process one uploaded file (blocking; run off the async runtime)
    pub fn process(&self, task_id: Uuid, input_path: &Path) -> Result<ProcessingOutput, PipelineError> {
        let start = Instant::now();
        let today = self.clock.today();
        debug!(task_id = %task_id, input = %input_path.display(), %today, "Processing upload");

        let rows = read_data_rows(input_path)?;
        let records: Vec<ValidatedRecord> = rows
            .iter()
            .map(|cells| validate_row_record(cells, today))
            .collect();
        let invalid_count = records.iter().filter(|r| !r.is_ok()).count();

        let processed_filename = processed_file_name(task_id);
        write_processed(&self.storage.root().join(&processed_filename), &records)?;

        let pdf = render_pdf(&records)?;
        std::fs::write(self.storage.root().join(report_file_name(task_id)), pdf)?;

        info!(
            task_id = %task_id,
            records = records.len(),
            invalid = invalid_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upload processed"
        );

        Ok(ProcessingOutput {
            processed_filename,
            record_count: records.len(),
            invalid_count,
        })
    }
}

//! Report rendering
//!
//! Both outputs are built from the same [`ReportTable`] so the HTML page and
//! the PDF always list identical rows in identical order.

pub mod html;
pub mod pdf;

pub use html::{render_html_report, render_records_table};
pub use pdf::render_pdf;

use crate::models::{RecordStatus, ValidatedRecord};
use crate::services::spreadsheet::HEADERS;

/// Report title shown in the HTML heading and on every PDF page
pub const REPORT_TITLE: &str = "Data Processing Report";

/// One rendered report row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    /// Cell texts in [`HEADERS`] order
    pub cells: [String; 6],
    /// Drives the success/failure styling of the status cell
    pub status: RecordStatus,
}

/// Text model shared by the HTML and PDF renderers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub headers: [&'static str; 6],
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn from_records(records: &[ValidatedRecord]) -> Self {
        let rows = records
            .iter()
            .map(|record| ReportRow {
                cells: [
                    record.full_name.clone(),
                    record.birth_date_text(),
                    record.age_years.to_string(),
                    record.age_months.to_string(),
                    record.status.label().to_string(),
                    record.error_details.clone(),
                ],
                status: record.status,
            })
            .collect();

        Self {
            headers: HEADERS,
            rows,
        }
    }
}

/// Index of the status column in [`HEADERS`]
pub(crate) const STATUS_COLUMN: usize = 4;

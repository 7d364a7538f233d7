//! Spreadsheet input and output
//!
//! - Reads uploaded workbooks (first sheet, header row skipped)
//! - Writes the processed workbook (`Processed Data` sheet)
//! - Reads a processed workbook back into records for the status page

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook};
use std::path::Path;

use super::pipeline::PipelineError;
use super::row_validator::Cell;
use crate::models::{RecordStatus, ValidatedRecord};

/// Name of the single sheet in processed workbooks
pub const PROCESSED_SHEET_NAME: &str = "Processed Data";

/// Column headers of processed workbooks and reports
pub const HEADERS: [&str; 6] = [
    "Full Name",
    "Birth Date",
    "Age (years)",
    "Age (months)",
    "Status",
    "Error Details",
];

/// Error detail for processed rows that cannot be interpreted
pub const INVALID_ROW_DATA: &str = "invalid data in row";

/// Longest string an xlsx cell can hold
pub const MAX_CELL_CHARS: usize = 32_767;

const COLUMN_WIDTHS: [f64; 6] = [32.0, 14.0, 12.0, 13.0, 10.0, 40.0];

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Text(b.to_string()),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(datetime) => Cell::Date(datetime.date()),
                None => Cell::Number(dt.as_f64()),
            },
            // ISO date-times keep only their date part
            Data::DateTimeIso(s) => Cell::Text(s.split('T').next().unwrap_or_default().to_string()),
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Error(e.to_string()),
        }
    }
}

/// Read data rows (header skipped) from the first sheet
///
/// Rows without any non-empty cell are skipped. Cells are addressed by
/// absolute column, so a sheet whose used range starts at column B still
/// sees column A as empty.
pub fn read_data_rows(path: &Path) -> Result<Vec<Vec<Cell>>, PipelineError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(PipelineError::NoWorksheet)??;

    Ok(data_rows(&range))
}

fn data_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((end_row, end_col)) = range.end() else {
        return Vec::new();
    };

    (1..=end_row)
        .map(|row| {
            (0..=end_col)
                .map(|col| range.get_value((row, col)).map(Cell::from).unwrap_or(Cell::Empty))
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .collect()
}

/// Write processed records to a new workbook at `path`
///
/// The document creation date is pinned so identical records produce
/// identical workbook metadata. Text longer than a cell can hold (an error
/// detail echoing a maximal input cell, say) is cut to [`MAX_CELL_CHARS`].
pub fn write_processed(path: &Path, records: &[ValidatedRecord]) -> Result<(), PipelineError> {
    let mut workbook = Workbook::new();
    let properties = DocProperties::new()
        .set_title("Processed Data")
        .set_creation_datetime(&ExcelDateTime::from_ymd(2000, 1, 1)?);
    workbook.set_properties(&properties);

    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(PROCESSED_SHEET_NAME)?;

    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
        worksheet.set_column_width(col as u16, width)?;
    }

    for (index, record) in records.iter().enumerate() {
        let row = index as u32 + 1;
        if !record.full_name.is_empty() {
            worksheet.write_string(row, 0, fit_cell(&record.full_name))?;
        }
        if let Some(date) = record.birth_date {
            worksheet.write_string(row, 1, date.to_string())?;
        }
        worksheet.write_number(row, 2, record.age_years)?;
        worksheet.write_number(row, 3, record.age_months)?;
        worksheet.write_string(row, 4, record.status.label())?;
        if !record.error_details.is_empty() {
            worksheet.write_string(row, 5, fit_cell(&record.error_details))?;
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn fit_cell(text: &str) -> &str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Read a processed workbook back into records
pub fn read_processed(path: &Path) -> Result<Vec<ValidatedRecord>, PipelineError> {
    Ok(read_data_rows(path)?
        .iter()
        .map(|cells| record_from_row(cells))
        .collect())
}

/// Interpret one processed row
///
/// Rows that do not match the processed layout come back as `NOT OK`
/// records rather than failing the whole read.
pub fn record_from_row(cells: &[Cell]) -> ValidatedRecord {
    let full_name = match cells.first() {
        Some(Cell::Text(s)) => s.clone(),
        Some(Cell::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    parse_processed_row(cells, &full_name)
        .unwrap_or_else(|| ValidatedRecord::invalid(full_name, None, INVALID_ROW_DATA))
}

fn parse_processed_row(cells: &[Cell], full_name: &str) -> Option<ValidatedRecord> {
    let cell = |idx: usize| cells.get(idx).unwrap_or(&Cell::Empty);

    let birth_date = match cell(1) {
        Cell::Empty => None,
        Cell::Date(d) => Some(*d),
        Cell::Text(s) => Some(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()?),
        _ => return None,
    };
    let age_years = whole_number(cell(2))?;
    let age_months = whole_number(cell(3))?;
    let status = match cell(4) {
        Cell::Text(s) => RecordStatus::from_label(s)?,
        _ => return None,
    };
    let error_details = match cell(5) {
        Cell::Empty => String::new(),
        Cell::Text(s) => s.clone(),
        _ => return None,
    };

    Some(ValidatedRecord {
        full_name: full_name.to_string(),
        birth_date,
        age_years,
        age_months,
        status,
        error_details,
    })
}

fn whole_number(cell: &Cell) -> Option<u32> {
    match cell {
        Cell::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64 => {
            Some(*n as u32)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_processed_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("processed.xlsx");

        let records = vec![
            ValidatedRecord::valid(
                "Ivanov Ivan",
                date(1990, 5, 15),
                crate::models::Age { years: 34, months: 0 },
            ),
            ValidatedRecord::invalid("", None, "missing name"),
            ValidatedRecord::invalid("Future Kid", Some(date(2030, 1, 1)), "birth date in the future"),
            ValidatedRecord::invalid("Bad Date", None, "invalid date format: 31/02/1990"),
        ];

        write_processed(&path, &records).unwrap();
        let read_back = read_processed(&path).unwrap();

        assert_eq!(read_back, records);
    }

    #[test]
    fn test_oversized_error_detail_is_cut_to_cell_limit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("long.xlsx");

        let long_input = "x".repeat(MAX_CELL_CHARS);
        let records = vec![ValidatedRecord::invalid(
            "Long",
            None,
            format!("invalid date format: {}", long_input),
        )];

        write_processed(&path, &records).unwrap();
        let read_back = read_processed(&path).unwrap();
        assert_eq!(read_back[0].error_details.chars().count(), MAX_CELL_CHARS);
        assert!(read_back[0].error_details.starts_with("invalid date format: x"));
    }

    #[test]
    fn test_fit_cell_counts_characters() {
        let text = "\u{e9}".repeat(MAX_CELL_CHARS + 5);
        assert_eq!(fit_cell(&text).chars().count(), MAX_CELL_CHARS);
        assert_eq!(fit_cell("short"), "short");
    }

    #[test]
    fn test_empty_record_list_writes_header_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.xlsx");

        write_processed(&path, &[]).unwrap();
        assert!(read_processed(&path).unwrap().is_empty());
    }

    #[test]
    fn test_record_from_row_falls_back_on_bad_data() {
        let cells = [
            Cell::text("Someone"),
            Cell::text("not a date"),
            Cell::Number(3.0),
            Cell::Number(1.0),
            Cell::text("OK"),
        ];
        let record = record_from_row(&cells);
        assert_eq!(record.full_name, "Someone");
        assert_eq!(record.status, RecordStatus::NotOk);
        assert_eq!(record.error_details, INVALID_ROW_DATA);
    }

    #[test]
    fn test_record_from_row_rejects_unknown_status() {
        let cells = [
            Cell::text("Someone"),
            Cell::Empty,
            Cell::Number(0.0),
            Cell::Number(0.0),
            Cell::text("PERHAPS"),
        ];
        assert_eq!(record_from_row(&cells).error_details, INVALID_ROW_DATA);
    }

    #[test]
    fn test_data_conversion() {
        assert_eq!(Cell::from(&Data::Empty), Cell::Empty);
        assert_eq!(Cell::from(&Data::Int(7)), Cell::Number(7.0));
        assert_eq!(
            Cell::from(&Data::DateTimeIso("1990-05-15T00:00:00".to_string())),
            Cell::text("1990-05-15")
        );
        assert_eq!(Cell::from(&Data::Bool(true)), Cell::text("true"));
    }
}

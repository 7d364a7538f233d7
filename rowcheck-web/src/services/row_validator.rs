//! Row validation
//!
//! Turns one input row (name cell, birth date cell, trailing cells ignored)
//! into a [`ValidatedRecord`]. Checks run in a fixed order and stop at the
//! first failure:
//!
//! 1. name present and non-blank (the date cell is not inspected otherwise)
//! 2. birth date cell present
//! 3. birth date interpretable (native date, 1900-system serial, or `YYYY-MM-DD` text)
//! 4. birth date not after the processing date
//!
//! Rejections are returned as values; nothing here panics on bad input.

use chrono::{Duration, NaiveDate};
use std::fmt;
use thiserror::Error;

use crate::models::{Age, ValidatedRecord};

/// Largest serial Excel can represent (9999-12-31)
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Spreadsheet cell value, independent of the reader library
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    /// Spreadsheet error value such as `#REF!`
    Error(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// True for cells carrying no content
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Date(d) => write!(f, "{}", d),
            Cell::Error(e) => f.write_str(e),
        }
    }
}

/// Reason a row was rejected
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("missing name")]
    MissingName,

    #[error("missing birth date")]
    MissingBirthDate,

    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("birth date in the future")]
    FutureBirthDate,

    #[error("row processing error: {0}")]
    Malformed(String),
}

/// Rejected row: the partially filled record plus the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    pub record: ValidatedRecord,
    pub reason: RowError,
}

impl RejectedRow {
    fn new(full_name: &str, birth_date: Option<NaiveDate>, reason: RowError) -> Self {
        Self {
            record: ValidatedRecord::invalid(full_name, birth_date, reason.to_string()),
            reason,
        }
    }

    pub fn into_record(self) -> ValidatedRecord {
        self.record
    }
}

/// Validate one row against the processing date
pub fn validate_row(cells: &[Cell], today: NaiveDate) -> Result<ValidatedRecord, RejectedRow> {
    let full_name = match read_name(cells.first()) {
        Ok(Some(name)) => name,
        Ok(None) => return Err(RejectedRow::new("", None, RowError::MissingName)),
        Err(reason) => return Err(RejectedRow::new("", None, reason)),
    };

    let birth_date = read_birth_date(cells.get(1))
        .map_err(|reason| RejectedRow::new(&full_name, None, reason))?;

    match Age::between(birth_date, today) {
        Some(age) => Ok(ValidatedRecord::valid(full_name, birth_date, age)),
        None => Err(RejectedRow::new(
            &full_name,
            Some(birth_date),
            RowError::FutureBirthDate,
        )),
    }
}

/// Validate a row and keep the record either way
pub fn validate_row_record(cells: &[Cell], today: NaiveDate) -> ValidatedRecord {
    validate_row(cells, today).unwrap_or_else(RejectedRow::into_record)
}

fn read_name(cell: Option<&Cell>) -> Result<Option<String>, RowError> {
    match cell {
        None | Some(Cell::Empty) => Ok(None),
        Some(Cell::Error(e)) => Err(RowError::Malformed(format!(
            "name cell holds error value {}",
            e
        ))),
        Some(other) => {
            let name = other.to_string().trim().to_string();
            Ok((!name.is_empty()).then_some(name))
        }
    }
}

fn read_birth_date(cell: Option<&Cell>) -> Result<NaiveDate, RowError> {
    let cell = match cell {
        Some(cell) if !cell.is_empty() => cell,
        _ => return Err(RowError::MissingBirthDate),
    };

    match cell {
        Cell::Date(date) => Ok(*date),
        Cell::Number(serial) => date_from_serial(*serial),
        Cell::Text(text) => parse_iso_date(text.trim())
            .ok_or_else(|| RowError::InvalidDateFormat(text.clone())),
        Cell::Error(e) => Err(RowError::Malformed(format!(
            "birth date cell holds error value {}",
            e
        ))),
        Cell::Empty => Err(RowError::MissingBirthDate),
    }
}

/// Parse strict `YYYY-MM-DD` text
///
/// chrono's `%Y-%m-%d` also takes signs, short years and unpadded fields,
/// so the shape is checked first.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Convert a 1900-system spreadsheet serial to a date
///
/// Serial 1 is 1900-01-01. Serial 60 is the non-existent 1900-02-29 kept by
/// spreadsheet software for compatibility; it maps to 1900-02-28. Any time
/// of day fraction is dropped.
pub fn date_from_serial(serial: f64) -> Result<NaiveDate, RowError> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return Err(RowError::Malformed(format!(
            "date serial {} is out of range",
            serial
        )));
    }

    let days = serial.floor() as i64;
    let (epoch, offset) = match days {
        1..=59 => ((1899, 12, 31), days),
        60 => ((1900, 2, 28), 0),
        _ => ((1899, 12, 30), days),
    };

    NaiveDate::from_ymd_opt(epoch.0, epoch.1, epoch.2)
        .and_then(|base| base.checked_add_signed(Duration::days(offset)))
        .ok_or_else(|| RowError::Malformed(format!("date serial {} is out of range", serial)))
}

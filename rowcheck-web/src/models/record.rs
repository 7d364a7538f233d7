//! Validated row records
//!
//! One record per processed input row. A record with status `OK` always has
//! a birth date that is not in the future and ages matching that date. A
//! `NOT OK` record carries an error message and zero ages.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-record validity label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOT OK")]
    NotOk,
}

impl RecordStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Ok => "OK",
            RecordStatus::NotOk => "NOT OK",
        }
    }

    /// Parse a label written by [`RecordStatus::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "OK" => Some(RecordStatus::Ok),
            "NOT OK" => Some(RecordStatus::NotOk),
            _ => None,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Age as whole years plus remaining months
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Age {
    pub years: u32,
    /// Always in 0..=11
    pub months: u32,
}

impl Age {
    /// Calendar-aware difference between `birth` and `today`
    ///
    /// A month only counts once its day-of-month has been reached, so
    /// 2020-01-31 → 2020-02-29 is zero months. Returns `None` when `birth`
    /// is after `today`.
    pub fn between(birth: NaiveDate, today: NaiveDate) -> Option<Self> {
        if birth > today {
            return None;
        }

        let mut total_months = (today.year() - birth.year()) * 12
            + today.month() as i32
            - birth.month() as i32;
        if today.day() < birth.day() {
            total_months -= 1;
        }

        let total_months = u32::try_from(total_months).ok()?;
        Some(Self {
            years: total_months / 12,
            months: total_months % 12,
        })
    }

    pub fn total_months(&self) -> u32 {
        self.years * 12 + self.months
    }
}

/// One row's derived, validated output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedRecord {
    pub full_name: String,
    pub birth_date: Option<NaiveDate>,
    pub age_years: u32,
    pub age_months: u32,
    pub status: RecordStatus,
    /// Empty for `OK` records
    pub error_details: String,
}

impl ValidatedRecord {
    /// Successful record
    pub fn valid(full_name: impl Into<String>, birth_date: NaiveDate, age: Age) -> Self {
        Self {
            full_name: full_name.into(),
            birth_date: Some(birth_date),
            age_years: age.years,
            age_months: age.months,
            status: RecordStatus::Ok,
            error_details: String::new(),
        }
    }

    /// Failed record; ages are always zero
    pub fn invalid(
        full_name: impl Into<String>,
        birth_date: Option<NaiveDate>,
        error_details: impl Into<String>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            birth_date,
            age_years: 0,
            age_months: 0,
            status: RecordStatus::NotOk,
            error_details: error_details.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == RecordStatus::Ok
    }

    /// ISO text of the birth date, empty when absent
    pub fn birth_date_text(&self) -> String {
        self.birth_date.map(|d| d.to_string()).unwrap_or_default()
    }
}

//! Row conversion for the `attendance` table.

use crate::models::{AttendanceRecord, AttendanceStatus};
use crate::{Error, Result};
use chrono::NaiveDate;

/// Column list shared by every `SELECT` against the `attendance` table.
pub const ATTENDANCE_COLUMNS: &str =
    "student_name, roll_number, date, subject, teacher_name, status";

/// Raw row as stored in `SQLite`.
///
/// Dates are stored as ISO `YYYY-MM-DD` text and statuses as their display
/// form, so the table stays readable with any `SQLite` client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRow {
    /// Student name.
    pub student_name: String,
    /// Roll number, if one was entered manually.
    pub roll_number: Option<i64>,
    /// ISO calendar date.
    pub date: String,
    /// Subject name.
    pub subject: String,
    /// Teacher name.
    pub teacher_name: String,
    /// `Present` or `Absent`.
    pub status: String,
}

impl AttendanceRow {
    /// Reads a row selected with [`ATTENDANCE_COLUMNS`].
    ///
    /// # Errors
    ///
    /// Returns the underlying `rusqlite` error if a column has the wrong type.
    pub fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            student_name: row.get(0)?,
            roll_number: row.get(1)?,
            date: row.get(2)?,
            subject: row.get(3)?,
            teacher_name: row.get(4)?,
            status: row.get(5)?,
        })
    }

    /// Builds the storable form of a record.
    #[must_use]
    pub fn from_record(record: &AttendanceRecord) -> Self {
        Self {
            student_name: record.student_name.clone(),
            roll_number: record.roll_number.map(i64::from),
            date: record.date.to_string(),
            subject: record.subject.clone(),
            teacher_name: record.teacher_name.clone(),
            status: record.status.as_str().to_string(),
        }
    }

    /// Converts the row into a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the stored date, status or
    /// roll number cannot be interpreted.
    pub fn into_record(self) -> Result<AttendanceRecord> {
        let corrupt = |what: &str, value: &str| Error::LedgerUnavailable {
            operation: "decode_row".to_string(),
            cause: format!("invalid {what} '{value}' for '{}'", self.student_name),
        };

        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| corrupt("date", &self.date))?;
        let status =
            AttendanceStatus::parse(&self.status).ok_or_else(|| corrupt("status", &self.status))?;
        let roll_number = self
            .roll_number
            .map(|n| u32::try_from(n).map_err(|_| corrupt("roll number", &n.to_string())))
            .transpose()?;

        Ok(AttendanceRecord {
            student_name: self.student_name,
            roll_number,
            date,
            subject: self.subject,
            teacher_name: self.teacher_name,
            status,
        })
    }
}

//! Ledger query filters.

use super::{AttendanceRecord, AttendanceStatus};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Filter for listing attendance records.
///
/// All set fields must match. Results are ordered newest day first, then by
/// subject and student name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Exact student name.
    pub student: Option<String>,
    /// Exact teacher name.
    pub teacher: Option<String>,
    /// Exact subject; `None` means all subjects.
    pub subject: Option<String>,
    /// Exact calendar day.
    pub date: Option<NaiveDate>,
    /// Exact status.
    pub status: Option<AttendanceStatus>,
    /// Case-insensitive substring of the student name or the ISO date.
    pub keyword: Option<String>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl RecordFilter {
    /// Creates an empty filter that matches every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one student.
    #[must_use]
    pub fn with_student(mut self, student: impl Into<String>) -> Self {
        self.student = Some(student.into());
        self
    }

    /// Restricts to one teacher.
    #[must_use]
    pub fn with_teacher(mut self, teacher: impl Into<String>) -> Self {
        self.teacher = Some(teacher.into());
        self
    }

    /// Restricts to one subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Restricts to one day.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Restricts to one status.
    #[must_use]
    pub const fn with_status(mut self, status: AttendanceStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Adds a keyword search; blank keywords are ignored.
    #[must_use]
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        let keyword = keyword.into().trim().to_string();
        self.keyword = (!keyword.is_empty()).then_some(keyword);
        self
    }

    /// Caps the number of rows returned.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the record satisfies every set field.
    #[must_use]
    pub fn matches(&self, record: &AttendanceRecord) -> bool {
        if self.student.as_ref().is_some_and(|s| *s != record.student_name) {
            return false;
        }
        if self.teacher.as_ref().is_some_and(|t| *t != record.teacher_name) {
            return false;
        }
        if self.subject.as_ref().is_some_and(|s| *s != record.subject) {
            return false;
        }
        if self.date.is_some_and(|d| d != record.date) {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        // ASCII-only folding, the same as SQLite `LIKE`.
        self.keyword.as_ref().is_none_or(|keyword| {
            let keyword = keyword.to_ascii_lowercase();
            record.student_name.to_ascii_lowercase().contains(&keyword)
                || record.date.to_string().contains(&keyword)
        })
    }

    /// Ordering used for filtered results.
    #[must_use]
    pub fn result_order(a: &AttendanceRecord, b: &AttendanceRecord) -> Ordering {
        b.date
            .cmp(&a.date)
            .then_with(|| a.subject.cmp(&b.subject))
            .then_with(|| a.student_name.cmp(&b.student_name))
    }
}

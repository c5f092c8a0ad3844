//! Attendance ledger trait.

use crate::Result;
use crate::models::{AttendanceKey, AttendanceRecord, RecordFilter};
use chrono::NaiveDate;
use std::sync::Arc;

/// Trait for attendance ledger backends.
///
/// The ledger is the durable source of truth for "was this student already
/// marked today". Backends must enforce uniqueness of
/// `(student_name, subject, date)` themselves; `exists` is only an
/// optimization in front of that constraint.
///
/// Implementations are shared between the recognition path and the manual
/// entry path, so every method takes `&self`.
pub trait Ledger: Send + Sync {
    /// Returns true if any row exists for the key, whatever its status.
    fn exists(&self, student: &str, subject: &str, date: NaiveDate) -> Result<bool>;

    /// Inserts a `Present` row with no roll number.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DuplicateKey`] if a row for the key already
    /// exists (including one inserted concurrently), or
    /// [`crate::Error::LedgerUnavailable`] if the store cannot be written.
    fn insert_present(
        &self,
        student: &str,
        subject: &str,
        date: NaiveDate,
        teacher: &str,
    ) -> Result<AttendanceRecord>;

    /// Inserts the record, replacing any existing row for its key.
    ///
    /// Used only by the manual entry path.
    fn insert_or_overwrite(&self, record: &AttendanceRecord) -> Result<()>;

    /// Retrieves the row for a key.
    fn get(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>>;

    /// Lists rows matching a filter, newest day first.
    fn query(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>>;

    /// Returns the total number of rows.
    fn count(&self) -> Result<usize>;

    /// Writes a batch of records with overwrite semantics.
    ///
    /// Returns the number of records written. Backends that support
    /// transactions apply the batch atomically.
    fn overwrite_all(&self, records: &[AttendanceRecord]) -> Result<usize> {
        for record in records {
            self.insert_or_overwrite(record)?;
        }
        Ok(records.len())
    }

    /// Lists every row for one subject on one day.
    fn records_for_session(&self, subject: &str, date: NaiveDate) -> Result<Vec<AttendanceRecord>> {
        self.query(&RecordFilter::new().with_subject(subject).with_date(date))
    }

    /// Lists every row for one student across subjects and days.
    fn records_for_student(&self, student: &str) -> Result<Vec<AttendanceRecord>> {
        self.query(&RecordFilter::new().with_student(student))
    }
}

impl<L: Ledger + ?Sized> Ledger for Arc<L> {
    fn exists(&self, student: &str, subject: &str, date: NaiveDate) -> Result<bool> {
        (**self).exists(student, subject, date)
    }

    fn insert_present(
        &self,
        student: &str,
        subject: &str,
        date: NaiveDate,
        teacher: &str,
    ) -> Result<AttendanceRecord> {
        (**self).insert_present(student, subject, date, teacher)
    }

    fn insert_or_overwrite(&self, record: &AttendanceRecord) -> Result<()> {
        (**self).insert_or_overwrite(record)
    }

    fn overwrite_all(&self, records: &[AttendanceRecord]) -> Result<usize> {
        (**self).overwrite_all(records)
    }

    fn get(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>> {
        (**self).get(key)
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>> {
        (**self).query(filter)
    }

    fn count(&self) -> Result<usize> {
        (**self).count()
    }
}

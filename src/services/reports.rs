//! Attendance reports.

use crate::models::{AttendanceRecord, AttendanceSummary, RecordFilter};
use crate::storage::Ledger;
use crate::Result;

/// Read-only queries over the ledger.
pub struct ReportService<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> ReportService<L> {
    /// Creates a service over a ledger.
    #[must_use]
    pub const fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Lists records matching `filter`, newest day first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the ledger cannot be read.
    pub fn list(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>> {
        let records = self.ledger.query(filter)?;
        tracing::debug!(count = records.len(), ?filter, "Report listed");
        Ok(records)
    }

    /// Summarises one student's attendance across all subjects and days.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the ledger cannot be read.
    pub fn student_summary(&self, student: &str) -> Result<AttendanceSummary> {
        let records = self.ledger.records_for_student(student)?;
        Ok(AttendanceSummary::from_records(student, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use crate::storage::SqliteLedger;
    use chrono::NaiveDate;

    fn seeded() -> ReportService<SqliteLedger> {
        let ledger = SqliteLedger::in_memory().unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        ledger.insert_present("Alice", "Maths", day(9), "T1").unwrap();
        ledger.insert_present("Alice", "Science", day(10), "T2").unwrap();
        ledger.insert_present("Bob", "Maths", day(10), "T1").unwrap();

        let mut absent = AttendanceRecord::present("Alice", "Maths", day(10), "T1");
        absent.status = AttendanceStatus::Absent;
        ledger.insert_or_overwrite(&absent).unwrap();

        ReportService::new(ledger)
    }

    #[test]
    fn test_list_by_teacher_newest_first() {
        let reports = seeded();
        let rows = reports.list(&RecordFilter::new().with_teacher("T1")).unwrap();
        let dates: Vec<_> = rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-10", "2024-01-10", "2024-01-09"]);
    }

    #[test]
    fn test_list_all_subjects_with_keyword() {
        let reports = seeded();
        let rows = reports.list(&RecordFilter::new().with_keyword("alice")).unwrap();
        assert_eq!(rows.len(), 3);
        let rows = reports
            .list(&RecordFilter::new().with_subject("Science").with_keyword("alice"))
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_student_summary() {
        let reports = seeded();
        let summary = reports.student_summary("Alice").unwrap();
        assert_eq!(summary.present, 2);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.to_string(), "2/3 classes (66.67%)");

        let nobody = reports.student_summary("Zed").unwrap();
        assert_eq!(nobody.total, 0);
        assert!(nobody.percentage().abs() < f64::EPSILON);
    }
}

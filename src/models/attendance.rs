//! Attendance records and their key.

use super::SessionContext;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attendance status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    /// The student attended.
    Present,
    /// The student was marked absent by the manual path.
    Absent,
}

impl AttendanceStatus {
    /// Returns the status as stored in the ledger.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Absent => "Absent",
        }
    }

    /// Returns true for `Present`.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }

    /// Parses a stored status string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "present" => Some(Self::Present),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Uniqueness key of the ledger: one row per student, subject and day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttendanceKey {
    /// Student name.
    pub student_name: String,
    /// Subject.
    pub subject: String,
    /// Calendar day.
    pub date: NaiveDate,
}

impl AttendanceKey {
    /// Creates a key.
    #[must_use]
    pub fn new(student_name: impl Into<String>, subject: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            student_name: student_name.into(),
            subject: subject.into(),
            date,
        }
    }

    /// Creates the key of a student within a session.
    #[must_use]
    pub fn for_session(student_name: impl Into<String>, session: &SessionContext) -> Self {
        Self::new(student_name, session.subject(), session.date())
    }
}

impl fmt::Display for AttendanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.student_name, self.subject, self.date)
    }
}

/// Durable attendance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Student name.
    pub student_name: String,
    /// Roll number; only the manual path assigns one.
    pub roll_number: Option<u32>,
    /// Calendar day.
    pub date: NaiveDate,
    /// Subject.
    pub subject: String,
    /// Teacher who ran the session.
    pub teacher_name: String,
    /// Status.
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    /// Creates the `Present` record the recognition path writes.
    #[must_use]
    pub fn present(
        student_name: impl Into<String>,
        subject: impl Into<String>,
        date: NaiveDate,
        teacher_name: impl Into<String>,
    ) -> Self {
        Self {
            student_name: student_name.into(),
            roll_number: None,
            date,
            subject: subject.into(),
            teacher_name: teacher_name.into(),
            status: AttendanceStatus::Present,
        }
    }

    /// Returns the record's ledger key.
    #[must_use]
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey::new(&self.student_name, &self.subject, self.date)
    }

    /// Returns true for `Present` records.
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.status == AttendanceStatus::Present
    }
}

/// Per-student attendance totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    /// Student name.
    pub student_name: String,
    /// Number of `Present` records.
    pub present: usize,
    /// Number of records of any status.
    pub total: usize,
}

impl AttendanceSummary {
    /// Tallies a student's records.
    #[must_use]
    pub fn from_records(student_name: impl Into<String>, records: &[AttendanceRecord]) -> Self {
        Self {
            student_name: student_name.into(),
            present: records.iter().filter(|r| r.is_present()).count(),
            total: records.len(),
        }
    }

    /// Attendance percentage, `0.0` when there are no records.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.present as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for AttendanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} classes ({:.2}%)",
            self.present,
            self.total,
            self.percentage()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(AttendanceStatus::parse("Present"), Some(AttendanceStatus::Present));
        assert_eq!(AttendanceStatus::parse("absent"), Some(AttendanceStatus::Absent));
        assert_eq!(AttendanceStatus::parse("late"), None);
        assert_eq!(AttendanceStatus::Present.to_string(), "Present");
    }

    #[test]
    fn test_present_record_has_no_roll_number() {
        let record = AttendanceRecord::present("Alice", "Maths", day(10), "T1");
        assert_eq!(record.roll_number, None);
        assert!(record.is_present());
        assert_eq!(record.key(), AttendanceKey::new("Alice", "Maths", day(10)));
    }

    #[test]
    fn test_summary_percentage() {
        let mut absent = AttendanceRecord::present("Alice", "Maths", day(11), "T1");
        absent.status = AttendanceStatus::Absent;
        let records = vec![
            AttendanceRecord::present("Alice", "Maths", day(10), "T1"),
            absent,
            AttendanceRecord::present("Alice", "Science", day(10), "T2"),
        ];

        let summary = AttendanceSummary::from_records("Alice", &records);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.to_string(), "2/3 classes (66.67%)");
    }

    #[test]
    fn test_empty_summary() {
        let summary = AttendanceSummary::from_records("Nobody", &[]);
        assert!(summary.percentage().abs() < f64::EPSILON);
    }
}

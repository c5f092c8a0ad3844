//! Manual attendance entry.
//!
//! The teacher-facing path: a full roster is written in one go with an
//! explicit status per student, overwriting whatever the recognition path
//! or an earlier save recorded for the same session.

use crate::models::{AttendanceRecord, AttendanceStatus, SessionContext};
use crate::storage::Ledger;
use crate::Result;
use std::collections::{BTreeMap, HashSet};
use tracing::instrument;

/// Writes and reloads a session's roster.
pub struct ManualEntryService<L: Ledger> {
    ledger: L,
}

impl<L: Ledger> ManualEntryService<L> {
    /// Creates a service over a ledger.
    #[must_use]
    pub const fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Saves the roster for a session.
    ///
    /// Students are numbered from 1 in roster order. A student is `Present`
    /// if their name appears in `present`, compared case-insensitively, and
    /// `Absent` otherwise. Blank roster entries are skipped without using
    /// up a roll number.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the batch cannot be
    /// written. No row of the batch is kept in that case when the backend
    /// is transactional.
    #[instrument(skip(self, roster, present), fields(operation = "manual_save", session = %session, roster = roster.len()))]
    pub fn save(
        &self,
        session: &SessionContext,
        roster: &[String],
        present: &HashSet<String>,
    ) -> Result<usize> {
        let present: HashSet<String> = present.iter().map(|n| n.trim().to_lowercase()).collect();
        let records = Self::roster_records(session, roster, |name| {
            present.contains(&name.to_lowercase())
        });

        let written = self.ledger.overwrite_all(&records)?;
        let marked = records.iter().filter(|r| r.is_present()).count();
        tracing::info!(written, present = marked, "Manual attendance saved");
        metrics::counter!("manual_rows_written_total").increment(written as u64);
        Ok(written)
    }

    /// Saves the roster with every student present.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the batch cannot be
    /// written.
    #[instrument(skip(self, roster), fields(operation = "manual_mark_all", session = %session))]
    pub fn mark_all_present(&self, session: &SessionContext, roster: &[String]) -> Result<usize> {
        let records = Self::roster_records(session, roster, |_| true);
        let written = self.ledger.overwrite_all(&records)?;
        tracing::info!(written, "All students marked present");
        metrics::counter!("manual_rows_written_total").increment(written as u64);
        Ok(written)
    }

    /// Loads the recorded status of every student in the session.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LedgerUnavailable`] if the ledger cannot be
    /// read.
    pub fn load(&self, session: &SessionContext) -> Result<BTreeMap<String, AttendanceStatus>> {
        Ok(self
            .ledger
            .records_for_session(session.subject(), session.date())?
            .into_iter()
            .map(|r| (r.student_name, r.status))
            .collect())
    }

    fn roster_records(
        session: &SessionContext,
        roster: &[String],
        is_present: impl Fn(&str) -> bool,
    ) -> Vec<AttendanceRecord> {
        roster
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .zip(1..)
            .map(|(name, roll)| AttendanceRecord {
                student_name: name.to_string(),
                roll_number: Some(roll),
                date: session.date(),
                subject: session.subject().to_string(),
                teacher_name: session.teacher().to_string(),
                status: if is_present(name) {
                    AttendanceStatus::Present
                } else {
                    AttendanceStatus::Absent
                },
            })
            .collect()
    }
}

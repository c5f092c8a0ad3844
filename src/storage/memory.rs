//! In-memory ledger backend.
//!
//! Provides a non-persistent implementation of [`Ledger`] with the same
//! uniqueness semantics as the `SQLite` backend. Used by tests and by
//! dry-run replays.

use crate::models::{AttendanceKey, AttendanceRecord, RecordFilter};
use crate::storage::traits::Ledger;
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory attendance ledger.
///
/// Uses `RwLock` for thread-safe access. The uniqueness check and insert in
/// [`Ledger::insert_present`] happen under one write lock, so concurrent
/// writers observe [`Error::DuplicateKey`] exactly like against `SQLite`.
///
/// The backend counts every trait call and can be switched into an
/// unavailable state, which lets tests observe the reconciler's storage
/// traffic and its outage handling.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    rows: RwLock<HashMap<AttendanceKey, AttendanceRecord>>,
    operations: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger pre-populated with records (last one wins per key).
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = AttendanceRecord>) -> Self {
        let rows = records.into_iter().map(|r| (r.key(), r)).collect();
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// Returns the number of ledger calls made so far.
    #[must_use]
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with [`Error::LedgerUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns a sorted snapshot of all rows.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AttendanceRecord> {
        let mut rows: Vec<_> = self
            .rows
            .read()
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        rows.sort_by(RecordFilter::result_order);
        rows
    }

    fn begin(&self, operation: &str) -> Result<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::LedgerUnavailable {
                operation: operation.to_string(),
                cause: "in-memory ledger marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn read(
        &self,
        operation: &str,
    ) -> Result<RwLockReadGuard<'_, HashMap<AttendanceKey, AttendanceRecord>>> {
        self.begin(operation)?;
        self.rows.read().map_err(|e| Error::LedgerUnavailable {
            operation: operation.to_string(),
            cause: e.to_string(),
        })
    }

    fn write(
        &self,
        operation: &str,
    ) -> Result<RwLockWriteGuard<'_, HashMap<AttendanceKey, AttendanceRecord>>> {
        self.begin(operation)?;
        self.rows.write().map_err(|e| Error::LedgerUnavailable {
            operation: operation.to_string(),
            cause: e.to_string(),
        })
    }
}

impl Ledger for InMemoryLedger {
    fn exists(&self, student: &str, subject: &str, date: NaiveDate) -> Result<bool> {
        let rows = self.read("exists")?;
        Ok(rows.contains_key(&AttendanceKey::new(student, subject, date)))
    }

    fn insert_present(
        &self,
        student: &str,
        subject: &str,
        date: NaiveDate,
        teacher: &str,
    ) -> Result<AttendanceRecord> {
        let mut rows = self.write("insert_present")?;
        let record = AttendanceRecord::present(student, subject, date, teacher);

        match rows.entry(record.key()) {
            Entry::Occupied(_) => Err(Error::DuplicateKey {
                student: student.to_string(),
                subject: subject.to_string(),
                date,
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            },
        }
    }

    fn insert_or_overwrite(&self, record: &AttendanceRecord) -> Result<()> {
        let mut rows = self.write("insert_or_overwrite")?;
        rows.insert(record.key(), record.clone());
        Ok(())
    }

    fn get(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>> {
        let rows = self.read("get")?;
        Ok(rows.get(key).cloned())
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>> {
        let rows = self.read("query")?;
        let mut matched: Vec<_> = rows.values().filter(|r| filter.matches(r)).cloned().collect();
        drop(rows);

        matched.sort_by(RecordFilter::result_order);
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    fn count(&self) -> Result<usize> {
        let rows = self.read("count")?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceStatus;
    use std::sync::Arc;
    use std::thread;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn test_insert_and_exists() {
        let ledger = InMemoryLedger::new();
        assert!(!ledger.exists("Alice", "Maths", day()).unwrap());

        let record = ledger.insert_present("Alice", "Maths", day(), "T1").unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert!(ledger.exists("Alice", "Maths", day()).unwrap());
        assert!(!ledger.exists("Alice", "Science", day()).unwrap());
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_insert() {
        let ledger = InMemoryLedger::new();
        ledger.insert_present("Alice", "Maths", day(), "T1").unwrap();

        let result = ledger.insert_present("Alice", "Maths", day(), "T2");
        assert!(matches!(result, Err(Error::DuplicateKey { ref student, .. }) if student == "Alice"));
        assert_eq!(ledger.snapshot()[0].teacher_name, "T1");
    }

    #[test]
    fn test_overwrite_replaces_status() {
        let ledger = InMemoryLedger::new();
        ledger.insert_present("Alice", "Maths", day(), "T1").unwrap();

        let mut absent = AttendanceRecord::present("Alice", "Maths", day(), "T1");
        absent.status = AttendanceStatus::Absent;
        absent.roll_number = Some(3);
        ledger.insert_or_overwrite(&absent).unwrap();

        let stored = ledger.get(&absent.key()).unwrap().unwrap();
        assert_eq!(stored, absent);
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_unavailable() {
        let ledger = InMemoryLedger::new();
        ledger.set_unavailable(true);
        let result = ledger.exists("Alice", "Maths", day());
        assert!(matches!(result, Err(Error::LedgerUnavailable { .. })));
        assert_eq!(ledger.operation_count(), 1);

        ledger.set_unavailable(false);
        assert!(ledger.exists("Alice", "Maths", day()).is_ok());
    }

    #[test]
    fn test_concurrent_inserts_single_winner() {
        let ledger = Arc::new(InMemoryLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    ledger
                        .insert_present("Alice", "Maths", day(), &format!("T{i}"))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(ledger.count().unwrap(), 1);
    }

    #[test]
    fn test_query_limit() {
        let ledger = InMemoryLedger::new();
        for name in ["Alice", "Bob", "Cara"] {
            ledger.insert_present(name, "Maths", day(), "T1").unwrap();
        }
        let rows = ledger.query(&RecordFilter::new().with_limit(2)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].student_name, "Alice");
    }
}

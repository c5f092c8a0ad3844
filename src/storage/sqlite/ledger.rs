//! `SQLite`-based attendance ledger.

use super::metrics::status_label;
use super::row::{ATTENDANCE_COLUMNS, AttendanceRow};
use super::{acquire_lock, build_filter_clause, configure_connection, record_operation_metrics};
use crate::models::{AttendanceKey, AttendanceRecord, RecordFilter};
use crate::storage::migrations::{LEDGER_MIGRATIONS, MigrationRunner};
use crate::storage::traits::Ledger;
use crate::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, ffi, params, params_from_iter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::instrument;

const BACKEND: &str = "sqlite";

const UPSERT_SQL: &str = "INSERT INTO attendance
        (student_name, roll_number, date, subject, teacher_name, status, recorded_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
     ON CONFLICT (student_name, subject, date) DO UPDATE SET
        roll_number = excluded.roll_number,
        teacher_name = excluded.teacher_name,
        status = excluded.status,
        recorded_at = excluded.recorded_at";

/// `SQLite`-based attendance ledger.
///
/// The `attendance` table carries `UNIQUE (student_name, subject, date)`,
/// which is the only thing that guarantees a single row per key when
/// several processes share one database file. Constraint violations on
/// insert surface as [`Error::DuplicateKey`]; every other failure surfaces
/// as [`Error::LedgerUnavailable`].
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` because `rusqlite::Connection` is not `Sync`.
/// WAL mode and a 5 second `busy_timeout` let separate processes write the
/// same file without spurious `SQLITE_BUSY` failures.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteLedger {
    /// Opens (or creates) a ledger at `db_path` and applies migrations.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the database cannot be opened
    /// or migrated.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::LedgerUnavailable {
                operation: "create_ledger_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::LedgerUnavailable {
            operation: "open_sqlite".to_string(),
            cause: format!("{}: {e}", db_path.display()),
        })?;

        let ledger = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };
        ledger.initialize()?;
        Ok(ledger)
    }

    /// Creates an in-memory ledger (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::LedgerUnavailable {
            operation: "open_sqlite_in_memory".to_string(),
            cause: e.to_string(),
        })?;

        let ledger = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };
        ledger.initialize()?;
        Ok(ledger)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Returns the applied schema version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the version cannot be read.
    pub fn schema_version(&self) -> Result<u32> {
        let conn = acquire_lock(&self.conn);
        MigrationRunner::new(&conn).current_version()
    }

    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;
        let version = MigrationRunner::new(&conn).run(LEDGER_MIGRATIONS)?;
        tracing::debug!(schema_version = version, path = ?self.db_path, "Ledger ready");
        Ok(())
    }

    fn timed<T>(&self, operation: &'static str, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            f(&conn)
        };
        record_operation_metrics(BACKEND, operation, start, status_label(&result));
        result
    }
}

fn unavailable(operation: &str, err: &rusqlite::Error) -> Error {
    Error::LedgerUnavailable {
        operation: operation.to_string(),
        cause: err.to_string(),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn upsert(conn: &Connection, record: &AttendanceRecord) -> rusqlite::Result<usize> {
    let row = AttendanceRow::from_record(record);
    conn.execute(
        UPSERT_SQL,
        params![
            row.student_name,
            row.roll_number,
            row.date,
            row.subject,
            row.teacher_name,
            row.status
        ],
    )
}

impl Ledger for SqliteLedger {
    #[instrument(skip(self), fields(operation = "exists", backend = BACKEND))]
    fn exists(&self, student: &str, subject: &str, date: NaiveDate) -> Result<bool> {
        self.timed("exists", |conn| {
            conn.query_row(
                "SELECT EXISTS (
                    SELECT 1 FROM attendance
                    WHERE student_name = ?1 AND subject = ?2 AND date = ?3
                )",
                params![student, subject, date.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| unavailable("exists", &e))
        })
    }

    #[instrument(skip(self), fields(operation = "insert_present", backend = BACKEND))]
    fn insert_present(
        &self,
        student: &str,
        subject: &str,
        date: NaiveDate,
        teacher: &str,
    ) -> Result<AttendanceRecord> {
        let record = AttendanceRecord::present(student, subject, date, teacher);
        self.timed("insert_present", |conn| {
            let row = AttendanceRow::from_record(&record);
            conn.execute(
                "INSERT INTO attendance
                    (student_name, roll_number, date, subject, teacher_name, status, recorded_at)
                 VALUES (?1, NULL, ?2, ?3, ?4, ?5, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![row.student_name, row.date, row.subject, row.teacher_name, row.status],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DuplicateKey {
                        student: student.to_string(),
                        subject: subject.to_string(),
                        date,
                    }
                } else {
                    unavailable("insert_present", &e)
                }
            })?;
            Ok(())
        })?;
        Ok(record)
    }

    #[instrument(skip(self, record), fields(operation = "insert_or_overwrite", backend = BACKEND, key = %record.key()))]
    fn insert_or_overwrite(&self, record: &AttendanceRecord) -> Result<()> {
        self.timed("insert_or_overwrite", |conn| {
            upsert(conn, record).map_err(|e| unavailable("insert_or_overwrite", &e))?;
            Ok(())
        })
    }

    #[instrument(skip(self, records), fields(operation = "overwrite_all", backend = BACKEND, count = records.len()))]
    fn overwrite_all(&self, records: &[AttendanceRecord]) -> Result<usize> {
        self.timed("overwrite_all", |conn| {
            conn.execute_batch("BEGIN IMMEDIATE")
                .map_err(|e| unavailable("begin_transaction", &e))?;

            let result = records
                .iter()
                .try_for_each(|record| upsert(conn, record).map(|_| ()))
                .map_err(|e| unavailable("overwrite_all", &e));

            let result = result.and_then(|()| {
                conn.execute_batch("COMMIT")
                    .map_err(|e| unavailable("commit_transaction", &e))
            });
            if result.is_err() && !conn.is_autocommit() {
                let _ = conn.execute_batch("ROLLBACK");
            }

            result.map(|()| records.len())
        })
    }

    #[instrument(skip(self), fields(operation = "get", backend = BACKEND, key = %key))]
    fn get(&self, key: &AttendanceKey) -> Result<Option<AttendanceRecord>> {
        self.timed("get", |conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {ATTENDANCE_COLUMNS} FROM attendance
                         WHERE student_name = ?1 AND subject = ?2 AND date = ?3"
                    ),
                    params![key.student_name, key.subject, key.date.to_string()],
                    AttendanceRow::from_sql,
                )
                .optional()
                .map_err(|e| unavailable("get", &e))?;

            row.map(AttendanceRow::into_record).transpose()
        })
    }

    #[instrument(skip(self), fields(operation = "query", backend = BACKEND))]
    fn query(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>> {
        self.timed("query", |conn| {
            let (clause, params) = build_filter_clause(filter);
            let limit = filter
                .limit
                .map(|n| format!(" LIMIT {n}"))
                .unwrap_or_default();
            let sql = format!(
                "SELECT {ATTENDANCE_COLUMNS} FROM attendance{clause}
                 ORDER BY date DESC, subject ASC, student_name ASC{limit}"
            );

            let mut stmt = conn.prepare(&sql).map_err(|e| unavailable("prepare_query", &e))?;
            let rows = stmt
                .query_map(params_from_iter(params.iter()), AttendanceRow::from_sql)
                .map_err(|e| unavailable("query", &e))?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(|e| unavailable("query", &e))?;

            rows.into_iter().map(AttendanceRow::into_record).collect()
        })
    }

    #[instrument(skip(self), fields(operation = "count", backend = BACKEND))]
    fn count(&self) -> Result<usize> {
        self.timed("count", |conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM attendance", [], |row| row.get(0))
                .map_err(|e| unavailable("count", &e))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
    }
}

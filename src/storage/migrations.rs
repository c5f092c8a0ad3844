//! `SQLite` migration system for the attendance ledger.
//!
//! Migrations are embedded at compile time and applied when a ledger is
//! opened. The applied version is tracked in `PRAGMA user_version`, so a
//! database created by any earlier release upgrades in place.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rollcall::storage::migrations::{LEDGER_MIGRATIONS, MigrationRunner};
//!
//! let conn = rusqlite::Connection::open("attendance.db")?;
//! MigrationRunner::new(&conn).run(LEDGER_MIGRATIONS)?;
//! ```

use crate::{Error, Result};
use rusqlite::Connection;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: u32,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// Schema history of the `attendance` table.
pub const LEDGER_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Attendance table with one row per student, subject and day",
        sql: "CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_name TEXT NOT NULL,
                roll_number INTEGER,
                date TEXT NOT NULL,
                subject TEXT NOT NULL,
                teacher_name TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('Present', 'Absent')),
                UNIQUE (student_name, subject, date)
            );",
    },
    Migration {
        version: 2,
        description: "Indexes for session and report lookups",
        sql: "CREATE INDEX IF NOT EXISTS idx_attendance_subject_date ON attendance(subject, date);
              CREATE INDEX IF NOT EXISTS idx_attendance_teacher ON attendance(teacher_name);
              CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date DESC);",
    },
    Migration {
        version: 3,
        description: "Write timestamp for auditing",
        sql: "ALTER TABLE attendance ADD COLUMN recorded_at TEXT;",
    },
];

/// Applies pending migrations to one connection.
pub struct MigrationRunner<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationRunner<'a> {
    /// Creates a runner for a connection.
    #[must_use]
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns the version recorded in `user_version` (0 for a new database).
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the pragma cannot be read.
    pub fn current_version(&self) -> Result<u32> {
        self.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .map_err(|e| Error::LedgerUnavailable {
                operation: "read_schema_version".to_string(),
                cause: e.to_string(),
            })
    }

    /// Runs all pending migrations and returns the resulting version.
    ///
    /// Each migration runs in its own transaction together with the version
    /// bump, so a failed migration leaves the previous version intact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if a migration fails.
    pub fn run(&self, migrations: &[Migration]) -> Result<u32> {
        let start = self.current_version()?;
        let mut version = start;

        for migration in migrations.iter().filter(|m| m.version > start) {
            self.apply(migration)?;
            version = migration.version;
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "Applied ledger migration"
            );
        }

        Ok(version)
    }

    fn apply(&self, migration: &Migration) -> Result<()> {
        let fail = |e: rusqlite::Error| Error::LedgerUnavailable {
            operation: format!("migrate_v{}", migration.version),
            cause: e.to_string(),
        };

        self.conn.execute_batch("BEGIN IMMEDIATE").map_err(fail)?;

        let result = self
            .conn
            .execute_batch(migration.sql)
            .and_then(|()| {
                self.conn
                    .pragma_update(None, "user_version", migration.version)
            })
            .and_then(|()| self.conn.execute_batch("COMMIT"));

        result.map_err(|e| {
            if !self.conn.is_autocommit() {
                let _ = self.conn.execute_batch("ROLLBACK");
            }
            fail(e)
        })
    }
}

/// Returns the latest version in a migration list.
#[must_use]
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}

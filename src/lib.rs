//! # Rollcall
//!
//! Turns a noisy stream of face-match candidates into authoritative,
//! deduplicated attendance records.
//!
//! Rollcall sits between an external matcher (anything that maps an image
//! region to a named identity with a confidence) and a durable attendance
//! ledger. It decides which observations become a `Present` record and
//! suppresses repeats of the same person, both within a short cooldown and
//! within the same subject and calendar day.
//!
//! ## Layers
//!
//! - **Ledger**: one row per (student, subject, date), store-enforced uniqueness
//! - **Debounce tracker**: per-run, in-memory cooldown keyed by identity
//! - **Reconciler**: applies the debounce and ledger checks to one candidate
//! - **Recognition loop**: pulls frames, runs the matcher, feeds the reconciler
//!
//! ## Example
//!
//! ```rust,ignore
//! use rollcall::{Reconciler, ReconcilerConfig, SessionContext};
//! use rollcall::storage::SqliteLedger;
//!
//! let ledger = SqliteLedger::new("attendance.db")?;
//! let reconciler = Reconciler::new(ledger, ReconcilerConfig::default());
//! let session = reconciler.begin_session(SessionContext::new("Maths", "T1", today)?);
//! let decision = reconciler.reconcile(&candidate, &session, Utc::now())?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use chrono::NaiveDate;
use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{DebounceSettings, RollcallConfig};
pub use models::{
    Annotation, AnnotationTone, AttendanceKey, AttendanceRecord, AttendanceStatus,
    AttendanceSummary, BoundingBox, Decision, Identity, IdentityCandidate, RecordFilter,
    RejectReason, SessionContext, SuppressReason,
};
pub use services::{
    DebounceTracker, ManualEntryService, RecognitionLoop, RecognitionSession, Reconciler,
    ReconcilerConfig, ReportService, RunSummary, StopSignal,
};
pub use storage::{InMemoryLedger, Ledger, SqliteLedger};

/// Error type for rollcall operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidSession` | Empty or placeholder subject when building a session |
/// | `MatcherFailed` | The matcher could not evaluate one region |
/// | `DuplicateKey` | A ledger insert hit an existing (student, subject, date) row |
/// | `LedgerUnavailable` | The ledger could not be opened, read or written |
/// | `InvalidInput` | Malformed recordings, dates, or CLI arguments |
/// | `OperationFailed` | Config, log file, or telemetry setup failed |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The session context was rejected before a run started.
    ///
    /// Raised when:
    /// - The subject is empty after trimming
    /// - The subject is one of the configured placeholders ("Select Subject")
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// The matcher failed on a single region.
    ///
    /// Non-fatal: the recognition loop skips the region and carries on.
    #[error("matcher failed: {0}")]
    MatcherFailed(String),

    /// A row for the same key was already present when inserting.
    ///
    /// This is the expected outcome of two writers racing on the same key.
    /// It is terminal, never retried.
    #[error("attendance for '{student}' in '{subject}' on {date} already recorded")]
    DuplicateKey {
        /// Student name of the conflicting row.
        student: String,
        /// Subject of the conflicting row.
        subject: String,
        /// Calendar day of the conflicting row.
        date: NaiveDate,
    },

    /// The ledger could not be reached or returned an unexpected failure.
    ///
    /// Fatal to a recognition run: attendance must not be silently dropped.
    #[error("ledger unavailable during '{operation}': {cause}")]
    LedgerUnavailable {
        /// The ledger operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Returns true for failures that should end a recognition run.
    #[must_use]
    pub const fn is_fatal_to_run(&self) -> bool {
        matches!(self, Self::LedgerUnavailable { .. })
    }
}

/// Result type alias for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

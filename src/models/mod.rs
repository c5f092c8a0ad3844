//! Data models for rollcall.
//!
//! This module contains the core data structures that flow from the matcher
//! through the reconciler into the ledger.

mod attendance;
mod candidate;
mod decision;
mod filter;
mod session;

pub use attendance::{AttendanceKey, AttendanceRecord, AttendanceStatus, AttendanceSummary};
pub use candidate::{BoundingBox, Identity, IdentityCandidate};
pub use decision::{Annotation, AnnotationTone, Decision, RejectReason, SuppressReason};
pub use filter::RecordFilter;
pub use session::{DEFAULT_PLACEHOLDER_SUBJECTS, DEFAULT_TEACHER, SessionContext};

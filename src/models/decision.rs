//! Reconciliation decisions and the frame annotations derived from them.

use super::{AttendanceRecord, BoundingBox};
use serde::Serialize;
use std::fmt;

/// Why a recognised candidate did not produce a new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressReason {
    /// Accepted within the cooldown window.
    Debounced,
    /// The ledger already holds a row for this student, subject and day.
    AlreadyMarkedToday,
}

impl SuppressReason {
    /// Returns the reason label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debounced => "debounced",
            Self::AlreadyMarkedToday => "already-marked-today",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a candidate was discarded outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// Unknown-marker or below the matcher's acceptance threshold.
    Unknown,
}

impl RejectReason {
    /// Returns the reason label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of reconciling one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum Decision {
    /// A new `Present` row was written.
    Accepted {
        /// The inserted record.
        record: AttendanceRecord,
    },
    /// A recognised student was not written again.
    Suppressed {
        /// Student name.
        student: String,
        /// Reason.
        reason: SuppressReason,
    },
    /// The candidate was discarded without touching the ledger.
    Rejected {
        /// Reason.
        reason: RejectReason,
    },
}

impl Decision {
    /// Returns the decision kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Suppressed { .. } => "suppressed",
            Self::Rejected { .. } => "rejected",
        }
    }

    /// Returns the reason label, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Accepted { .. } => None,
            Self::Suppressed { reason, .. } => Some(reason.as_str()),
            Self::Rejected { reason } => Some(reason.as_str()),
        }
    }

    /// Returns true if a record was written.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Returns the suppression reason, if suppressed.
    #[must_use]
    pub const fn suppress_reason(&self) -> Option<SuppressReason> {
        match self {
            Self::Suppressed { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Builds the frame annotation for this decision.
    #[must_use]
    pub fn annotate(&self, region: BoundingBox) -> Annotation {
        match self {
            Self::Accepted { record } => Annotation {
                region,
                label: record.student_name.clone(),
                tone: AnnotationTone::Positive,
            },
            Self::Suppressed { student, .. } => Annotation {
                region,
                label: student.clone(),
                tone: AnnotationTone::Neutral,
            },
            Self::Rejected { .. } => Annotation::unknown(region),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted { record } => write!(f, "accepted {}", record.student_name),
            Self::Suppressed { student, reason } => write!(f, "suppressed {student} ({reason})"),
            Self::Rejected { reason } => write!(f, "rejected ({reason})"),
        }
    }
}

/// How a region should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationTone {
    /// Newly marked present.
    Positive,
    /// Recognised but not written.
    Neutral,
    /// Not recognised.
    Negative,
}

/// Display annotation for one region of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    /// Region the label belongs to.
    pub region: BoundingBox,
    /// Label text.
    pub label: String,
    /// Tone.
    pub tone: AnnotationTone,
}

impl Annotation {
    /// Annotation for a region the matcher found nobody in.
    #[must_use]
    pub fn unknown(region: BoundingBox) -> Self {
        Self {
            region,
            label: "Unknown".to_string(),
            tone: AnnotationTone::Negative,
        }
    }
}

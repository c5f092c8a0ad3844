//! Business logic services.
//!
//! Services sit on top of a [`crate::storage::Ledger`] and implement the
//! recognition path (debounce, reconcile, drive) and the teacher-facing
//! paths (manual entry, reports).

mod debounce;
mod driver;
mod manual;
mod reconciler;
mod reports;

pub use debounce::{DEFAULT_CAPACITY, DEFAULT_COOLDOWN_SECS, DebounceTracker};
pub use driver::{
    AnnotationSink, CollectingSink, Frame, FrameSource, Matcher, NullSink, RecognitionLoop,
    RegionDetector, RunSummary, StopSignal,
};
pub use manual::ManualEntryService;
pub use reconciler::{
    DEFAULT_ACCEPTANCE_THRESHOLD, RecognitionSession, Reconciler, ReconcilerConfig,
};
pub use reports::ReportService;

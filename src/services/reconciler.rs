//! Recognition event reconciliation.
//!
//! Decides, for one identity candidate, whether it becomes a `Present`
//! record, is suppressed as a repeat, or is rejected outright.

use super::debounce::{DEFAULT_CAPACITY, DEFAULT_COOLDOWN_SECS, DebounceTracker};
use crate::models::{
    Decision, IdentityCandidate, RejectReason, SessionContext, SuppressReason,
};
use crate::storage::Ledger;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use tracing::instrument;

/// Default minimum confidence for a candidate to be considered.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f32 = 0.6;

/// Configuration for a [`Reconciler`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilerConfig {
    /// Minimum gap between two ledger checks for the same identity.
    pub cooldown: Duration,
    /// Number of identities each session's tracker remembers.
    pub capacity: usize,
    /// Candidates below this confidence are rejected as unknown.
    pub acceptance_threshold: f32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            capacity: DEFAULT_CAPACITY,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
        }
    }
}

impl ReconcilerConfig {
    /// Sets the cooldown.
    #[must_use]
    pub const fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Sets the tracker capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the acceptance threshold, usually from
    /// [`super::Matcher::acceptance_threshold`].
    #[must_use]
    pub const fn with_acceptance_threshold(mut self, threshold: f32) -> Self {
        self.acceptance_threshold = threshold;
        self
    }
}

/// One run of recognition against a fixed session context.
///
/// Owns the debounce state for the run. Obtained only from
/// [`Reconciler::begin_session`], so debounce entries can never leak from
/// one subject or day into another.
#[derive(Debug)]
pub struct RecognitionSession {
    context: SessionContext,
    tracker: DebounceTracker,
}

impl RecognitionSession {
    /// Returns the session context.
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Returns the session's debounce tracker.
    #[must_use]
    pub const fn tracker(&self) -> &DebounceTracker {
        &self.tracker
    }
}

/// Applies the debounce, ledger and uniqueness checks to candidates.
///
/// # Decision order
///
/// 1. Unknown or low-confidence candidates are rejected without touching
///    the tracker or the ledger
/// 2. Identities inside their cooldown are suppressed as debounced
/// 3. Identities with any ledger row for the session key are suppressed as
///    already marked
/// 4. Otherwise a `Present` row is inserted; losing an insert race is
///    reported as already marked
///
/// Ledger outages propagate as [`Error::LedgerUnavailable`] and leave the
/// tracker unchanged, so the same candidate is retried on its next sighting.
pub struct Reconciler<L: Ledger> {
    ledger: L,
    config: ReconcilerConfig,
}

impl<L: Ledger> Reconciler<L> {
    /// Creates a reconciler over a ledger.
    #[must_use]
    pub const fn new(ledger: L, config: ReconcilerConfig) -> Self {
        Self { ledger, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Returns the underlying ledger.
    #[must_use]
    pub const fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Starts a session with a fresh debounce tracker.
    #[must_use]
    pub fn begin_session(&self, context: SessionContext) -> RecognitionSession {
        tracing::info!(session = %context, "Recognition session started");
        RecognitionSession {
            context,
            tracker: DebounceTracker::new(self.config.cooldown, self.config.capacity),
        }
    }

    /// Reconciles one candidate observed at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LedgerUnavailable`] if the ledger cannot be read or
    /// written. Duplicate-key conflicts are not errors.
    #[instrument(
        skip(self, candidate, session),
        fields(
            operation = "reconcile",
            identity = %candidate.identity,
            confidence = candidate.confidence,
            subject = session.context.subject(),
        )
    )]
    pub fn reconcile(
        &self,
        candidate: &IdentityCandidate,
        session: &RecognitionSession,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        let decision = self.decide(candidate, session, now);
        match &decision {
            Ok(decision) => {
                metrics::counter!(
                    "reconcile_decisions_total",
                    "decision" => decision.kind(),
                    "reason" => decision.reason().unwrap_or("none")
                )
                .increment(1);
                if decision.is_accepted() {
                    tracing::info!(%decision, "Attendance recorded");
                } else {
                    tracing::debug!(%decision, "Candidate not recorded");
                }
            },
            Err(e) => {
                metrics::counter!(
                    "reconcile_decisions_total",
                    "decision" => "error",
                    "reason" => "ledger_unavailable"
                )
                .increment(1);
                tracing::error!(error = %e, "Reconciliation failed");
            },
        }
        decision
    }

    fn decide(
        &self,
        candidate: &IdentityCandidate,
        session: &RecognitionSession,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        let Some(name) = candidate.accepted_name(self.config.acceptance_threshold) else {
            return Ok(Decision::Rejected {
                reason: RejectReason::Unknown,
            });
        };

        let tracker = &session.tracker;
        if !tracker.should_process(name, now) {
            return Ok(Self::suppressed(name, SuppressReason::Debounced));
        }

        let context = &session.context;
        if self.ledger.exists(name, context.subject(), context.date())? {
            tracker.record_accepted(name, now);
            return Ok(Self::suppressed(name, SuppressReason::AlreadyMarkedToday));
        }

        match self
            .ledger
            .insert_present(name, context.subject(), context.date(), context.teacher())
        {
            Ok(record) => {
                tracker.record_accepted(name, now);
                Ok(Decision::Accepted { record })
            },
            Err(Error::DuplicateKey { .. }) => {
                tracker.record_accepted(name, now);
                Ok(Self::suppressed(name, SuppressReason::AlreadyMarkedToday))
            },
            Err(e) => Err(e),
        }
    }

    fn suppressed(name: &str, reason: SuppressReason) -> Decision {
        Decision::Suppressed {
            student: name.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttendanceStatus, BoundingBox};
    use crate::storage::InMemoryLedger;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Arc;

    fn context() -> SessionContext {
        SessionContext::new("Maths", "T1", NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()).unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn alice(confidence: f32) -> IdentityCandidate {
        IdentityCandidate::known("Alice", confidence, BoundingBox::new(0, 0, 10, 10))
    }

    fn reconciler() -> (Reconciler<Arc<InMemoryLedger>>, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        (
            Reconciler::new(Arc::clone(&ledger), ReconcilerConfig::default()),
            ledger,
        )
    }

    #[test]
    fn test_first_sighting_is_accepted() {
        let (reconciler, ledger) = reconciler();
        let session = reconciler.begin_session(context());

        let decision = reconciler.reconcile(&alice(0.9), &session, t(0)).unwrap();
        let Decision::Accepted { record } = decision else {
            panic!("expected accepted, got {decision:?}");
        };
        assert_eq!(record.student_name, "Alice");
        assert_eq!(record.teacher_name, "T1");
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.roll_number, None);
        assert_eq!(ledger.count().unwrap(), 1);
        assert_eq!(session.tracker().last_accepted("Alice"), Some(t(0)));
    }

    #[test]
    fn test_debounced_without_ledger_traffic() {
        let (reconciler, ledger) = reconciler();
        let session = reconciler.begin_session(context());
        reconciler.reconcile(&alice(0.9), &session, t(0)).unwrap();
        let calls = ledger.operation_count();

        let decision = reconciler.reconcile(&alice(0.88), &session, t(5)).unwrap();
        assert_eq!(decision.suppress_reason(), Some(SuppressReason::Debounced));
        assert_eq!(ledger.operation_count(), calls);
    }

    #[test]
    fn test_after_cooldown_ledger_suppresses() {
        let (reconciler, _ledger) = reconciler();
        let session = reconciler.begin_session(context());
        reconciler.reconcile(&alice(0.9), &session, t(0)).unwrap();

        let decision = reconciler.reconcile(&alice(0.91), &session, t(40)).unwrap();
        assert_eq!(
            decision.suppress_reason(),
            Some(SuppressReason::AlreadyMarkedToday)
        );
        assert_eq!(session.tracker().last_accepted("Alice"), Some(t(40)));
    }

    #[test]
    fn test_unknown_and_low_confidence_rejected() {
        let (reconciler, ledger) = reconciler();
        let session = reconciler.begin_session(context());

        let unknown = IdentityCandidate::unknown(0.3, BoundingBox::default());
        let low = alice(0.2);
        let nan = alice(f32::NAN);
        for candidate in [unknown, low, nan] {
            let decision = reconciler.reconcile(&candidate, &session, t(0)).unwrap();
            assert_eq!(
                decision,
                Decision::Rejected {
                    reason: RejectReason::Unknown
                }
            );
        }
        assert_eq!(ledger.operation_count(), 0);
        assert!(session.tracker().is_empty());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let ledger = InMemoryLedger::new();
        let reconciler = Reconciler::new(
            ledger,
            ReconcilerConfig::default().with_acceptance_threshold(0.9),
        );
        let session = reconciler.begin_session(context());
        assert!(
            reconciler
                .reconcile(&alice(0.9), &session, t(0))
                .unwrap()
                .is_accepted()
        );
    }

    #[test]
    fn test_ledger_outage_leaves_tracker_untouched() {
        let (reconciler, ledger) = reconciler();
        let session = reconciler.begin_session(context());
        ledger.set_unavailable(true);

        let result = reconciler.reconcile(&alice(0.9), &session, t(0));
        assert!(matches!(result, Err(Error::LedgerUnavailable { .. })));
        assert!(session.tracker().is_empty());

        ledger.set_unavailable(false);
        assert!(
            reconciler
                .reconcile(&alice(0.9), &session, t(1))
                .unwrap()
                .is_accepted()
        );
    }

    #[test]
    fn test_sessions_do_not_share_debounce_state() {
        let (reconciler, _ledger) = reconciler();
        let maths = reconciler.begin_session(context());
        reconciler.reconcile(&alice(0.9), &maths, t(0)).unwrap();

        let english = reconciler.begin_session(
            SessionContext::new("English", "T2", context().date()).unwrap(),
        );
        let decision = reconciler.reconcile(&alice(0.9), &english, t(1)).unwrap();
        assert!(decision.is_accepted());
    }

    /// Ledger that reports no row but loses every insert race.
    struct RacingLedger(InMemoryLedger);

    impl Ledger for RacingLedger {
        fn exists(&self, _: &str, _: &str, _: NaiveDate) -> Result<bool> {
            Ok(false)
        }

        fn insert_present(
            &self,
            student: &str,
            subject: &str,
            date: NaiveDate,
            _teacher: &str,
        ) -> Result<crate::models::AttendanceRecord> {
            Err(Error::DuplicateKey {
                student: student.to_string(),
                subject: subject.to_string(),
                date,
            })
        }

        fn insert_or_overwrite(&self, record: &crate::models::AttendanceRecord) -> Result<()> {
            self.0.insert_or_overwrite(record)
        }

        fn get(
            &self,
            key: &crate::models::AttendanceKey,
        ) -> Result<Option<crate::models::AttendanceRecord>> {
            self.0.get(key)
        }

        fn query(
            &self,
            filter: &crate::models::RecordFilter,
        ) -> Result<Vec<crate::models::AttendanceRecord>> {
            self.0.query(filter)
        }

        fn count(&self) -> Result<usize> {
            self.0.count()
        }
    }

    #[test]
    fn test_lost_insert_race_is_suppressed() {
        let reconciler = Reconciler::new(
            RacingLedger(InMemoryLedger::new()),
            ReconcilerConfig::default(),
        );
        let session = reconciler.begin_session(context());

        let decision = reconciler.reconcile(&alice(0.9), &session, t(0)).unwrap();
        assert_eq!(
            decision.suppress_reason(),
            Some(SuppressReason::AlreadyMarkedToday)
        );
        assert_eq!(session.tracker().last_accepted("Alice"), Some(t(0)));
    }
}

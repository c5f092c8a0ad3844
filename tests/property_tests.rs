//! Property-based tests for reconciliation invariants.
//!
//! Uses proptest to verify invariants across random candidate sequences:
//! - At most one record per (student, subject, date)
//! - Unknown and sub-threshold candidates never reach the ledger
//! - Accepts for one identity are always more than a cooldown apart
//! - Replaying a sequence with a fresh tracker changes nothing

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rollcall::storage::{InMemoryLedger, Ledger};
use rollcall::{
    BoundingBox, DebounceTracker, IdentityCandidate, Reconciler, ReconcilerConfig, SessionContext,
};
use std::collections::HashSet;
use std::sync::Arc;

const NAMES: &[&str] = &["Alice", "Bob", "Cara", "Dev"];

fn session() -> SessionContext {
    SessionContext::new("Maths", "T1", NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()).unwrap()
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap() + Duration::seconds(secs)
}

/// (name index or None for unknown, confidence, seconds since previous)
fn candidate_stream() -> impl Strategy<Value = Vec<(Option<usize>, f32, i64)>> {
    prop::collection::vec(
        (
            prop::option::weighted(0.8, 0..NAMES.len()),
            0.0f32..=1.0,
            0i64..45,
        ),
        0..60,
    )
}

fn to_candidates(stream: &[(Option<usize>, f32, i64)]) -> Vec<(IdentityCandidate, DateTime<Utc>)> {
    let region = BoundingBox::new(0, 0, 32, 32);
    let mut clock = 0;
    stream
        .iter()
        .map(|(name, confidence, gap)| {
            clock += gap;
            let candidate = name.map_or_else(
                || IdentityCandidate::unknown(*confidence, region),
                |i| IdentityCandidate::known(NAMES[i], *confidence, region),
            );
            (candidate, at(clock))
        })
        .collect()
}

proptest! {
    /// Property: the ledger never holds two rows for one key, and every row
    /// belongs to a candidate that cleared the threshold.
    #[test]
    fn prop_at_most_one_row_per_key(stream in candidate_stream()) {
        let reconciler = Reconciler::new(InMemoryLedger::new(), ReconcilerConfig::default());
        let run = reconciler.begin_session(session());
        let threshold = reconciler.config().acceptance_threshold;

        let candidates = to_candidates(&stream);
        let mut eligible = HashSet::new();
        let mut accepted = 0;
        for (candidate, now) in &candidates {
            if let Some(name) = candidate.accepted_name(threshold) {
                eligible.insert(name.to_string());
            }
            if reconciler.reconcile(candidate, &run, *now).unwrap().is_accepted() {
                accepted += 1;
            }
        }

        let rows = reconciler.ledger().snapshot();
        let keys: HashSet<_> = rows.iter().map(|r| r.key()).collect();
        prop_assert_eq!(keys.len(), rows.len());
        prop_assert_eq!(rows.len(), accepted);
        prop_assert_eq!(rows.len(), eligible.len());
    }

    /// Property: unknown or low-confidence candidates cause zero ledger calls.
    #[test]
    fn prop_rejected_never_touch_ledger(
        stream in prop::collection::vec((any::<bool>(), 0.0f32..0.6, 0i64..100), 1..40)
    ) {
        let ledger = Arc::new(InMemoryLedger::new());
        let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcilerConfig::default());
        let run = reconciler.begin_session(session());
        let region = BoundingBox::new(0, 0, 8, 8);

        for (known, confidence, secs) in stream {
            let candidate = if known {
                IdentityCandidate::known("Alice", confidence, region)
            } else {
                IdentityCandidate::unknown(confidence.max(0.9), region)
            };
            let decision = reconciler.reconcile(&candidate, &run, at(secs)).unwrap();
            prop_assert_eq!(decision.kind(), "rejected");
        }
        prop_assert_eq!(ledger.operation_count(), 0);
    }

    /// Property: a second pass with a fresh tracker leaves the ledger as is.
    #[test]
    fn prop_replay_idempotent(stream in candidate_stream()) {
        let ledger = Arc::new(InMemoryLedger::new());
        let candidates = to_candidates(&stream);
        let pass = || {
            let reconciler = Reconciler::new(Arc::clone(&ledger), ReconcilerConfig::default());
            let run = reconciler.begin_session(session());
            candidates
                .iter()
                .filter(|(c, now)| reconciler.reconcile(c, &run, *now).unwrap().is_accepted())
                .count()
        };

        pass();
        let before = ledger.snapshot();
        prop_assert_eq!(pass(), 0);
        prop_assert_eq!(ledger.snapshot(), before);
    }

    /// Property: the tracker admits an identity only after the cooldown.
    #[test]
    fn prop_tracker_spacing(gaps in prop::collection::vec(0i64..90, 1..50), cooldown in 1i64..60) {
        let tracker = DebounceTracker::new(Duration::seconds(cooldown), 16);
        let mut clock = 0;
        let mut last: Option<i64> = None;

        for gap in gaps {
            clock += gap;
            let admitted = tracker.try_accept("Alice", at(clock));
            let expected = last.is_none_or(|prev| clock - prev > cooldown);
            prop_assert_eq!(admitted, expected);
            if admitted {
                last = Some(clock);
            }
        }
    }
}

#[test]
fn test_count_matches_snapshot() {
    let ledger = InMemoryLedger::new();
    ledger
        .insert_present("Alice", "Maths", session().date(), "T1")
        .unwrap();
    assert_eq!(ledger.count().unwrap(), ledger.snapshot().len());
}

//! Per-run cooldown tracking for accepted identities.
//!
//! Suppresses repeat observations of someone who was just accepted without
//! a ledger round trip. The ledger remains the source of truth: an evicted
//! or missing entry only costs one extra `exists` lookup.

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::instrument;

/// Default cooldown between two acceptances of the same identity.
pub const DEFAULT_COOLDOWN_SECS: i64 = 30;

/// Default number of identities remembered per run.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Bounded map from identity to the time it was last accepted.
///
/// # How it works
///
/// 1. An identity with no entry is always processed
/// 2. An identity with an entry is processed only once strictly more than
///    `cooldown` has passed since `last_accepted_at`
/// 3. Entries are refreshed on every acceptance, including the
///    "already marked today" outcome, and evicted least-recently-accepted
///    first when the map is full
///
/// # Thread Safety
///
/// All state sits behind one `Mutex`; [`Self::try_accept`] performs the
/// check and update under a single lock acquisition. A poisoned lock is
/// recovered, since losing an entry can only cause an extra ledger check.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use rollcall::DebounceTracker;
///
/// let tracker = DebounceTracker::new(Duration::seconds(30), 16);
/// let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
///
/// assert!(tracker.should_process("Alice", t0));
/// tracker.record_accepted("Alice", t0);
/// assert!(!tracker.should_process("Alice", t0 + Duration::seconds(30)));
/// assert!(tracker.should_process("Alice", t0 + Duration::seconds(31)));
/// ```
#[derive(Debug)]
pub struct DebounceTracker {
    entries: Mutex<LruCache<String, DateTime<Utc>>>,
    cooldown: Duration,
}

impl DebounceTracker {
    /// Creates a tracker. A capacity of 0 is treated as 1.
    #[must_use]
    pub fn new(cooldown: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            cooldown,
        }
    }

    /// Creates a tracker with a 30 second cooldown and 1024 entries.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Duration::seconds(DEFAULT_COOLDOWN_SECS), DEFAULT_CAPACITY)
    }

    /// Returns the configured cooldown.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns whether `identity` should be looked up in the ledger at `now`.
    #[must_use]
    pub fn should_process(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let entries = self.lock();
        entries
            .peek(identity)
            .is_none_or(|last| self.cooled_down(*last, now))
    }

    /// Records an acceptance of `identity` at `now`.
    #[instrument(skip(self), fields(operation = "debounce_record"))]
    pub fn record_accepted(&self, identity: &str, now: DateTime<Utc>) {
        let mut entries = self.lock();
        entries.put(identity.to_string(), now);
        Self::report_size(&entries);
    }

    /// Atomically checks the cooldown and records an acceptance.
    ///
    /// Returns false, leaving the entry untouched, if `identity` is still
    /// cooling down.
    pub fn try_accept(&self, identity: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.lock();
        if entries
            .peek(identity)
            .is_some_and(|last| !self.cooled_down(*last, now))
        {
            return false;
        }
        entries.put(identity.to_string(), now);
        Self::report_size(&entries);
        true
    }

    /// Returns when `identity` was last accepted, if still remembered.
    #[must_use]
    pub fn last_accepted(&self, identity: &str) -> Option<DateTime<Utc>> {
        self.lock().peek(identity).copied()
    }

    /// Returns the number of remembered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no identity has been accepted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cooled_down(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last) > self.cooldown
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Debounce tracker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn report_size(entries: &LruCache<String, DateTime<Utc>>) {
        metrics::gauge!("debounce_tracker_size").set(entries.len() as f64);
    }
}

impl Default for DebounceTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_unseen_identity_is_processed() {
        let tracker = DebounceTracker::with_defaults();
        assert!(tracker.should_process("Alice", t(0)));
        assert!(tracker.is_empty());
    }

    #[test_case(0, false ; "same instant")]
    #[test_case(5, false ; "inside cooldown")]
    #[test_case(30, false ; "exactly at cooldown")]
    #[test_case(31, true ; "after cooldown")]
    #[test_case(-10, false ; "clock went backwards")]
    fn test_cooldown_boundary(offset: i64, expected: bool) {
        let tracker = DebounceTracker::with_defaults();
        tracker.record_accepted("Alice", t(0));
        assert_eq!(tracker.should_process("Alice", t(offset)), expected);
    }

    #[test]
    fn test_sub_second_boundary_is_strict() {
        let tracker = DebounceTracker::new(Duration::seconds(30), 4);
        tracker.record_accepted("Alice", t(0));
        let just_after = t(30) + Duration::milliseconds(1);
        assert!(!tracker.should_process("Alice", t(30)));
        assert!(tracker.should_process("Alice", just_after));
    }

    #[test]
    fn test_identities_are_independent() {
        let tracker = DebounceTracker::with_defaults();
        tracker.record_accepted("Alice", t(0));
        assert!(tracker.should_process("Bob", t(1)));
    }

    #[test]
    fn test_record_refreshes_entry() {
        let tracker = DebounceTracker::with_defaults();
        tracker.record_accepted("Alice", t(0));
        tracker.record_accepted("Alice", t(31));
        assert!(!tracker.should_process("Alice", t(50)));
        assert_eq!(tracker.last_accepted("Alice"), Some(t(31)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_try_accept_is_check_and_set() {
        let tracker = DebounceTracker::with_defaults();
        assert!(tracker.try_accept("Alice", t(0)));
        assert!(!tracker.try_accept("Alice", t(10)));
        assert_eq!(tracker.last_accepted("Alice"), Some(t(0)));
        assert!(tracker.try_accept("Alice", t(31)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let tracker = DebounceTracker::new(Duration::seconds(30), 2);
        tracker.record_accepted("Alice", t(0));
        tracker.record_accepted("Bob", t(1));
        tracker.record_accepted("Cara", t(2));

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.last_accepted("Alice"), None);
        assert!(tracker.should_process("Alice", t(3)));
        assert!(!tracker.should_process("Cara", t(3)));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let tracker = DebounceTracker::new(Duration::seconds(30), 0);
        tracker.record_accepted("Alice", t(0));
        assert_eq!(tracker.len(), 1);
    }
}

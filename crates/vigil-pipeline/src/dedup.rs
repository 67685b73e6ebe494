//! Duplicate suppression between the real-time and reconciliation streams.

use chrono::{DateTime, Duration as TimeDelta, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use vigil_types::{ChangeEvent, ChangeKind, EventOrigin};

/// Tracks recently accepted `(path, kind)` pairs.
///
/// A reconciliation event is a duplicate if the same pair was accepted with
/// a timestamp inside the tolerance window — the scan's synthetic `Modified`
/// for a file already reported in real time. Real-time events are never
/// suppressed; they carry the richer attribution and always refresh the
/// index.
pub struct DedupIndex {
    window: TimeDelta,
    seen: HashMap<(PathBuf, ChangeKind), DateTime<Utc>>,
}

impl DedupIndex {
    pub fn new(window: std::time::Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or_else(|_| TimeDelta::seconds(10)),
            seen: HashMap::new(),
        }
    }

    /// Decide whether `event` is new. Accepted events are recorded.
    pub fn accept(&mut self, event: &ChangeEvent) -> bool {
        let (path, kind) = event.dedup_key();
        let key = (path.to_path_buf(), kind);

        if event.origin == EventOrigin::Reconciliation {
            if let Some(&prior) = self.seen.get(&key) {
                if (event.observed_at - prior).abs() <= self.window {
                    return false;
                }
            }
        }

        self.seen.insert(key, event.observed_at);
        true
    }

    /// Drop entries too old to matter for future dedup decisions.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let horizon = now - self.window * 2;
        self.seen.retain(|_, &mut at| at > horizon);
    }

    /// Entries currently tracked.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn index() -> DedupIndex {
        DedupIndex::new(Duration::from_secs(10))
    }

    #[test]
    fn reconciliation_duplicate_inside_window_is_dropped() {
        let mut index = index();
        let real = ChangeEvent::real_time("/watched/a.txt", ChangeKind::Modified);
        assert!(index.accept(&real));

        let scan = ChangeEvent::reconciled("/watched/a.txt", real.observed_at);
        assert!(!index.accept(&scan));
    }

    #[test]
    fn reconciliation_outside_window_is_a_new_change() {
        let mut index = index();
        let real = ChangeEvent::real_time("/watched/a.txt", ChangeKind::Modified);
        assert!(index.accept(&real));

        let later = real.observed_at + TimeDelta::seconds(30);
        let scan = ChangeEvent::reconciled("/watched/a.txt", later);
        assert!(index.accept(&scan));
    }

    #[test]
    fn real_time_events_are_never_suppressed() {
        let mut index = index();
        let first = ChangeEvent::real_time("/watched/a.txt", ChangeKind::Modified);
        let second = ChangeEvent::real_time("/watched/a.txt", ChangeKind::Modified);
        assert!(index.accept(&first));
        assert!(index.accept(&second));
    }

    #[test]
    fn different_kind_is_a_different_change() {
        let mut index = index();
        assert!(index.accept(&ChangeEvent::real_time("/watched/a.txt", ChangeKind::Created)));
        let scan = ChangeEvent::reconciled("/watched/a.txt", Utc::now());
        // Created was seen; a Modified reconciliation is still new.
        assert!(index.accept(&scan));
    }

    #[test]
    fn prune_forgets_stale_entries() {
        let mut index = index();
        let old = ChangeEvent::new(
            "/watched/old.txt",
            ChangeKind::Modified,
            Utc::now() - TimeDelta::minutes(5),
            vigil_types::EventOrigin::RealTime,
        );
        assert!(index.accept(&old));
        assert_eq!(index.len(), 1);

        index.prune(Utc::now());
        assert!(index.is_empty());
    }
}

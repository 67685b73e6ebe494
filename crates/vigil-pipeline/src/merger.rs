//! The single-consumer merger task.

use crate::DedupIndex;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, warn};
use vigil_attribution::{ActorResolver, NetworkIdentity};
use vigil_sinks::Replicator;
use vigil_types::{ChangeEvent, EventOrigin};

/// Configuration for the merger.
#[derive(Debug, Clone)]
pub struct MergerConfig {
    /// Tolerance window for duplicate detection. Defaults to the scan
    /// interval.
    pub dedup_window: Duration,
    /// Upper bound on one attribution lookup.
    pub attribution_budget: Duration,
    /// Paths never recorded even when they change — the audit log and sink
    /// files themselves, which would otherwise feed back into the pipeline
    /// when they live under the monitored root.
    pub ignore_paths: Vec<std::path::PathBuf>,
}

impl Default for MergerConfig {
    fn default() -> Self {
        Self {
            dedup_window: Duration::from_secs(10),
            attribution_budget: Duration::from_millis(500),
            ignore_paths: Vec::new(),
        }
    }
}

/// Drain both producer streams until they close, enforcing dedup, enriching
/// accepted events, replicating them, and advancing the cursor.
///
/// The cursor only moves after replication has been attempted for the event
/// that carries its new value, so a restart can at worst re-record an event
/// (at-least-once), never silently skip one.
pub async fn run_merger(
    config: MergerConfig,
    mut realtime: mpsc::Receiver<ChangeEvent>,
    mut reconciled: mpsc::Receiver<ChangeEvent>,
    cursor: watch::Sender<DateTime<Utc>>,
    resolver: Arc<dyn ActorResolver>,
    network: NetworkIdentity,
    replicator: Replicator,
) {
    let mut index = DedupIndex::new(config.dedup_window);

    loop {
        let event = tokio::select! {
            Some(event) = realtime.recv() => event,
            Some(event) = reconciled.recv() => event,
            else => break,
        };
        process(&config, &mut index, &cursor, &resolver, &network, &replicator, event).await;
    }

    debug!("merger drained, exiting");
}

async fn process(
    config: &MergerConfig,
    index: &mut DedupIndex,
    cursor: &watch::Sender<DateTime<Utc>>,
    resolver: &Arc<dyn ActorResolver>,
    network: &NetworkIdentity,
    replicator: &Replicator,
    event: ChangeEvent,
) {
    if config.ignore_paths.iter().any(|p| p == &event.path) {
        // The cursor is deliberately left alone: an ignored path's mtime
        // says nothing about other files still in flight.
        return;
    }

    if !index.accept(&event) {
        // Already recorded from the real-time stream; the scan's view still
        // advances the cursor.
        debug!(path = %event.path.display(), "duplicate reconciliation event dropped");
        advance(cursor, event.observed_at);
        return;
    }

    let actor = match timeout(config.attribution_budget, resolver.resolve(&event.path)).await {
        Ok(actor) => actor,
        Err(_) => {
            debug!(path = %event.path.display(), "attribution lookup exceeded budget");
            None
        }
    };
    let event = event.enriched(actor, network.resolve());

    let results = replicator.replicate(&event).await;
    let failures = results.iter().filter(|r| !r.success).count();
    if failures > 0 {
        warn!(
            path = %event.path.display(),
            failures,
            total = results.len(),
            "event replicated with sink failures"
        );
    }
    if event.origin == EventOrigin::Reconciliation {
        debug!(path = %event.path.display(), "recovered change missed by the watcher");
    }

    advance(cursor, event.observed_at);
    index.prune(Utc::now());
}

fn advance(cursor: &watch::Sender<DateTime<Utc>>, observed_at: DateTime<Utc>) {
    cursor.send_modify(|last| {
        if observed_at > *last {
            *last = observed_at;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;
    use vigil_attribution::FixedActorResolver;
    use vigil_sinks::{AuditLogSink, MemorySink};
    use vigil_types::{ActorInfo, ChangeKind, NetworkInfo};

    struct Harness {
        realtime: mpsc::Sender<ChangeEvent>,
        reconciled: mpsc::Sender<ChangeEvent>,
        cursor: watch::Receiver<DateTime<Utc>>,
        memory: MemorySink,
        handle: tokio::task::JoinHandle<()>,
        _temp: TempDir,
    }

    async fn harness(resolver: Arc<dyn ActorResolver>, config: MergerConfig) -> Harness {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(AuditLogSink::open(temp.path().join("audit.log")).await.unwrap());
        let memory = MemorySink::new();
        let replicator = Replicator::new(log, vec![Arc::new(memory.clone())]);

        let (realtime_tx, realtime_rx) = mpsc::channel(16);
        let (reconciled_tx, reconciled_rx) = mpsc::channel(16);
        let (cursor_tx, cursor_rx) = watch::channel(Utc::now() - chrono::Duration::hours(1));

        let network = NetworkIdentity::with_cached(NetworkInfo::new("10.0.0.1", "AA:BB:CC:DD:EE:FF"));
        let handle = tokio::spawn(run_merger(
            config,
            realtime_rx,
            reconciled_rx,
            cursor_tx,
            resolver,
            network,
            replicator,
        ));

        Harness {
            realtime: realtime_tx,
            reconciled: reconciled_tx,
            cursor: cursor_rx,
            memory,
            handle,
            _temp: temp,
        }
    }

    async fn drain(h: Harness) -> (Vec<ChangeEvent>, DateTime<Utc>) {
        drop(h.realtime);
        drop(h.reconciled);
        tokio::time::timeout(Duration::from_secs(5), h.handle)
            .await
            .expect("merger did not drain")
            .unwrap();
        let cursor = *h.cursor.borrow();
        (h.memory.recorded(), cursor)
    }

    #[tokio::test]
    async fn duplicate_reconciliation_is_dropped_but_advances_the_cursor() {
        let resolver = Arc::new(FixedActorResolver::new(ActorInfo::new("editor", 9)));
        let h = harness(resolver, MergerConfig::default()).await;

        let real = ChangeEvent::real_time("/watched/a.txt", ChangeKind::Modified);
        let observed = real.observed_at;
        h.realtime.send(real).await.unwrap();
        h.reconciled
            .send(ChangeEvent::reconciled("/watched/a.txt", observed))
            .await
            .unwrap();

        let (recorded, cursor) = drain(h).await;
        assert_eq!(recorded.len(), 1, "exactly one record reaches the sinks");
        assert_eq!(recorded[0].origin, EventOrigin::RealTime);
        assert_eq!(cursor, observed);
    }

    #[tokio::test]
    async fn missed_change_flows_through_from_reconciliation_alone() {
        let resolver = Arc::new(FixedActorResolver::unresolved());
        let h = harness(resolver, MergerConfig::default()).await;

        let mtime = Utc::now();
        h.reconciled
            .send(ChangeEvent::reconciled("/watched/b.txt", mtime))
            .await
            .unwrap();

        let (recorded, cursor) = drain(h).await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].origin, EventOrigin::Reconciliation);
        assert_eq!(cursor, mtime);
    }

    #[tokio::test]
    async fn cursor_never_decreases() {
        let resolver = Arc::new(FixedActorResolver::unresolved());
        let h = harness(resolver, MergerConfig::default()).await;

        let newer = Utc::now();
        let older = newer - chrono::Duration::seconds(30);
        h.reconciled
            .send(ChangeEvent::reconciled("/watched/new.txt", newer))
            .await
            .unwrap();
        h.reconciled
            .send(ChangeEvent::reconciled("/watched/old.txt", older))
            .await
            .unwrap();

        let (recorded, cursor) = drain(h).await;
        assert_eq!(recorded.len(), 2);
        assert_eq!(cursor, newer, "older event must not move the cursor back");
    }

    #[tokio::test]
    async fn events_are_enriched_before_replication() {
        let resolver =
            Arc::new(FixedActorResolver::new(ActorInfo::new("editor", 7).with_user("alice")));
        let h = harness(resolver, MergerConfig::default()).await;

        h.realtime
            .send(ChangeEvent::real_time("/watched/a.txt", ChangeKind::Created))
            .await
            .unwrap();

        let (recorded, _) = drain(h).await;
        let actor = recorded[0].actor.as_ref().expect("actor attached");
        assert_eq!(actor.process_name, "editor");
        assert_eq!(
            recorded[0].network.as_ref().unwrap().ip_address.as_deref(),
            Some("10.0.0.1")
        );
    }

    struct StallingResolver;

    #[async_trait]
    impl ActorResolver for StallingResolver {
        async fn resolve(&self, _path: &Path) -> Option<ActorInfo> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            None
        }
    }

    #[tokio::test]
    async fn own_output_files_are_never_recorded() {
        let config = MergerConfig {
            ignore_paths: vec!["/watched/audit.log".into()],
            ..Default::default()
        };
        let h = harness(Arc::new(FixedActorResolver::unresolved()), config).await;

        h.realtime
            .send(ChangeEvent::real_time("/watched/audit.log", ChangeKind::Modified))
            .await
            .unwrap();
        h.realtime
            .send(ChangeEvent::real_time("/watched/a.txt", ChangeKind::Modified))
            .await
            .unwrap();

        let (recorded, _) = drain(h).await;
        assert_eq!(recorded.len(), 1);
        assert!(recorded[0].path.ends_with("a.txt"));
    }

    #[tokio::test]
    async fn slow_attribution_is_cut_off_and_the_event_still_lands() {
        let config = MergerConfig {
            attribution_budget: Duration::from_millis(50),
            ..Default::default()
        };
        let h = harness(Arc::new(StallingResolver), config).await;

        h.realtime
            .send(ChangeEvent::real_time("/watched/slow.txt", ChangeKind::Modified))
            .await
            .unwrap();

        let (recorded, _) = drain(h).await;
        assert_eq!(recorded.len(), 1, "event recorded despite stalled lookup");
        assert!(recorded[0].actor.is_none());
    }
}

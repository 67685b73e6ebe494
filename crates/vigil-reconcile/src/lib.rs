//! Periodic reconciliation scanning for Vigil.
//!
//! The real-time watcher is lossy by contract. On a fixed interval the
//! scanner walks the whole subtree and synthesizes `Modified` events for
//! every file whose last-write time is newer than the pipeline cursor,
//! recovering anything the watcher dropped or missed while stopped.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use vigil_sinks::AuditLogSink;
use vigil_types::ChangeEvent;
use walkdir::WalkDir;

/// Configuration for the reconciliation scanner.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Time between full passes.
    pub interval: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// One full pass over `root`, emitting a reconciliation event for every file
/// modified strictly after `cursor`.
///
/// Blocking; callers run it on the blocking pool. Entries that vanish or
/// refuse a stat between enumeration and inspection are skipped, never
/// failing the pass.
pub fn scan_once(root: &Path, cursor: DateTime<Utc>) -> Vec<ChangeEvent> {
    let mut found = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => DateTime::<Utc>::from(modified),
            Ok(Err(e)) => {
                debug!(path = %entry.path().display(), "skipping unstatable file: {e}");
                continue;
            }
            Err(e) => {
                debug!(path = %entry.path().display(), "skipping unstatable file: {e}");
                continue;
            }
        };

        if modified > cursor {
            found.push(ChangeEvent::reconciled(entry.path().to_path_buf(), modified));
        }
    }

    found
}

/// Drive reconciliation passes until shutdown.
///
/// Reads the cursor snapshot once per pass, walks off the async runtime, and
/// feeds candidates to the merger. A failed pass is logged, noted in the
/// audit log, and the next tick retries; the loop only exits on shutdown or
/// a closed pipeline.
pub async fn run_scanner(
    root: PathBuf,
    config: ScanConfig,
    cursor: watch::Receiver<DateTime<Utc>>,
    events: mpsc::Sender<ChangeEvent>,
    log: Arc<AuditLogSink>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticks = tokio::time::interval(config.interval);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let snapshot = *cursor.borrow();
                let scan_root = root.clone();
                let pass =
                    tokio::task::spawn_blocking(move || scan_once(&scan_root, snapshot)).await;

                let found = match pass {
                    Ok(found) => found,
                    Err(e) => {
                        warn!("reconciliation pass failed: {e}");
                        let _ = log.note("scan-error", &format!("pass failed: {e}")).await;
                        continue;
                    }
                };

                debug!(candidates = found.len(), cursor = %snapshot, "reconciliation pass complete");
                for event in found {
                    if events.send(event).await.is_err() {
                        return;
                    }
                }
            }
            changed = shutdown.changed() => {
                // A dropped sender means the supervisor is gone; stop too.
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as TimeDelta;
    use tempfile::TempDir;
    use vigil_types::{ChangeKind, EventOrigin};

    #[test]
    fn scan_finds_files_newer_than_cursor() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        std::fs::write(temp.path().join("sub/b.txt"), b"data").unwrap();

        let cursor = Utc::now() - TimeDelta::seconds(60);
        let found = scan_once(temp.path(), cursor);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ChangeKind::Modified);
        assert_eq!(found[0].origin, EventOrigin::Reconciliation);
        assert!(found[0].path.ends_with("sub/b.txt"));
    }

    #[test]
    fn scan_ignores_files_behind_the_cursor() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("old.txt"), b"data").unwrap();

        let cursor = Utc::now() + TimeDelta::seconds(60);
        assert!(scan_once(temp.path(), cursor).is_empty());
    }

    #[test]
    fn scan_of_missing_root_is_empty_not_fatal() {
        let found = scan_once(Path::new("/nonexistent/vigil-scan-root"), Utc::now());
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn scanner_loop_emits_within_one_interval_and_stops() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("missed.txt"), b"data").unwrap();

        let log_dir = TempDir::new().unwrap();
        let log = Arc::new(
            AuditLogSink::open(log_dir.path().join("audit.log"))
                .await
                .unwrap(),
        );

        let (_cursor_tx, cursor_rx) = watch::channel(Utc::now() - TimeDelta::seconds(60));
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_scanner(
            temp.path().to_path_buf(),
            ScanConfig {
                interval: Duration::from_millis(50),
            },
            cursor_rx,
            events_tx,
            log,
            shutdown_rx,
        ));

        let event = tokio::time::timeout(Duration::from_secs(2), events_rx.recv())
            .await
            .expect("no reconciliation event within interval")
            .expect("scanner channel closed early");
        assert!(event.path.ends_with("missed.txt"));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("scanner did not stop on shutdown")
            .unwrap();
    }
}

//! Real-time filesystem change capture for Vigil.
//!
//! Wraps the platform watcher behind a bounded channel of [`ChangeEvent`]s.
//! Delivery is best-effort by contract: under burst the buffer may fill and
//! events are dropped with a warning; the reconciliation scanner is the
//! recovery path for anything lost here.

use notify::{Event, EventKind, RecursiveMode, Watcher};
use notify::event::ModifyKind;
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use vigil_types::{ChangeEvent, ChangeKind};

/// Configuration for the watch adapter.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Channel capacity before events are dropped.
    pub buffer_size: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { buffer_size: 1024 }
    }
}

/// Errors from the watch adapter.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The platform watcher refused the subscription.
    #[error("failed to subscribe to filesystem notifications: {0}")]
    Subscribe(#[from] notify::Error),
}

/// Live subscription to changes under one subtree.
///
/// Dropping the handle cancels the subscription; no events are delivered
/// afterwards.
pub struct ChangeWatcher {
    _watcher: notify::RecommendedWatcher,
}

impl ChangeWatcher {
    /// Subscribe to `root` recursively. Returns the handle keeping the
    /// subscription alive and the receiving end of the event channel.
    pub fn subscribe(
        root: &Path,
        config: WatchConfig,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>), CaptureError> {
        let (tx, rx) = mpsc::channel(config.buffer_size);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| match res {
            Ok(event) => {
                let Some(kind) = classify(&event.kind) else {
                    return;
                };
                for path in &event.paths {
                    let change = ChangeEvent::real_time(path.clone(), kind);
                    match tx.try_send(change) {
                        Ok(()) => debug!(path = %path.display(), ?kind, "change captured"),
                        Err(mpsc::error::TrySendError::Full(_)) => {
                            warn!(
                                path = %path.display(),
                                "watch buffer full, dropping event; reconciliation will recover it"
                            );
                        }
                        Err(mpsc::error::TrySendError::Closed(_)) => {}
                    }
                }
            }
            Err(e) => warn!("watch backend error: {e}"),
        })?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok((Self { _watcher: watcher }, rx))
    }
}

fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, RemoveKind, RenameMode};
    use tempfile::TempDir;
    use tokio::time::{timeout, Duration};

    #[test]
    fn classification_covers_the_audited_kinds() {
        assert_eq!(
            classify(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Created)
        );
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(ChangeKind::Renamed)
        );
        assert_eq!(
            classify(&EventKind::Remove(RemoveKind::File)),
            Some(ChangeKind::Deleted)
        );
        assert_eq!(
            classify(&EventKind::Access(notify::event::AccessKind::Read)),
            None
        );
    }

    #[tokio::test]
    async fn subscription_delivers_a_create() {
        let temp = TempDir::new().unwrap();
        let (_watcher, mut rx) =
            ChangeWatcher::subscribe(temp.path(), WatchConfig::default()).unwrap();

        let file = temp.path().join("a.txt");
        tokio::fs::write(&file, b"hello").await.unwrap();

        let event = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("watcher produced no event in time")
            .expect("channel closed");
        assert!(event.path.to_string_lossy().contains("a.txt"));
        assert_eq!(event.origin, vigil_types::EventOrigin::RealTime);
    }

    #[tokio::test]
    async fn dropping_the_handle_closes_the_channel() {
        let temp = TempDir::new().unwrap();
        let (watcher, mut rx) =
            ChangeWatcher::subscribe(temp.path(), WatchConfig::default()).unwrap();
        drop(watcher);

        // Sender lives inside the watcher callback; once it is gone the
        // channel drains to None.
        while let Ok(Some(_)) = timeout(Duration::from_millis(200), rx.recv()).await {}
    }
}

//! Service supervisor.

use crate::{MonitorConfig, SinkDescriptor};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use vigil_attribution::{ActorResolver, NetworkIdentity, SysinfoActorResolver};
use vigil_capture::{CaptureError, ChangeWatcher, WatchConfig};
use vigil_pipeline::{run_merger, MergerConfig};
use vigil_reconcile::{run_scanner, ScanConfig};
use vigil_sinks::{AuditLogSink, ChangeSink, Replicator, SinkError, SqliteSink};

/// Supervisor errors. Everything here refuses startup; faults after
/// `Running` degrade inside the pipeline instead.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("monitored root does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("failed to open audit log: {0}")]
    AuditLog(#[source] SinkError),
    #[error(transparent)]
    Subscribe(#[from] CaptureError),
}

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct RunningPipeline {
    // Held for its Drop: releasing it cancels the subscription.
    watcher: ChangeWatcher,
    shutdown: watch::Sender<bool>,
    scanner: JoinHandle<()>,
    merger: JoinHandle<()>,
    cursor: watch::Receiver<DateTime<Utc>>,
}

/// The monitoring service.
///
/// `start`/`stop` are idempotent: calling either in a state it has already
/// reached is a no-op, not an error.
pub struct MonitorService {
    config: MonitorConfig,
    resolver: Arc<dyn ActorResolver>,
    network: NetworkIdentity,
    state: Mutex<ServiceState>,
    pipeline: Mutex<Option<RunningPipeline>>,
}

impl MonitorService {
    /// Service with the production attribution resolver.
    pub fn new(config: MonitorConfig) -> Self {
        let resolver = Arc::new(SysinfoActorResolver::new(&config.root));
        Self::with_resolver(config, resolver)
    }

    /// Service with an injected resolver. Test seam.
    pub fn with_resolver(config: MonitorConfig, resolver: Arc<dyn ActorResolver>) -> Self {
        Self {
            config,
            resolver,
            network: NetworkIdentity::new(),
            state: Mutex::new(ServiceState::Stopped),
            pipeline: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ServiceState {
        *self.state.lock()
    }

    /// Wire the pipeline and begin observing. Both producers are active
    /// before the state reads `Running`.
    pub async fn start(&self) -> Result<(), ServiceError> {
        {
            let mut state = self.state.lock();
            match *state {
                ServiceState::Stopped => *state = ServiceState::Starting,
                // Already on the way up or up.
                _ => return Ok(()),
            }
        }

        match self.wire_pipeline().await {
            Ok(pipeline) => {
                *self.pipeline.lock() = Some(pipeline);
                *self.state.lock() = ServiceState::Running;
                info!(root = %self.config.root.display(), "monitoring started");
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = ServiceState::Stopped;
                Err(e)
            }
        }
    }

    async fn wire_pipeline(&self) -> Result<RunningPipeline, ServiceError> {
        if !self.config.root.exists() {
            return Err(ServiceError::MissingRoot(self.config.root.clone()));
        }

        let log = Arc::new(
            AuditLogSink::open(&self.config.log_file)
                .await
                .map_err(ServiceError::AuditLog)?,
        );
        let sinks = self.open_sinks(&log).await;
        let replicator = Replicator::new(Arc::clone(&log), sinks);

        let initial = self.config.initial_cursor.unwrap_or_else(Utc::now);
        let (cursor_tx, cursor_rx) = watch::channel(initial);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (scan_tx, scan_rx) = tokio::sync::mpsc::channel(self.config.buffer_size);

        let (watcher, realtime_rx) = ChangeWatcher::subscribe(
            &self.config.root,
            WatchConfig {
                buffer_size: self.config.buffer_size,
            },
        )?;

        // The service's own output files must not loop back in as changes.
        let mut ignore_paths = vec![self.config.log_file.clone()];
        for descriptor in self.config.active_sinks() {
            match descriptor {
                SinkDescriptor::Sqlite { path } => ignore_paths.push(path.clone()),
            }
        }

        let merger = tokio::spawn(run_merger(
            MergerConfig {
                dedup_window: self.config.dedup_window(),
                attribution_budget: self.config.attribution_budget(),
                ignore_paths,
            },
            realtime_rx,
            scan_rx,
            cursor_tx,
            Arc::clone(&self.resolver),
            self.network.clone(),
            replicator,
        ));

        let scanner = tokio::spawn(run_scanner(
            self.config.root.clone(),
            ScanConfig {
                interval: self.config.scan_interval(),
            },
            cursor_rx.clone(),
            scan_tx,
            log,
            shutdown_rx,
        ));

        Ok(RunningPipeline {
            watcher,
            shutdown: shutdown_tx,
            scanner,
            merger,
            cursor: cursor_rx,
        })
    }

    async fn open_sinks(&self, log: &Arc<AuditLogSink>) -> Vec<Arc<dyn ChangeSink>> {
        let mut sinks: Vec<Arc<dyn ChangeSink>> = Vec::new();
        for descriptor in self.config.active_sinks() {
            match descriptor {
                SinkDescriptor::Sqlite { path } => match SqliteSink::open(path) {
                    Ok(sink) => sinks.push(Arc::new(sink)),
                    Err(e) => {
                        // Per-sink isolation applies to construction too:
                        // report and run without it.
                        warn!(sink = %descriptor, "skipping sink that failed to open: {e}");
                        let _ = log
                            .note("sink-error", &format!("{descriptor} failed to open: {e}"))
                            .await;
                    }
                },
            }
        }
        sinks
    }

    /// Stop observing: cancel the subscription, stop the scanner, then let
    /// the merger drain within the grace period.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                ServiceState::Running => *state = ServiceState::Stopping,
                // Not running: nothing to unwind.
                _ => return,
            }
        }

        let Some(pipeline) = self.pipeline.lock().take() else {
            *self.state.lock() = ServiceState::Stopped;
            return;
        };

        // No new real-time events once the watcher is gone.
        drop(pipeline.watcher);
        let _ = pipeline.shutdown.send(true);

        let grace = self.config.shutdown_grace();
        let scanner_abort = pipeline.scanner.abort_handle();
        if tokio::time::timeout(grace, pipeline.scanner).await.is_err() {
            warn!("scanner did not stop within grace period, aborting");
            scanner_abort.abort();
        }
        // Producers are gone, so the merger drains its queues and exits.
        let merger_abort = pipeline.merger.abort_handle();
        if tokio::time::timeout(grace, pipeline.merger).await.is_err() {
            warn!("merger did not drain within grace period, aborting");
            merger_abort.abort();
        }

        let final_cursor = *pipeline.cursor.borrow();
        *self.state.lock() = ServiceState::Stopped;
        info!(cursor = %final_cursor, "monitoring stopped");
    }
}

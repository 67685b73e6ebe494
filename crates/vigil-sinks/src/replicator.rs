//! Fan-out replication with per-sink failure isolation.

use crate::{AuditLogSink, ChangeSink};
use std::sync::Arc;
use tracing::warn;
use vigil_types::{ChangeEvent, SinkWriteResult};

/// Writes each accepted event to the audit log and every configured sink.
///
/// No cross-sink transaction: sinks may diverge if the process dies
/// mid-replication. Delivery is at-least-once per sink.
pub struct Replicator {
    log: Arc<AuditLogSink>,
    sinks: Vec<Arc<dyn ChangeSink>>,
}

impl Replicator {
    pub fn new(log: Arc<AuditLogSink>, sinks: Vec<Arc<dyn ChangeSink>>) -> Self {
        Self { log, sinks }
    }

    /// The audit log handle, for pipeline health notes.
    pub fn log(&self) -> &Arc<AuditLogSink> {
        &self.log
    }

    /// Attempt every sink independently. The audit log goes first; each
    /// failure becomes a result record and a health note, never an abort.
    pub async fn replicate(&self, event: &ChangeEvent) -> Vec<SinkWriteResult> {
        let mut results = Vec::with_capacity(1 + self.sinks.len());

        match self.log.write(event).await {
            Ok(()) => results.push(SinkWriteResult::ok(self.log.id())),
            Err(e) => {
                warn!(sink = self.log.id(), "audit log write failed: {e}");
                results.push(SinkWriteResult::failed(self.log.id(), e.to_string()));
            }
        }

        for sink in &self.sinks {
            match sink.write(event).await {
                Ok(()) => results.push(SinkWriteResult::ok(sink.id())),
                Err(e) => {
                    warn!(sink = sink.id(), "sink write failed: {e}");
                    let _ = self
                        .log
                        .note("sink-error", &format!("{}: {e}", sink.id()))
                        .await;
                    results.push(SinkWriteResult::failed(sink.id(), e.to_string()));
                }
            }
        }

        results
    }
}

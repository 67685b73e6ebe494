//! Core change event type.

use crate::{ActorInfo, ChangeKind, NetworkInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Provenance of a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// Delivered by the real-time filesystem watcher.
    RealTime,
    /// Synthesized by a reconciliation scan over the subtree.
    Reconciliation,
}

/// A detected change under the monitored subtree.
///
/// Immutable once constructed; attribution fields are filled in before the
/// event reaches replication and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Absolute path of the changed entry.
    pub path: PathBuf,
    /// What happened to the entry.
    pub kind: ChangeKind,
    /// Detection time. For reconciliation events this is the file's
    /// last-write time, not the scan time.
    pub observed_at: DateTime<Utc>,
    /// Which stream produced the event.
    pub origin: EventOrigin,
    /// Responsible process/user, if resolved within budget.
    pub actor: Option<ActorInfo>,
    /// Host network identity, if resolved.
    pub network: Option<NetworkInfo>,
}

impl ChangeEvent {
    /// Create an unenriched event.
    pub fn new(
        path: impl Into<PathBuf>,
        kind: ChangeKind,
        observed_at: DateTime<Utc>,
        origin: EventOrigin,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            observed_at,
            origin,
            actor: None,
            network: None,
        }
    }

    /// A real-time event observed now.
    pub fn real_time(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self::new(path, kind, Utc::now(), EventOrigin::RealTime)
    }

    /// A reconciliation event carrying the file's last-write time.
    pub fn reconciled(path: impl Into<PathBuf>, modified_at: DateTime<Utc>) -> Self {
        Self::new(path, ChangeKind::Modified, modified_at, EventOrigin::Reconciliation)
    }

    /// Return an enriched copy. Consumes self so enrichment happens exactly
    /// once, before the event leaves the pipeline's enrichment step.
    pub fn enriched(mut self, actor: Option<ActorInfo>, network: Option<NetworkInfo>) -> Self {
        self.actor = actor;
        self.network = network;
        self
    }

    /// Dedup identity: same path and kind.
    pub fn dedup_key(&self) -> (&Path, ChangeKind) {
        (self.path.as_path(), self.kind)
    }

    /// Rendered process column, shared by the audit log and sink rows.
    pub fn process_info(&self) -> String {
        match &self.actor {
            Some(actor) => actor.render(),
            None => "Unknown Process".to_string(),
        }
    }

    /// Rendered network column, shared by the audit log and sink rows.
    pub fn network_info(&self) -> String {
        self.network.clone().unwrap_or_default().render()
    }

    /// One audit log line, newline excluded.
    pub fn log_line(&self) -> String {
        format!(
            "{}: {} - {} by {}, {}",
            self.observed_at.to_rfc3339(),
            self.kind,
            self.path.display(),
            self.process_info(),
            self.network_info(),
        )
    }
}

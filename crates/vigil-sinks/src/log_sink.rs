//! Append-only audit log.

use crate::{ChangeSink, SinkError};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use vigil_types::ChangeEvent;

/// The local append-only text log, one line per event.
///
/// Audit records and pipeline health notes share the file; notes carry a
/// `[tag]` so operators can tell them apart. Appends are serialized through
/// the internal mutex so concurrent writers never interleave within a line.
pub struct AuditLogSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLogSink {
    /// Open (creating if needed) the log for appending. Failure here is
    /// fatal to service startup.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Where the log lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a pipeline-health line, e.g. a scan or sink failure.
    pub async fn note(&self, tag: &str, message: &str) -> Result<(), SinkError> {
        self.append(&format!("{}: [{tag}] {message}", Utc::now().to_rfc3339()))
            .await
    }

    async fn append(&self, line: &str) -> Result<(), SinkError> {
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ChangeSink for AuditLogSink {
    fn id(&self) -> &str {
        "audit-log"
    }

    async fn write(&self, event: &ChangeEvent) -> Result<(), SinkError> {
        self.append(&event.log_line()).await
    }
}

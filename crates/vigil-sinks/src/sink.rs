//! Sink trait and test doubles.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use vigil_types::ChangeEvent;

/// Sink errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// A persistence destination receiving one copy of each change record.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    /// Stable identifier used in write results and health notes.
    fn id(&self) -> &str;

    /// Append one record. Failures are isolated per sink by the caller.
    async fn write(&self, event: &ChangeEvent) -> Result<(), SinkError>;
}

/// In-memory sink for testing.
#[derive(Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records accepted so far.
    pub fn recorded(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl ChangeSink for MemorySink {
    fn id(&self) -> &str {
        "memory"
    }

    async fn write(&self, event: &ChangeEvent) -> Result<(), SinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Deterministically failing sink for testing failure isolation.
pub struct FailingSink {
    reason: String,
}

impl FailingSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ChangeSink for FailingSink {
    fn id(&self) -> &str {
        "failing"
    }

    async fn write(&self, _event: &ChangeEvent) -> Result<(), SinkError> {
        Err(SinkError::Unavailable(self.reason.clone()))
    }
}

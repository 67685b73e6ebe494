//! Per-sink write outcomes.

use serde::{Deserialize, Serialize};

/// Outcome of replicating one event to one sink.
///
/// Never persisted; feeds operator logging and health notes only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkWriteResult {
    /// Stable identifier of the sink.
    pub sink_id: String,
    /// Whether the write landed.
    pub success: bool,
    /// Failure detail, if any.
    pub error: Option<String>,
}

impl SinkWriteResult {
    /// A successful write.
    pub fn ok(sink_id: impl Into<String>) -> Self {
        Self {
            sink_id: sink_id.into(),
            success: true,
            error: None,
        }
    }

    /// A failed write with detail.
    pub fn failed(sink_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            sink_id: sink_id.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

//! Replication sinks for Vigil change records.
//!
//! Every accepted event is written to the append-only audit log and to each
//! configured store sink independently. A failing sink produces a
//! [`vigil_types::SinkWriteResult`] and a health note; it never aborts the
//! other sinks or the pipeline.

mod log_sink;
mod replicator;
mod sink;
mod sqlite;

pub use log_sink::AuditLogSink;
pub use replicator::Replicator;
pub use sink::{ChangeSink, FailingSink, MemorySink, SinkError};
pub use sqlite::SqliteSink;

//! Event merging, deduplication and cursor tracking for Vigil.
//!
//! The merger task is the pipeline's sole serialization point: it is the one
//! consumer of both producer streams, the one owner of the dedup index, and
//! the one writer of the reconciliation cursor. Serializing through a single
//! task closes the producer/producer race the two callbacks would otherwise
//! have on shared state.

mod dedup;
mod merger;

pub use dedup::DedupIndex;
pub use merger::{run_merger, MergerConfig};

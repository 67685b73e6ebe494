//! Change event types for Vigil.

mod actor;
mod event;
mod kind;
mod network;
mod sink;

pub use actor::ActorInfo;
pub use event::{ChangeEvent, EventOrigin};
pub use kind::ChangeKind;
pub use network::NetworkInfo;
pub use sink::SinkWriteResult;

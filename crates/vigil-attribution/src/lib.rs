//! Best-effort actor and network attribution for Vigil.
//!
//! Attribution never fails the pipeline: every resolution path degrades to
//! `None`, which downstream rendering turns into `Unknown …` placeholders.

mod network;
mod resolver;

pub use network::NetworkIdentity;
pub use resolver::{ActorResolver, FixedActorResolver, SysinfoActorResolver};

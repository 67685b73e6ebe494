//! Actor resolution.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use sysinfo::{System, Users};
use tracing::debug;
use vigil_types::ActorInfo;

/// Capability for mapping a changed path to the responsible process/user.
///
/// Implementations must be time-bounded best-effort: any failure inspecting
/// another process degrades to `None` rather than an error.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    /// Resolve the actor for a change under `path`, or `None` if no process
    /// could be tied to it.
    async fn resolve(&self, path: &Path) -> Option<ActorInfo>;
}

/// Production resolver backed by the `sysinfo` process table.
///
/// A process is considered responsible if its executable, working directory,
/// or command line references the monitored root. The table walk runs on the
/// blocking pool; the caller bounds it with a timeout.
pub struct SysinfoActorResolver {
    root: PathBuf,
}

impl SysinfoActorResolver {
    /// Create a resolver scoped to the monitored root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ActorResolver for SysinfoActorResolver {
    async fn resolve(&self, _path: &Path) -> Option<ActorInfo> {
        let root = self.root.clone();
        match tokio::task::spawn_blocking(move || scan_process_table(&root)).await {
            Ok(actor) => actor,
            Err(e) => {
                debug!("process table scan aborted: {e}");
                None
            }
        }
    }
}

fn scan_process_table(root: &Path) -> Option<ActorInfo> {
    let sys = System::new_all();
    let users = Users::new_with_refreshed_list();
    let own_pid = std::process::id();
    let root_str = root.to_string_lossy();

    for (pid, process) in sys.processes() {
        if pid.as_u32() == own_pid {
            continue;
        }

        let references_root = process
            .cwd()
            .map(|cwd| cwd.starts_with(root))
            .unwrap_or(false)
            || process
                .exe()
                .map(|exe| exe.starts_with(root))
                .unwrap_or(false)
            || process
                .cmd()
                .iter()
                .any(|arg| arg.to_string_lossy().contains(root_str.as_ref()));

        if !references_root {
            continue;
        }

        let mut actor = ActorInfo::new(process.name().to_string_lossy(), pid.as_u32());
        if let Some(uid) = process.user_id() {
            if let Some(user) = users.get_user_by_id(uid) {
                actor = actor.with_user(user.name());
            }
        }
        return Some(actor);
    }

    None
}

/// Test resolver returning a canned attribution.
#[derive(Debug, Clone, Default)]
pub struct FixedActorResolver {
    actor: Option<ActorInfo>,
}

impl FixedActorResolver {
    /// Always resolve to `actor`.
    pub fn new(actor: ActorInfo) -> Self {
        Self { actor: Some(actor) }
    }

    /// Never resolve anything.
    pub fn unresolved() -> Self {
        Self { actor: None }
    }
}

#[async_trait]
impl ActorResolver for FixedActorResolver {
    async fn resolve(&self, _path: &Path) -> Option<ActorInfo> {
        self.actor.clone()
    }
}

//! Actor attribution for change events.

use serde::{Deserialize, Serialize};

/// The process/user believed responsible for a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorInfo {
    /// Name of the process holding the changed subtree.
    pub process_name: String,
    /// Process identifier.
    pub process_id: u32,
    /// Account owning the process, if resolvable.
    pub user_name: Option<String>,
}

impl ActorInfo {
    /// Create attribution with an unresolved user.
    pub fn new(process_name: impl Into<String>, process_id: u32) -> Self {
        Self {
            process_name: process_name.into(),
            process_id,
            user_name: None,
        }
    }

    /// Attach the owning account.
    pub fn with_user(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    /// Rendered form used in log lines and sink rows.
    pub fn render(&self) -> String {
        format!(
            "Process: {}, ID: {}, User: {}",
            self.process_name,
            self.process_id,
            self.user_name.as_deref().unwrap_or("Unknown User"),
        )
    }
}

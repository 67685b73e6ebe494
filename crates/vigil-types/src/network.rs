//! Host network identity attached to change events.

use serde::{Deserialize, Serialize};

/// Local network identity of the host that observed a change.
///
/// Resolved once per process lifetime and cached; either field may stay
/// unresolved if interface discovery fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    /// Local IPv4 address of the first usable interface.
    pub ip_address: Option<String>,
    /// MAC address of the same interface.
    pub mac_address: Option<String>,
}

impl NetworkInfo {
    /// Create identity with both fields resolved.
    pub fn new(ip_address: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            ip_address: Some(ip_address.into()),
            mac_address: Some(mac_address.into()),
        }
    }

    /// Whether anything was resolved at all.
    pub fn is_resolved(&self) -> bool {
        self.ip_address.is_some() || self.mac_address.is_some()
    }

    /// Rendered form used in log lines and sink rows.
    pub fn render(&self) -> String {
        format!(
            "IP: {}, MAC: {}",
            self.ip_address.as_deref().unwrap_or("Unknown IP"),
            self.mac_address.as_deref().unwrap_or("Unknown MAC"),
        )
    }
}

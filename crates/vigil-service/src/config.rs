//! Service configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown sink scheme in descriptor: {0}")]
    UnknownSinkScheme(String),
    #[error("empty sink descriptor")]
    EmptyDescriptor,
}

/// An opaque connection descriptor for one store sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkDescriptor {
    /// SQLite database file, descriptor form `sqlite:<path>`.
    Sqlite { path: PathBuf },
}

impl FromStr for SinkDescriptor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ConfigError::EmptyDescriptor);
        }
        match s.split_once(':') {
            Some(("sqlite", path)) if !path.is_empty() => Ok(Self::Sqlite {
                path: PathBuf::from(path),
            }),
            _ => Err(ConfigError::UnknownSinkScheme(s.to_string())),
        }
    }
}

impl fmt::Display for SinkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite { path } => write!(f, "sqlite:{}", path.display()),
        }
    }
}

/// Full service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Root of the monitored subtree.
    pub root: PathBuf,
    /// Append-only audit log path.
    pub log_file: PathBuf,
    /// Whether store sinks are written at all.
    #[serde(default)]
    pub sinks_enabled: bool,
    /// Store sinks, 0..N.
    #[serde(default)]
    pub sinks: Vec<SinkDescriptor>,
    /// Seconds between reconciliation passes.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Real-time channel capacity before events are dropped.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Dedup tolerance in seconds; defaults to the scan interval.
    #[serde(default)]
    pub dedup_window_secs: Option<u64>,
    /// Upper bound on one attribution lookup, in milliseconds.
    #[serde(default = "default_attribution_budget_ms")]
    pub attribution_budget_ms: u64,
    /// How long `stop` waits for in-flight work to drain.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Cursor starting point. `None` means service start time; operators can
    /// backdate it to cover known downtime.
    #[serde(default)]
    pub initial_cursor: Option<DateTime<Utc>>,
}

fn default_scan_interval_secs() -> u64 {
    10
}

fn default_buffer_size() -> usize {
    1024
}

fn default_attribution_budget_ms() -> u64 {
    500
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

impl MonitorConfig {
    /// Configuration with defaults for everything but the required paths.
    pub fn new(root: impl Into<PathBuf>, log_file: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            log_file: log_file.into(),
            sinks_enabled: false,
            sinks: Vec::new(),
            scan_interval_secs: default_scan_interval_secs(),
            buffer_size: default_buffer_size(),
            dedup_window_secs: None,
            attribution_budget_ms: default_attribution_budget_ms(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            initial_cursor: None,
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        self.dedup_window_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.scan_interval())
    }

    pub fn attribution_budget(&self) -> Duration {
        Duration::from_millis(self.attribution_budget_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Sinks that will actually be written.
    pub fn active_sinks(&self) -> &[SinkDescriptor] {
        if self.sinks_enabled {
            &self.sinks
        } else {
            &[]
        }
    }
}

//! Supervisor wiring the Vigil monitoring pipeline.

mod config;
mod service;

pub use config::{ConfigError, MonitorConfig, SinkDescriptor};
pub use service::{MonitorService, ServiceError, ServiceState};

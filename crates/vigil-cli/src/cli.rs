//! Argument parsing and command execution.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use vigil_service::{ConfigError, MonitorConfig, MonitorService, ServiceError, SinkDescriptor};

use crate::Exit;

/// Filesystem change audit service.
#[derive(Debug, Parser)]
#[command(name = "vigil", version, about)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Monitor a folder and record every change until interrupted
    Run(RunArgs),
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Root of the subtree to monitor
    folder_path: PathBuf,

    /// Append-only audit log file
    log_file: PathBuf,

    /// Store sink descriptors (e.g. sqlite:/var/lib/vigil/changes.db);
    /// passing any enables sink replication
    #[arg(long = "sink", value_name = "DESCRIPTOR")]
    sinks: Vec<String>,

    /// Seconds between reconciliation passes
    #[arg(long, default_value_t = 10)]
    scan_interval_secs: u64,

    /// Real-time notification buffer size
    #[arg(long, default_value_t = 1024)]
    buffer_size: usize,
}

/// CLI errors.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Config(_) => Exit::ConfigError.into(),
            Self::Service(_) | Self::Io(_) => Exit::GeneralError.into(),
        }
    }
}

impl Cli {
    pub async fn execute(self) -> Result<(), CliError> {
        match self.command {
            Command::Run(args) => run(args).await,
        }
    }
}

async fn run(args: RunArgs) -> Result<(), CliError> {
    let sinks = args
        .sinks
        .iter()
        .map(|s| s.parse::<SinkDescriptor>())
        .collect::<Result<Vec<_>, _>>()?;

    let mut config = MonitorConfig::new(args.folder_path, args.log_file);
    config.sinks_enabled = !sinks.is_empty();
    config.sinks = sinks;
    config.scan_interval_secs = args.scan_interval_secs;
    config.buffer_size = args.buffer_size;

    let service = MonitorService::new(config);
    service.start().await.map_err(CliError::Service)?;
    info!("monitoring, press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, stopping");
    service.stop().await;
    Ok(())
}

//! EDF Report Pipeline
//!
//! Upload-triggered processing: notification batch in, one dominant-frequency
//! report per uploaded EDF file out.

mod config;
mod event;
mod handler;

pub use config::{PipelineConfig, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use event::{decode_key, NotificationBatch, NotificationRecord, ObjectLocation};
pub use handler::{EventHandler, ProcessedRecord};

use report_builder::AnalysisError;
use storage::StorageError;
use thiserror::Error;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid notification event: {0}")]
    Event(#[from] serde_json::Error),

    #[error("Invalid object key {0}")]
    InvalidKey(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Transfer error: {0}")]
    Storage(#[from] StorageError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Analysis task failed: {0}")]
    Task(String),
}

/// Initialize logging
///
/// An unparseable `log_level` falls back to INFO and is reported once the
/// subscriber is installed.
pub fn init_logging(config: &PipelineConfig) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = config.log_level.parse::<Level>().ok();
    let builder = FmtSubscriber::builder()
        .with_max_level(level.unwrap_or(Level::INFO))
        .with_target(true);

    if config.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    if level.is_none() {
        warn!("Unknown log level {:?}, logging at INFO", config.log_level);
    }
    Ok(())
}

//! Pipeline configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then
//! `EDF_REPORT__*` environment variables.

use crate::PipelineError;
use config::{Config, ConfigError, Environment, File};
use report_builder::{BuilderConfig, FailurePolicy, SamplingPolicy, WelchConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "edf-report.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "EDF_REPORT";

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root directory of the local object store
    pub store_root: PathBuf,

    /// Scratch directory for downloads and reports
    pub scratch_dir: PathBuf,

    /// Appended to the source bucket name to form the report bucket
    pub destination_suffix: String,

    /// Welch segment length (samples)
    pub segment_length: usize,

    pub sampling_policy: SamplingPolicy,
    pub failure_policy: FailurePolicy,

    /// Emit JSON log lines instead of plain text
    pub json_logs: bool,

    /// trace, debug, info, warn or error
    pub log_level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("objects"),
            scratch_dir: std::env::temp_dir().join("edf-report"),
            destination_suffix: "_final_report".to_string(),
            segment_length: 1024,
            sampling_policy: SamplingPolicy::SharedFirst,
            failure_policy: FailurePolicy::FailFast,
            json_logs: false,
            log_level: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration; a missing file is not an error
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("store_root", &*defaults.store_root.to_string_lossy())?
            .set_default("scratch_dir", &*defaults.scratch_dir.to_string_lossy())?
            .set_default("destination_suffix", defaults.destination_suffix.as_str())?
            .set_default("segment_length", defaults.segment_length as i64)?
            .set_default("sampling_policy", "shared_first")?
            .set_default("failure_policy", "fail_fast")?
            .set_default("json_logs", defaults.json_logs)?
            .set_default("log_level", defaults.log_level.as_str())?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        if config.log_level.parse::<Level>().is_err() {
            return Err(ConfigError::Message(format!("invalid log_level {:?}", config.log_level)).into());
        }
        Ok(config)
    }

    /// Report builder settings
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            welch: WelchConfig {
                segment_length: self.segment_length,
            },
            sampling_policy: self.sampling_policy,
            failure_policy: self.failure_policy,
        }
    }
}

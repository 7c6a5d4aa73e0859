//! Spectral Report Builder
//!
//! Turns one EDF recording into one dominant-frequency report. Channels are
//! processed strictly in discovery order; the report file is only created
//! once every channel has been handled.

use crate::error::AnalysisError;
use crate::report::Report;
use edf_format::{EdfReader, SignalSet};
use serde::{Deserialize, Serialize};
use spectral_engine::{dominant_frequency, WelchConfig, WelchEstimator};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix appended to the request id to name the report file
pub const REPORT_SUFFIX: &str = "-report.json";

/// Which sampling frequency each channel's spectrum is scaled with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingPolicy {
    /// Every channel uses the first channel's frequency. Channels recorded
    /// at a different rate get mis-scaled bins.
    #[default]
    SharedFirst,
    /// Every channel uses its own declared frequency
    PerChannel,
}

/// What a per-channel failure does to the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// First failing channel aborts the run, no report is written
    #[default]
    FailFast,
    /// Failing channels are logged and left out of the report
    BestEffort,
}

/// Report builder configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub welch: WelchConfig,
    pub sampling_policy: SamplingPolicy,
    pub failure_policy: FailurePolicy,
}

/// Builds dominant-frequency reports into an output directory
pub struct ReportBuilder {
    output_dir: PathBuf,
    config: BuilderConfig,
}

impl ReportBuilder {
    /// Create a builder writing reports into `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>, config: BuilderConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            config,
        }
    }

    /// Path the report for `request_id` is written to
    pub fn report_path(&self, request_id: &str) -> PathBuf {
        self.output_dir.join(format!("{request_id}{REPORT_SUFFIX}"))
    }

    /// Analyze one EDF file and write its report, returning the report path
    pub fn analyze(
        &self,
        request_id: &str,
        input: impl AsRef<Path>,
    ) -> Result<PathBuf, AnalysisError> {
        validate_request_id(request_id)?;
        let input = input.as_ref();
        info!("Analyzing {} (request {})", input.display(), request_id);

        let signals = EdfReader::open(input)?.read_signal_set()?;
        let report = self.build(&signals)?;

        let path = self.report_path(request_id);
        self.write_report(&report, &path)?;
        info!(
            "Wrote report {} with {} channels",
            path.display(),
            report.len()
        );
        Ok(path)
    }

    /// Build a report from already decoded signals
    pub fn build(&self, signals: &SignalSet) -> Result<Report, AnalysisError> {
        let (labels, samples, frequencies) = (
            signals.labels.len(),
            signals.samples.len(),
            signals.sample_frequencies.len(),
        );
        if labels != samples || labels != frequencies {
            return Err(AnalysisError::InconsistentSignals {
                labels,
                samples,
                frequencies,
            });
        }

        let mut report = Report::new();
        let Some(&shared) = signals.sample_frequencies.first() else {
            debug!("No signal channels, report is empty");
            return Ok(report);
        };

        if self.config.sampling_policy == SamplingPolicy::SharedFirst
            && signals.sample_frequencies.iter().any(|&f| f != shared)
        {
            warn!(
                "Channels have differing sampling frequencies {:?}; using {} Hz for all",
                signals.sample_frequencies, shared
            );
        }

        let mut estimator = WelchEstimator::new(self.config.welch);
        for channel in signals.channels() {
            let rate = match self.config.sampling_policy {
                SamplingPolicy::SharedFirst => shared,
                SamplingPolicy::PerChannel => channel.sample_frequency,
            };

            match dominant_frequency(&mut estimator, channel.samples, rate) {
                Ok(frequency) => {
                    debug!("Channel {:?}: dominant frequency {} Hz", channel.label, frequency);
                    report.insert(channel.label, frequency);
                }
                Err(source) => {
                    let e = AnalysisError::Estimation {
                        label: channel.label.to_string(),
                        source,
                    };
                    if self.config.failure_policy == FailurePolicy::FailFast {
                        return Err(e);
                    }
                    warn!("Skipping channel {:?}: {}", channel.label, e);
                }
            }
        }
        Ok(report)
    }

    fn write_report(&self, report: &Report, path: &Path) -> Result<(), AnalysisError> {
        let bytes = report.to_json()?;
        fs::create_dir_all(&self.output_dir)?;

        // Written aside and renamed so a failed run never leaves a report behind
        let partial = path.with_extension("json.partial");
        if let Err(e) = fs::write(&partial, &bytes).and_then(|_| fs::rename(&partial, path)) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        Ok(())
    }
}

fn validate_request_id(request_id: &str) -> Result<(), AnalysisError> {
    let invalid = request_id.is_empty()
        || request_id == "."
        || request_id == ".."
        || request_id.contains(['/', '\\']);
    if invalid {
        return Err(AnalysisError::InvalidRequest(request_id.to_string()));
    }
    Ok(())
}

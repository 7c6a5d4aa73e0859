//! Analysis Error Types

use edf_format::DecodeError;
use spectral_engine::EstimationError;
use thiserror::Error;

/// Errors that abort an analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Request identifier cannot name a report file
    #[error("Invalid request id {0:?}")]
    InvalidRequest(String),

    /// Input file could not be opened or decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Signal set whose parallel channel vectors disagree in length
    #[error("Inconsistent signal set: {labels} labels, {samples} sample sequences, {frequencies} frequencies")]
    InconsistentSignals {
        labels: usize,
        samples: usize,
        frequencies: usize,
    },

    /// Spectral estimation failed for a channel
    #[error("Estimation failed for channel {label:?}: {source}")]
    Estimation {
        label: String,
        #[source]
        source: EstimationError,
    },

    /// Report file could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

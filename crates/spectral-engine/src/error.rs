//! Estimation Error Types

use thiserror::Error;

/// Errors during spectral estimation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// No samples to analyze
    #[error("Signal has no samples")]
    EmptySignal,

    /// NaN or infinite sample value
    #[error("Non-finite sample {value} at index {index}")]
    NonFiniteSample { index: usize, value: f64 },

    /// Sampling frequency is zero, negative, or not finite
    #[error("Invalid sampling frequency: {0} Hz")]
    InvalidSampleFrequency(f64),

    /// Segment length of zero
    #[error("Segment length must be at least 1")]
    InvalidSegmentLength,
}

//! Spectral Engine
//!
//! Welch power spectral density estimation over rustfft, and dominant
//! frequency selection from the resulting spectrum.

mod error;
mod spectrum;
mod welch;

pub use error::EstimationError;
pub use spectrum::ChannelSpectrum;
pub use welch::{WelchConfig, WelchEstimator, DEFAULT_SEGMENT_LENGTH};

/// Estimate a signal's spectrum and return its strongest frequency (Hz)
pub fn dominant_frequency(
    estimator: &mut WelchEstimator,
    signal: &[f64],
    sample_rate: f64,
) -> Result<f64, EstimationError> {
    let spectrum = estimator.estimate(signal, sample_rate)?;
    // A successful estimate always has at least the DC bin
    spectrum
        .dominant_frequency()
        .ok_or(EstimationError::EmptySignal)
}

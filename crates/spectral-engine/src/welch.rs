//! Welch Power Spectral Density Estimation
//!
//! Averages periodograms of half-overlapping, Hann-windowed, mean-detrended
//! segments. Output uses one-sided density scaling (power per Hz).

use crate::error::EstimationError;
use crate::spectrum::ChannelSpectrum;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default analysis segment length (samples)
pub const DEFAULT_SEGMENT_LENGTH: usize = 1024;

/// Welch estimator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelchConfig {
    /// Samples per segment; signals shorter than this use one segment of
    /// their own length
    pub segment_length: usize,
}

impl Default for WelchConfig {
    fn default() -> Self {
        Self {
            segment_length: DEFAULT_SEGMENT_LENGTH,
        }
    }
}

/// Welch PSD estimator
pub struct WelchEstimator {
    /// FFT planner, caches plans across channels
    planner: FftPlanner<f64>,
    config: WelchConfig,
}

impl Default for WelchEstimator {
    fn default() -> Self {
        Self::new(WelchConfig::default())
    }
}

impl WelchEstimator {
    /// Create a new estimator
    pub fn new(config: WelchConfig) -> Self {
        Self {
            planner: FftPlanner::new(),
            config,
        }
    }

    /// Periodic Hann window of length n
    fn hann_window(n: usize) -> Vec<f64> {
        if n == 1 {
            return vec![1.0];
        }
        (0..n)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n as f64).cos())
            .collect()
    }

    /// Estimate the power spectral density of a signal
    pub fn estimate(
        &mut self,
        signal: &[f64],
        sample_rate: f64,
    ) -> Result<ChannelSpectrum, EstimationError> {
        if self.config.segment_length == 0 {
            return Err(EstimationError::InvalidSegmentLength);
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EstimationError::InvalidSampleFrequency(sample_rate));
        }
        if signal.is_empty() {
            return Err(EstimationError::EmptySignal);
        }
        if let Some((index, &value)) = signal.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(EstimationError::NonFiniteSample { index, value });
        }

        let nperseg = self.config.segment_length.min(signal.len());
        let noverlap = nperseg / 2;
        let step = nperseg - noverlap;
        let segments = (signal.len() - noverlap) / step;

        let window = Self::hann_window(nperseg);
        let window_power: f64 = window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (sample_rate * window_power);

        let bins = nperseg / 2 + 1;
        let fft = self.planner.plan_fft_forward(nperseg);
        let mut buffer: Vec<Complex<f64>> = vec![Complex::new(0.0, 0.0); nperseg];
        let mut power = vec![0.0; bins];

        for s in 0..segments {
            let segment = &signal[s * step..s * step + nperseg];
            let mean = segment.iter().sum::<f64>() / nperseg as f64;
            for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&window) {
                *slot = Complex::new((x - mean) * w, 0.0);
            }
            fft.process(&mut buffer);
            for (acc, c) in power.iter_mut().zip(&buffer) {
                *acc += c.norm_sqr() * scale;
            }
        }

        // Fold negative frequencies; DC and an even-length Nyquist bin are unique
        let fold_end = if nperseg % 2 == 0 { bins - 1 } else { bins };
        for p in power.iter_mut().take(fold_end).skip(1) {
            *p *= 2.0;
        }
        for p in power.iter_mut() {
            *p /= segments as f64;
        }

        let resolution = sample_rate / nperseg as f64;
        let frequencies = (0..bins).map(|k| k as f64 * resolution).collect();

        debug!(
            "Welch estimate: {} samples, {} segments of {}, {:.4} Hz bins",
            signal.len(),
            segments,
            nperseg,
            resolution
        );

        Ok(ChannelSpectrum { frequencies, power })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / rate).sin()).collect()
    }

    #[test]
    fn test_sine_peak() {
        let mut estimator = WelchEstimator::default();
        let spectrum = estimator.estimate(&sine(10.0, 256.0, 2048), 256.0).unwrap();

        assert_eq!(spectrum.len(), 513);
        assert_eq!(spectrum.resolution(), Some(0.25));
        let dominant = spectrum.dominant_frequency().unwrap();
        assert!((dominant - 10.0).abs() <= 0.25, "dominant {dominant}");
    }

    #[test]
    fn test_density_integrates_to_variance() {
        let mut estimator = WelchEstimator::default();
        let spectrum = estimator.estimate(&sine(10.0, 256.0, 2048), 256.0).unwrap();
        // Unit sine has mean square 0.5
        assert!((spectrum.total_power() - 0.5).abs() < 0.005);
    }

    #[test]
    fn test_short_signal_uses_single_segment() {
        let mut estimator = WelchEstimator::default();
        let spectrum = estimator.estimate(&sine(5.0, 100.0, 500), 100.0).unwrap();

        assert_eq!(spectrum.len(), 251);
        let dominant = spectrum.dominant_frequency().unwrap();
        assert!((dominant - 5.0).abs() <= 0.2);
    }

    #[test]
    fn test_single_sample() {
        let mut estimator = WelchEstimator::default();
        let spectrum = estimator.estimate(&[3.0], 10.0).unwrap();
        assert_eq!(spectrum.frequencies, vec![0.0]);
        assert_eq!(spectrum.dominant_frequency(), Some(0.0));
    }

    #[test]
    fn test_constant_signal_resolves_to_dc() {
        let mut estimator = WelchEstimator::default();
        let spectrum = estimator.estimate(&[7.5; 2048], 256.0).unwrap();
        assert!(spectrum.power.iter().all(|&p| p.abs() < 1e-12));
        assert_eq!(spectrum.dominant_frequency(), Some(0.0));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut estimator = WelchEstimator::default();
        assert_eq!(estimator.estimate(&[], 256.0), Err(EstimationError::EmptySignal));
        assert_eq!(
            estimator.estimate(&[1.0, 2.0], 0.0),
            Err(EstimationError::InvalidSampleFrequency(0.0))
        );
        assert!(matches!(
            estimator.estimate(&[1.0, f64::NAN, 2.0], 256.0),
            Err(EstimationError::NonFiniteSample { index: 1, .. })
        ));

        let mut zero = WelchEstimator::new(WelchConfig { segment_length: 0 });
        assert_eq!(zero.estimate(&[1.0], 1.0), Err(EstimationError::InvalidSegmentLength));
    }

    #[test]
    fn test_deterministic() {
        let signal: Vec<f64> = (0..3000).map(|i| ((i * 37) % 101) as f64).collect();
        let mut a = WelchEstimator::default();
        let mut b = WelchEstimator::default();
        assert_eq!(a.estimate(&signal, 200.0), b.estimate(&signal, 200.0));
    }

    proptest! {
        #[test]
        fn prop_spectrum_shape(
            signal in proptest::collection::vec(-1000.0f64..1000.0, 1..3000),
            rate in 1.0f64..1000.0,
        ) {
            let mut estimator = WelchEstimator::default();
            let spectrum = estimator.estimate(&signal, rate).unwrap();
            let nperseg = signal.len().min(DEFAULT_SEGMENT_LENGTH);

            prop_assert_eq!(spectrum.frequencies.len(), spectrum.power.len());
            prop_assert_eq!(spectrum.len(), nperseg / 2 + 1);
            prop_assert!(spectrum.power.iter().all(|&p| p >= 0.0));
            prop_assert!(spectrum.dominant_frequency().is_some());
        }
    }
}

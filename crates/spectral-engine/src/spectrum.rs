//! Channel Spectrum

use serde::{Deserialize, Serialize};

/// One-sided power spectral density of a channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpectrum {
    /// Frequency bins (Hz), ascending
    pub frequencies: Vec<f64>,
    /// Power density per bin, parallel to `frequencies`
    pub power: Vec<f64>,
}

impl ChannelSpectrum {
    /// Number of bins
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency spacing between adjacent bins (Hz)
    pub fn resolution(&self) -> Option<f64> {
        match self.frequencies.as_slice() {
            [first, second, ..] => Some(second - first),
            _ => None,
        }
    }

    /// Frequency of the bin with the highest power.
    ///
    /// Equal maxima resolve to the lowest frequency among them.
    pub fn dominant_frequency(&self) -> Option<f64> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &p) in self.power.iter().enumerate() {
            match best {
                Some((_, max)) if p <= max => {}
                _ => best = Some((i, p)),
            }
        }
        best.and_then(|(i, _)| self.frequencies.get(i).copied())
    }

    /// Total power integrated over all bins
    pub fn total_power(&self) -> f64 {
        self.resolution()
            .map(|df| self.power.iter().sum::<f64>() * df)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_frequency() {
        let spectrum = ChannelSpectrum {
            frequencies: vec![0.0, 1.0, 2.0, 3.0],
            power: vec![0.1, 0.4, 2.0, 0.3],
        };
        assert_eq!(spectrum.dominant_frequency(), Some(2.0));
        assert_eq!(spectrum.resolution(), Some(1.0));
    }

    #[test]
    fn test_ties_pick_lowest_frequency() {
        let spectrum = ChannelSpectrum {
            frequencies: vec![0.0, 0.5, 1.0, 1.5],
            power: vec![0.2, 3.0, 1.0, 3.0],
        };
        assert_eq!(spectrum.dominant_frequency(), Some(0.5));

        let flat = ChannelSpectrum {
            frequencies: vec![0.0, 0.5, 1.0],
            power: vec![0.0; 3],
        };
        assert_eq!(flat.dominant_frequency(), Some(0.0));
    }

    #[test]
    fn test_empty_spectrum() {
        let spectrum = ChannelSpectrum::default();
        assert!(spectrum.is_empty());
        assert_eq!(spectrum.dominant_frequency(), None);
        assert_eq!(spectrum.total_power(), 0.0);
    }
}

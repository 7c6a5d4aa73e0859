//! European Data Format
//!
//! Decoding of EDF/EDF+ biosignal recordings on top of `edf_reader`, plus a
//! small encoder for building fixture files. EDF+ annotation channels are
//! kept in the header but never surfaced as signals.

mod error;
mod reader;
mod writer;

pub use edf_reader::model::{EDFChannel, EDFHeader};
pub use error::{DecodeError, EncodeError};
pub use reader::{EdfReader, ANNOTATION_LABEL};
pub use writer::EdfWriter;

use std::path::Path;

/// Fully decoded signal channels of one recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSet {
    /// Channel labels, in discovery order
    pub labels: Vec<String>,
    /// Physical samples, parallel to `labels`
    pub samples: Vec<Vec<f64>>,
    /// Sampling frequency (Hz), parallel to `labels`
    pub sample_frequencies: Vec<f64>,
}

/// Borrowed view of one channel
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    pub label: &'a str,
    pub samples: &'a [f64],
    pub sample_frequency: f64,
}

impl SignalSet {
    /// Open and fully decode a file
    pub fn read(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        EdfReader::open(path)?.read_signal_set()
    }

    /// Append a channel
    pub fn push(&mut self, label: impl Into<String>, sample_frequency: f64, samples: Vec<f64>) {
        self.labels.push(label.into());
        self.sample_frequencies.push(sample_frequency);
        self.samples.push(samples);
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate channels in discovery order
    pub fn channels(&self) -> impl Iterator<Item = Channel<'_>> {
        self.labels
            .iter()
            .zip(&self.samples)
            .zip(&self.sample_frequencies)
            .map(|((label, samples), &sample_frequency)| Channel {
                label,
                samples,
                sample_frequency,
            })
    }
}

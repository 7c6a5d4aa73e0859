//! EDF Reader
//!
//! Scoped wrapper over `edf_reader`'s synchronous reader. The library owns
//! the open file for the lifetime of the wrapper; the handle is released
//! when the reader is dropped, on success and error paths alike.

use crate::error::DecodeError;
use crate::SignalSet;
use edf_reader::file_reader::LocalFileReader;
use edf_reader::model::{EDFChannel, EDFHeader, EDF_HEADER_BYTE_SIZE};
use edf_reader::sync_reader::SyncEDFReader;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Label EDF+ uses for its annotation channel
pub const ANNOTATION_LABEL: &str = "EDF Annotations";

/// Scoped reader over one EDF file
pub struct EdfReader {
    inner: SyncEDFReader<LocalFileReader>,
    path: PathBuf,
    /// Header indices of the non-annotation channels, in file order
    signal_indices: Vec<usize>,
}

impl EdfReader {
    /// Open a file and decode its header
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let path = path.as_ref().to_path_buf();
        let opened = |source| DecodeError::Open {
            path: path.clone(),
            source,
        };
        let file_len = std::fs::metadata(&path).map_err(opened)?.len();
        let file_reader = LocalFileReader::init(&path).map_err(opened)?;

        // The library unwraps while parsing header text fields
        let inner = panic::catch_unwind(AssertUnwindSafe(|| {
            SyncEDFReader::init_with_file_reader(file_reader)
        }))
        .map_err(|payload| DecodeError::Malformed(panic_message(payload)))??;

        let header = &inner.edf_header;
        validate(header, file_len)?;

        let signal_indices: Vec<usize> = header
            .channels
            .iter()
            .enumerate()
            .filter(|(_, c)| !is_annotation(c))
            .map(|(i, _)| i)
            .collect();

        if let Some(channel) = signal_indices
            .iter()
            .map(|&i| &header.channels[i])
            .find(|c| c.digital_maximum == c.digital_minimum)
        {
            return Err(DecodeError::DegenerateRange {
                label: channel.label.clone(),
            });
        }

        info!(
            "Opened EDF file {}: {} signals, {} records of {}ms",
            path.display(),
            signal_indices.len(),
            header.number_of_blocks,
            header.block_duration
        );

        Ok(Self {
            inner,
            path,
            signal_indices,
        })
    }

    /// Decoded file header, including annotation channels
    pub fn header(&self) -> &EDFHeader {
        &self.inner.edf_header
    }

    /// Number of data records
    pub fn record_count(&self) -> u64 {
        self.header().number_of_blocks
    }

    /// Number of signal channels (annotation channels excluded)
    pub fn signal_count(&self) -> usize {
        self.signal_indices.len()
    }

    /// Signal labels in file order
    pub fn labels(&self) -> Vec<String> {
        self.signals().map(|c| c.label.clone()).collect()
    }

    /// Sampling frequency (Hz) of every signal, in file order
    pub fn sample_frequencies(&self) -> Vec<f64> {
        let block_ms = self.header().block_duration;
        self.signals()
            .map(|c| sample_frequency(c, block_ms))
            .collect()
    }

    /// Read the full physical sample sequence of one signal
    pub fn read_signal(&self, index: usize) -> Result<Vec<f64>, DecodeError> {
        if index >= self.signal_indices.len() {
            return Err(DecodeError::SignalOutOfRange {
                index,
                count: self.signal_indices.len(),
            });
        }
        let mut all = self.read_all()?;
        Ok(all.swap_remove(index))
    }

    /// Decode every signal channel into memory
    pub fn read_signal_set(&self) -> Result<SignalSet, DecodeError> {
        let mut set = SignalSet::default();
        for ((label, frequency), samples) in self
            .labels()
            .into_iter()
            .zip(self.sample_frequencies())
            .zip(self.read_all()?)
        {
            set.push(label, frequency, samples);
        }
        Ok(set)
    }

    fn signals(&self) -> impl Iterator<Item = &EDFChannel> + '_ {
        let channels = &self.header().channels;
        self.signal_indices.iter().map(move |&i| &channels[i])
    }

    /// Physical samples of every non-annotation channel
    fn read_all(&self) -> Result<Vec<Vec<f64>>, DecodeError> {
        let header = self.header();
        let duration_ms = header.number_of_blocks * header.block_duration;
        let mut window = if duration_ms == 0 {
            vec![Vec::new(); header.channels.len()]
        } else {
            self.inner.read_data_window(0, duration_ms)?
        };

        let signals: Vec<Vec<f64>> = self
            .signal_indices
            .iter()
            .map(|&i| std::mem::take(&mut window[i]).into_iter().map(f64::from).collect())
            .collect();

        debug!(
            "Read {} signals ({} samples) from {}",
            signals.len(),
            signals.iter().map(Vec::len).sum::<usize>(),
            self.path.display()
        );
        Ok(signals)
    }
}

impl Drop for EdfReader {
    fn drop(&mut self) {
        debug!("Closing EDF file {}", self.path.display());
    }
}

fn is_annotation(channel: &EDFChannel) -> bool {
    channel.label == ANNOTATION_LABEL
}

fn sample_frequency(channel: &EDFChannel, block_ms: u64) -> f64 {
    channel.number_of_samples_in_data_record as f64 * 1000.0 / block_ms as f64
}

/// Checks the library leaves to the caller
fn validate(header: &EDFHeader, file_len: u64) -> Result<(), DecodeError> {
    if header.file_version != "0" {
        return Err(DecodeError::UnsupportedVersion(header.file_version.clone()));
    }

    let expected = (1 + header.number_of_signals) * EDF_HEADER_BYTE_SIZE as u64;
    if header.byte_size_header != expected {
        return Err(DecodeError::HeaderSizeMismatch {
            declared: header.byte_size_header,
            expected,
        });
    }

    let carries_samples = header
        .channels
        .iter()
        .any(|c| !is_annotation(c) && c.number_of_samples_in_data_record > 0);
    if carries_samples && header.block_duration == 0 {
        return Err(DecodeError::InvalidRecordDuration);
    }

    let record_size = header.get_size_of_data_block();
    if record_size > 0 {
        let available = file_len.saturating_sub(header.byte_size_header) / record_size;
        if header.number_of_blocks > available {
            return Err(DecodeError::Truncated {
                declared: header.number_of_blocks,
                available,
            });
        }
    }
    Ok(())
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unreadable header".to_string())
}

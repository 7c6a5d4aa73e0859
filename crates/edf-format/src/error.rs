//! EDF Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while decoding an EDF file
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File could not be opened
    #[error("Cannot open EDF file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Underlying read failed
    #[error("I/O error while reading EDF data: {0}")]
    Io(#[from] std::io::Error),

    /// Header text the decoder could not parse
    #[error("Malformed EDF header: {0}")]
    Malformed(String),

    /// Version field is not the EDF "0" marker
    #[error("Unsupported EDF version field: {0:?}")]
    UnsupportedVersion(String),

    /// Declared header size disagrees with the signal count
    #[error("Header size mismatch: declared {declared} bytes, expected {expected}")]
    HeaderSizeMismatch { declared: u64, expected: u64 },

    /// Digital minimum equals digital maximum, so samples cannot be scaled
    #[error("Signal {label:?} has a degenerate digital range")]
    DegenerateRange { label: String },

    /// Record duration must be positive when the file carries samples
    #[error("Data record duration is zero")]
    InvalidRecordDuration,

    /// File ends before the declared data records
    #[error("Truncated EDF data: header declares {declared} records, file holds {available}")]
    Truncated { declared: u64, available: u64 },

    /// Signal index past the last signal channel
    #[error("Signal index {index} out of range ({count} signals)")]
    SignalOutOfRange { index: usize, count: usize },
}

/// Errors that can occur while encoding an EDF file
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Underlying write failed
    #[error("I/O error while writing EDF data: {0}")]
    Io(#[from] std::io::Error),

    /// Signal parameters cannot be represented in EDF
    #[error("Invalid signal {label:?}: {reason}")]
    InvalidSignal { label: String, reason: String },

    /// Value does not fit in its fixed-width ASCII field
    #[error("Value {value} does not fit in the {width}-byte {field} field")]
    FieldOverflow {
        field: &'static str,
        value: String,
        width: usize,
    },
}

//! EDF Writer
//!
//! Encodes labelled channels as a plain (non-EDF+) file with 16-bit samples.
//! Physical ranges are derived from the samples themselves. Used to build
//! fixture recordings; production input only ever goes through the reader.

use crate::error::EncodeError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

const FIXED_HEADER_LEN: usize = 256;
const SIGNAL_HEADER_LEN: usize = 256;
const DIGITAL_MIN: i32 = i16::MIN as i32;
const DIGITAL_MAX: i32 = i16::MAX as i32;

struct PendingSignal {
    label: String,
    sample_frequency: f64,
    physical_dimension: String,
    samples: Vec<f64>,
}

/// Builder-style writer for EDF files
pub struct EdfWriter {
    patient: String,
    recording: String,
    start_date: String,
    start_time: String,
    record_duration: f64,
    signals: Vec<PendingSignal>,
}

impl Default for EdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl EdfWriter {
    /// Create a writer with one-second data records
    pub fn new() -> Self {
        Self {
            patient: "X X X X".to_string(),
            recording: "Startdate X X X X".to_string(),
            start_date: "01.01.85".to_string(),
            start_time: "00.00.00".to_string(),
            record_duration: 1.0,
            signals: Vec::new(),
        }
    }

    /// Set the data record duration in whole seconds
    pub fn with_record_duration(mut self, seconds: f64) -> Self {
        self.record_duration = seconds;
        self
    }

    /// Add a signal in microvolts
    pub fn with_signal(
        mut self,
        label: impl Into<String>,
        sample_frequency: f64,
        samples: Vec<f64>,
    ) -> Self {
        self.signals.push(PendingSignal {
            label: label.into(),
            sample_frequency,
            physical_dimension: "uV".to_string(),
            samples,
        });
        self
    }

    /// Write the file to disk
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), EncodeError> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        debug!("Wrote EDF file {} ({} signals)", path.display(), self.signals.len());
        Ok(())
    }

    /// Encode the file into any writer
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), EncodeError> {
        let layouts = self
            .signals
            .iter()
            .map(|s| SignalLayout::plan(s, self.record_duration))
            .collect::<Result<Vec<_>, _>>()?;

        let record_count = layouts
            .iter()
            .zip(&self.signals)
            .map(|(layout, signal)| signal.samples.len().div_ceil(layout.samples_per_record))
            .max()
            .unwrap_or(0);

        let ns = self.signals.len();
        let mut header = Vec::with_capacity(FIXED_HEADER_LEN + ns * SIGNAL_HEADER_LEN);
        put(&mut header, "version", "0", 8)?;
        put(&mut header, "patient", &self.patient, 80)?;
        put(&mut header, "recording", &self.recording, 80)?;
        put(&mut header, "start date", &self.start_date, 8)?;
        put(&mut header, "start time", &self.start_time, 8)?;
        put(&mut header, "header bytes", &(FIXED_HEADER_LEN + ns * SIGNAL_HEADER_LEN).to_string(), 8)?;
        put(&mut header, "reserved", "", 44)?;
        put(&mut header, "number of data records", &record_count.to_string(), 8)?;
        put(&mut header, "data record duration", &format_compact(self.record_duration), 8)?;
        put(&mut header, "number of signals", &ns.to_string(), 4)?;

        for signal in &self.signals {
            put(&mut header, "label", &signal.label, 16)?;
        }
        for _ in &self.signals {
            put(&mut header, "transducer", "", 80)?;
        }
        for signal in &self.signals {
            put(&mut header, "physical dimension", &signal.physical_dimension, 8)?;
        }
        for layout in &layouts {
            put(&mut header, "physical minimum", &layout.physical_min_text, 8)?;
        }
        for layout in &layouts {
            put(&mut header, "physical maximum", &layout.physical_max_text, 8)?;
        }
        for _ in &layouts {
            put(&mut header, "digital minimum", &DIGITAL_MIN.to_string(), 8)?;
        }
        for _ in &layouts {
            put(&mut header, "digital maximum", &DIGITAL_MAX.to_string(), 8)?;
        }
        for _ in &layouts {
            put(&mut header, "prefiltering", "", 80)?;
        }
        for layout in &layouts {
            put(&mut header, "samples per record", &layout.samples_per_record.to_string(), 8)?;
        }
        for _ in &layouts {
            put(&mut header, "reserved", "", 32)?;
        }
        out.write_all(&header)?;

        let mut record = Vec::new();
        for r in 0..record_count {
            record.clear();
            for (layout, signal) in layouts.iter().zip(&self.signals) {
                let start = r * layout.samples_per_record;
                for i in start..start + layout.samples_per_record {
                    let physical = signal.samples.get(i).copied().unwrap_or(0.0);
                    record.extend_from_slice(&layout.quantize(physical).to_le_bytes());
                }
            }
            out.write_all(&record)?;
        }
        Ok(())
    }
}

struct SignalLayout {
    samples_per_record: usize,
    physical_min: f64,
    physical_max: f64,
    physical_min_text: String,
    physical_max_text: String,
}

impl SignalLayout {
    fn plan(signal: &PendingSignal, record_duration: f64) -> Result<Self, EncodeError> {
        let invalid = |reason: String| EncodeError::InvalidSignal {
            label: signal.label.clone(),
            reason,
        };

        // edf_reader only reads whole-second records
        if !(record_duration.is_finite() && record_duration >= 1.0 && record_duration.fract() == 0.0) {
            return Err(invalid(format!(
                "record duration {record_duration} is not a whole number of seconds"
            )));
        }
        let per_record = signal.sample_frequency * record_duration;
        if !per_record.is_finite() || per_record.round() < 1.0 {
            return Err(invalid(format!(
                "sample frequency {} gives no samples per record",
                signal.sample_frequency
            )));
        }
        if let Some(bad) = signal.samples.iter().find(|v| !v.is_finite()) {
            return Err(invalid(format!("non-finite sample {bad}")));
        }

        let mut lo = signal.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = signal.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if signal.samples.is_empty() {
            lo = -1.0;
            hi = 1.0;
        } else if lo == hi {
            lo -= 1.0;
            hi += 1.0;
        }

        let (physical_min_text, physical_min) = fit_bound("physical minimum", lo, true)?;
        let (physical_max_text, physical_max) = fit_bound("physical maximum", hi, false)?;

        Ok(Self {
            samples_per_record: per_record.round() as usize,
            physical_min,
            physical_max,
            physical_min_text,
            physical_max_text,
        })
    }

    fn quantize(&self, physical: f64) -> i16 {
        let span = f64::from(DIGITAL_MAX - DIGITAL_MIN);
        let scaled = (physical - self.physical_min) / (self.physical_max - self.physical_min) * span
            + f64::from(DIGITAL_MIN);
        scaled.round().clamp(f64::from(DIGITAL_MIN), f64::from(DIGITAL_MAX)) as i16
    }
}

/// Round a bound outward until it fits in an 8-byte field
fn fit_bound(field: &'static str, value: f64, round_down: bool) -> Result<(String, f64), EncodeError> {
    for precision in (0..=7).rev() {
        let scale = 10f64.powi(precision);
        let rounded = if round_down {
            (value * scale).floor() / scale
        } else {
            (value * scale).ceil() / scale
        };
        let text = trim_zeros(format!("{:.*}", precision as usize, rounded));
        if text.len() <= 8 {
            let parsed = text.parse().unwrap_or(rounded);
            return Ok((text, parsed));
        }
    }
    Err(EncodeError::FieldOverflow {
        field,
        value: value.to_string(),
        width: 8,
    })
}

fn format_compact(value: f64) -> String {
    trim_zeros(format!("{value:.6}"))
}

fn trim_zeros(text: String) -> String {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

fn put(out: &mut Vec<u8>, field: &'static str, value: &str, width: usize) -> Result<(), EncodeError> {
    if value.len() > width || !value.is_ascii() {
        return Err(EncodeError::FieldOverflow {
            field,
            value: value.to_string(),
            width,
        });
    }
    out.extend_from_slice(value.as_bytes());
    out.resize(out.len() + width - value.len(), b' ');
    Ok(())
}

//! Spectral Report Builder
//!
//! Computes the dominant frequency of every signal channel in an EDF
//! recording and writes the results as a flat JSON report.

mod builder;
mod error;
mod report;

pub use builder::{BuilderConfig, FailurePolicy, ReportBuilder, SamplingPolicy, REPORT_SUFFIX};
pub use error::AnalysisError;
pub use report::Report;
pub use spectral_engine::WelchConfig;

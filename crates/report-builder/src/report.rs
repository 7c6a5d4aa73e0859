//! Dominant Frequency Report
//!
//! Serialized as a flat JSON object mapping channel label to frequency (Hz),
//! keys in the order channels were discovered.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Channel label to dominant frequency mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    entries: IndexMap<String, f64>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a channel's dominant frequency.
    ///
    /// A repeated label overwrites the earlier value and keeps its position.
    pub fn insert(&mut self, label: impl Into<String>, frequency: f64) {
        self.entries.insert(label.into(), frequency);
    }

    /// Dominant frequency of a channel
    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, f)| (l.as_str(), *f))
    }

    /// Compact JSON encoding
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode a report from JSON
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl FromIterator<(String, f64)> for Report {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

//! Multi-channel recordings and the abstract store they are read from.
use ndarray::{Array2, ArrayView1};
use std::collections::HashSet;
use std::fmt;

use crate::error::{PrepError, Result};

/// Which of the two per-subject segments a recording holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Interictal,
    Ictal,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Interictal => f.write_str("interictal"),
            Segment::Ictal => f.write_str("ictal"),
        }
    }
}

/// A continuous recording, channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    /// Electrode identifiers, one per row of `data`. Unique.
    pub ch_names: Vec<String>,
    /// `[C, T]` samples; every channel shares the same time base.
    pub data: Array2<f32>,
    /// Sampling rate (Hz).
    pub sfreq: f32,
}

impl Recording {
    /// Build a recording, checking that names match rows and are unique.
    pub fn new(ch_names: Vec<String>, data: Array2<f32>, sfreq: f32) -> Result<Self> {
        if ch_names.len() != data.nrows() {
            return Err(PrepError::ShapeMismatch(format!(
                "{} channel names for {} data rows",
                ch_names.len(),
                data.nrows()
            )));
        }
        let mut seen = HashSet::with_capacity(ch_names.len());
        if let Some(dup) = ch_names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(PrepError::ShapeMismatch(format!("duplicate channel name {dup:?}")));
        }
        Ok(Self { ch_names, data, sfreq })
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    pub fn channel_index(&self, name: &str) -> Option<usize> {
        self.ch_names.iter().position(|n| n == name)
    }

    /// Samples of the named channel.
    pub fn channel(&self, name: &str) -> Option<ArrayView1<'_, f32>> {
        self.channel_index(name).map(|i| self.data.row(i))
    }
}

/// Read interface over the raw recording store.
///
/// The on-disk format is up to the implementation; see
/// [`crate::io::SafetensorsSource`].
pub trait RecordingSource {
    fn load(&self, segment: Segment) -> Result<Recording>;
}

/// Both segments already in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    pub interictal: Recording,
    pub ictal: Recording,
}

impl RecordingSource for InMemorySource {
    fn load(&self, segment: Segment) -> Result<Recording> {
        Ok(match segment {
            Segment::Interictal => self.interictal.clone(),
            Segment::Ictal => self.ictal.clone(),
        })
    }
}

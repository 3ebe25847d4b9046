//! Sliding-window extraction and labeling.
//!
//! A window is identified by its right edge `idx` (exclusive): it holds
//! `series[idx - sequence_len .. idx]` and ends at clock tick
//! `segment_start + idx * sample_period`. Right edges run from
//! `sequence_len` up to, but not including, the segment length, in steps of
//! `step_size`. Windows never span two segments and never start before a
//! full history is available.
use ndarray::{s, Array1, Array3, ArrayView1};

use crate::config::PipelineConfig;
use crate::labels::SeizureInterval;

/// Geometry and clock of window extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    pub sequence_len: usize,
    pub step_size: usize,
    /// Clock ticks per sample of the (conditioned) series.
    pub sample_period: i64,
}

impl WindowParams {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            sequence_len: cfg.sequence_len,
            step_size: cfg.step_size,
            sample_period: cfg.sample_period(),
        }
    }

    /// Right edges of all windows in a segment of `len` samples.
    pub fn right_edges(&self, len: usize) -> impl Iterator<Item = usize> {
        (self.sequence_len..len).step_by(self.step_size.max(1))
    }

    /// Number of windows in a segment of `len` samples.
    ///
    /// `ceil((len - sequence_len) / step_size)` when `len > sequence_len`,
    /// else zero.
    pub fn window_count(&self, len: usize) -> usize {
        len.saturating_sub(self.sequence_len).div_ceil(self.step_size.max(1))
    }
}

/// Windows of one segment of one electrode.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentWindows {
    /// `[W, sequence_len, 1]`
    pub windows: Array3<f32>,
    /// `1` iff the window's end tick is inside the seizure interval.
    pub labels: Array1<u8>,
    pub end_times: Array1<i64>,
}

impl SegmentWindows {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Interictal followed by ictal windows of one electrode.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectrodeWindows {
    pub electrode_id: String,
    pub interictal: SegmentWindows,
    pub ictal: SegmentWindows,
}

impl ElectrodeWindows {
    pub fn len(&self) -> usize {
        self.interictal.len() + self.ictal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cut and label every window of one segment.
pub fn extract_segment(
    series: ArrayView1<'_, f32>,
    start_time: i64,
    interval: SeizureInterval,
    params: &WindowParams,
) -> SegmentWindows {
    let seq = params.sequence_len;
    let n_w = params.window_count(series.len());

    let mut windows = Array3::<f32>::zeros((n_w, seq, 1));
    let mut labels = Array1::<u8>::zeros(n_w);
    let mut end_times = Array1::<i64>::zeros(n_w);

    for (w, idx) in params.right_edges(series.len()).enumerate() {
        windows
            .slice_mut(s![w, .., 0])
            .assign(&series.slice(s![idx - seq..idx]));
        let t = start_time + idx as i64 * params.sample_period;
        end_times[w] = t;
        labels[w] = u8::from(interval.contains(t));
    }

    SegmentWindows { windows, labels, end_times }
}

/// Extract both segments of one electrode.
///
/// Each segment is timed by its own start tick and its own sample index;
/// the ictal clock does not continue from the end of the interictal series.
pub fn extract(
    electrode_id: &str,
    interictal: ArrayView1<'_, f32>,
    ictal: ArrayView1<'_, f32>,
    interval: SeizureInterval,
    interictal_start: i64,
    ictal_start: i64,
    params: &WindowParams,
) -> ElectrodeWindows {
    ElectrodeWindows {
        electrode_id: electrode_id.to_string(),
        interictal: extract_segment(interictal, interictal_start, interval, params),
        ictal: extract_segment(ictal, ictal_start, interval, params),
    }
}

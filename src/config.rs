//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable parameter for conditioning,
//! windowing and splitting.  All fields have defaults that match the
//! recording the pipeline was built around.
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};

/// Absolute clock bounds of one recording segment.
///
/// Timestamps are integer ticks of the acquisition system's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentClock {
    pub start: i64,
    pub end: i64,
}

/// Anti-aliasing filter used by [`crate::decimate::decimate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimationFilter {
    /// 8th-order Chebyshev type I (0.05 dB ripple), cutoff at `0.8 / factor`
    /// of Nyquist, applied forward-backward.
    #[default]
    Iir,
    /// Hamming windowed-sinc with `20 · factor + 1` taps, cutoff at
    /// `1 / factor` of Nyquist, applied with zero-phase overlap-add.
    Fir,
}

/// Positional train / test / validation proportions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    pub train: f64,
    pub test: f64,
    pub val: f64,
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self { train: 0.8, test: 0.1, val: 0.1 }
    }
}

impl SplitFractions {
    /// Row counts `(train, test, val)` for a dataset of `n` rows.
    ///
    /// Train and test are truncated to integers; validation takes the rest.
    pub fn counts(&self, n: usize) -> (usize, usize, usize) {
        let n_train = ((self.train * n as f64) as usize).min(n);
        let n_test = ((self.test * n as f64) as usize).min(n - n_train);
        (n_train, n_test, n - n_train - n_test)
    }
}

/// Configuration for the full conditioning + dataset pipeline.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use ictal::PipelineConfig;
///
/// let cfg = PipelineConfig {
///     decimation_factor: 4,
///     step_size:         512,   // less overlap between windows
///     ..PipelineConfig::default()
/// };
/// assert!(cfg.validate().is_ok());
/// ```
///
/// Fields omitted from a JSON file keep their defaults, see
/// [`PipelineConfig::from_json_str`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Clock bounds of the interictal (baseline) segment.
    pub interictal: SegmentClock,

    /// Clock bounds of the ictal (seizure) segment.
    ///
    /// `ictal.start` also anchors the sentinel interval of unmarked
    /// electrodes.
    pub ictal: SegmentClock,

    /// Acquisition sampling rate in Hz.  Both segments must report it.
    ///
    /// Default: `1024.0` Hz.
    pub sample_rate: f32,

    /// Integer downsampling factor applied after filtering.  `1` disables
    /// decimation.
    ///
    /// Default: `10`.
    pub decimation_factor: usize,

    /// Anti-aliasing filter used for decimation.
    ///
    /// Default: [`DecimationFilter::Iir`].
    pub decimation_filter: DecimationFilter,

    /// Clock ticks between consecutive samples of the conditioned series.
    ///
    /// `None` derives it as `round(sample_rate) × decimation_factor`, the
    /// convention of the recording clock.
    pub sample_period: Option<i64>,

    /// Window length in samples (after decimation).
    ///
    /// Default: `1024`.
    pub sequence_len: usize,

    /// Stride between consecutive window right edges.  Smaller than
    /// `sequence_len` means overlapping windows.
    ///
    /// Default: `256`.
    pub step_size: usize,

    /// Band-pass lower cutoff in Hz.
    ///
    /// Default: `0.16` Hz.
    pub low_cut: f32,

    /// Band-pass upper cutoff in Hz.
    ///
    /// Default: `200.0` Hz.
    pub high_cut: f32,

    /// Butterworth prototype order of the band-pass.  The digital band-pass
    /// has twice this many poles.
    ///
    /// Default: `4`.
    pub filter_order: usize,

    /// Line-noise notch frequency in Hz.
    ///
    /// Default: `60.0` Hz.
    pub notch_freq: f32,

    /// Quality factor of the notch (`notch_freq / bandwidth`).
    ///
    /// Default: `30.0`.
    pub notch_q: f32,

    /// Positional split proportions; must sum to 1.
    pub split: SplitFractions,

    /// Text that stands for "no seizure activity" in the label table.
    ///
    /// Default: `"-"`.
    pub unmarked_placeholder: String,

    /// Standardize windows with the training split's global mean and std.
    ///
    /// Default: `false`.
    pub standardize: bool,
}

impl Default for PipelineConfig {
    /// Returns the settings of the HUP138 recording:
    /// 1024 Hz · 0.16–200 Hz band-pass · 60 Hz notch · ÷10 · 1024/256 windows
    /// · 80/10/10 split.
    fn default() -> Self {
        Self {
            interictal: SegmentClock { start: 407_898_590_000, end: 407_998_350_000 },
            ictal: SegmentClock { start: 416_039_606_029, end: 416_112_464_960 },
            sample_rate: 1024.0,
            decimation_factor: 10,
            decimation_filter: DecimationFilter::Iir,
            sample_period: None,
            sequence_len: 1024,
            step_size: 256,
            low_cut: 0.16,
            high_cut: 200.0,
            filter_order: 4,
            notch_freq: 60.0,
            notch_q: 30.0,
            split: SplitFractions::default(),
            unmarked_placeholder: "-".to_string(),
            standardize: false,
        }
    }
}

impl PipelineConfig {
    /// Parse a (possibly partial) JSON configuration.
    ///
    /// ```
    /// use ictal::PipelineConfig;
    /// let cfg = PipelineConfig::from_json_str(r#"{ "step_size": 128 }"#).unwrap();
    /// assert_eq!(cfg.step_size, 128);
    /// assert_eq!(cfg.sequence_len, 1024);
    /// ```
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Clock ticks per conditioned sample.
    ///
    /// ```
    /// use ictal::PipelineConfig;
    /// assert_eq!(PipelineConfig::default().sample_period(), 10_240);
    /// ```
    pub fn sample_period(&self) -> i64 {
        self.sample_period
            .unwrap_or(self.sample_rate.round() as i64 * self.decimation_factor as i64)
    }

    /// Sampling rate of the conditioned series.
    pub fn decimated_rate(&self) -> f32 {
        self.sample_rate / self.decimation_factor as f32
    }

    /// Check every parameter before any data is touched.
    ///
    /// Cutoffs are checked against the Nyquist frequency of
    /// [`PipelineConfig::sample_rate`].
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate > 0.0) {
            return Err(PrepError::InvalidConfig(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.decimation_factor == 0 {
            return Err(PrepError::InvalidConfig("decimation_factor must be at least 1".into()));
        }
        if self.sequence_len == 0 || self.step_size == 0 {
            return Err(PrepError::InvalidConfig(format!(
                "sequence_len and step_size must be positive, got {} and {}",
                self.sequence_len, self.step_size
            )));
        }
        if self.filter_order == 0 {
            return Err(PrepError::InvalidConfig("filter_order must be at least 1".into()));
        }
        if self.sample_period() <= 0 {
            return Err(PrepError::InvalidConfig(format!(
                "sample_period must be positive, got {}",
                self.sample_period()
            )));
        }
        if !(self.notch_q > 0.0) {
            return Err(PrepError::InvalidConfig(format!(
                "notch_q must be positive, got {}",
                self.notch_q
            )));
        }
        let s = &self.split;
        if [s.train, s.test, s.val].iter().any(|f| !(0.0..=1.0).contains(f))
            || (s.train + s.test + s.val - 1.0).abs() > 1e-6
        {
            return Err(PrepError::InvalidConfig(format!(
                "split fractions must lie in [0, 1] and sum to 1, got {}/{}/{}",
                s.train, s.test, s.val
            )));
        }
        crate::filter::check_band(self.low_cut, self.high_cut, self.sample_rate)?;
        crate::filter::check_notch(self.notch_freq, self.sample_rate)?;
        Ok(())
    }
}

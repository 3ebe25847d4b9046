//! # ictal: iEEG seizure-onset window datasets in pure Rust
//!
//! `ictal` turns a subject's interictal and ictal intracranial EEG
//! recordings plus a per-electrode seizure label table into fixed-length,
//! labeled, split training windows for seizure-onset classification.
//!
//! ## Pipeline overview
//!
//! ```text
//! interictal.safetensors  ictal.safetensors      labels.csv
//!   │                       │                      │
//!   ├─ condition::condition()  (per segment)       │
//!   │    ├─ Butterworth band-pass, zero-phase      │
//!   │    │   + first-sample realignment            │
//!   │    ├─ IIR notch, zero-phase                  │
//!   │    └─ decimate (anti-aliased, ÷ factor)      │
//!   │                                              │
//!   ├─ labels::LabelTable::resolve() ◄─────────────┘   per electrode
//!   ├─ window::extract()        right-edge windows, end-tick labels
//!   ├─ dataset::assemble()      electrode by electrode, interictal → ictal
//!   ├─ dataset::split()         positional train / test / val
//!   ├─ normalize::Standardizer  (optional, fitted on train)
//!   └─ weights::compute_class_weights()   on train labels
//!        │
//!        └─→ PreparedDataset { splits: [N, S, 1] f32 + u8 labels, class weights }
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use ictal::{build_dataset, PipelineConfig};
//! use ictal::io::{load_label_table, write_prepared, SafetensorsSource};
//! use std::path::Path;
//!
//! let cfg = PipelineConfig::default();
//! let source = SafetensorsSource {
//!     interictal: "data/interictal.safetensors".into(),
//!     ictal: "data/ictal.safetensors".into(),
//! };
//! let labels = load_label_table(Path::new("labels/hup138-labels.csv"), &cfg.unmarked_placeholder).unwrap();
//!
//! let prepared = build_dataset(&source, &labels, &cfg).unwrap();
//! println!("train windows: {:?}", prepared.splits.train.windows.dim());
//! write_prepared(&prepared, Path::new("out/hup138.safetensors")).unwrap();
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use ictal::condition::{apply_bandpass, apply_notch, bandpass_filter, notch_filter};
//! use ictal::decimate::decimate;
//! use ictal::window::{extract_segment, WindowParams};
//! use ictal::{DecimationFilter, SeizureInterval};
//! use ndarray::Array2;
//!
//! let mut data: Array2<f32> = Array2::zeros((8, 20_480)); // [C, T] @ 1024 Hz
//!
//! let bp = bandpass_filter(1024.0, 0.16, 200.0, 4).unwrap();
//! apply_bandpass(&mut data, &bp);
//! let notch = notch_filter(1024.0, 60.0, 30.0).unwrap();
//! apply_notch(&mut data, &notch);
//! let data = decimate(&data, 10, DecimationFilter::Iir); // [8, 2048] @ 102.4 Hz
//!
//! let params = WindowParams { sequence_len: 1024, step_size: 256, sample_period: 10_240 };
//! let interval = SeizureInterval { onset: 5_000_000, offset: 9_000_000 };
//! let windows = extract_segment(data.row(0), 0, interval, &params);
//! assert_eq!(windows.windows.dim(), (4, 1024, 1));
//! ```

pub mod condition;
pub mod config;
pub mod dataset;
pub mod decimate;
pub mod error;
pub mod filter;
pub mod io;
pub mod labels;
pub mod normalize;
pub mod recording;
pub mod weights;
pub mod window;

use rayon::prelude::*;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{DecimationFilter, PipelineConfig, SegmentClock, SplitFractions};

// errors
pub use error::{PrepError, Result};

// conditioning
pub use condition::condition;
pub use decimate::decimate;

// labels
pub use labels::{LabelRow, LabelTable, SeizureInterval, SeizureMark};

// recordings
pub use recording::{InMemorySource, Recording, RecordingSource, Segment};

// windows and datasets
pub use dataset::{assemble, split, Dataset, ElectrodeSpan, LabelCounts, Splits};
pub use normalize::Standardizer;
pub use weights::{compute_class_weights, ClassWeights};
pub use window::{extract, ElectrodeWindows, SegmentWindows, WindowParams};

/// Output of [`build_dataset`].
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub splits: Splits,
    /// Balanced weights over the training labels.
    pub class_weights: ClassWeights,
    /// Present when [`PipelineConfig::standardize`] is set.
    pub standardizer: Option<Standardizer>,
    /// Sampling rate of the windowed series (Hz).
    pub sfreq: f32,
}

/// Run the **full dataset pipeline** for one subject.
///
/// # Pipeline steps
///
/// 1. Validate `cfg`.
/// 2. Load both segments; each must be sampled at [`PipelineConfig::sample_rate`].
/// 3. Condition both segments (band-pass → notch → decimate).
/// 4. For every electrode in the label table, in first-appearance order,
///    resolve its seizure interval and cut labeled windows from both
///    segments. Electrodes absent from either segment are skipped.
/// 5. Concatenate electrode by electrode and split positionally.
/// 6. Optionally standardize with training statistics.
/// 7. Compute balanced class weights on the training labels.
///
/// # Errors
///
/// Every failure aborts the run: configuration and cutoff errors, a
/// recording too short to filter, any label that cannot be resolved, or a
/// training split holding a single class.
pub fn build_dataset<S>(
    source: &S,
    labels: &LabelTable,
    cfg: &PipelineConfig,
) -> Result<PreparedDataset>
where
    S: RecordingSource + ?Sized,
{
    cfg.validate()?;

    let interictal = load_checked(source, Segment::Interictal, cfg)?;
    let ictal = load_checked(source, Segment::Ictal, cfg)?;

    let interictal = condition(&interictal, cfg)?;
    let ictal = condition(&ictal, cfg)?;
    log::info!(
        "conditioned: interictal {} samples, ictal {} samples @ {} Hz",
        interictal.n_samples(),
        ictal.n_samples(),
        ictal.sfreq
    );

    let params = WindowParams::from_config(cfg);
    warn_past_end(Segment::Interictal, interictal.n_samples(), cfg.interictal, &params);
    warn_past_end(Segment::Ictal, ictal.n_samples(), cfg.ictal, &params);

    // Resolve every label up front so that any bad row aborts before work.
    let mut selected = Vec::new();
    for id in labels.electrode_ids() {
        let interval = labels.resolve(id, cfg.ictal.start)?;
        match (interictal.channel_index(id), ictal.channel_index(id)) {
            (Some(i), Some(j)) => selected.push((id, interval, i, j)),
            _ => log::warn!("electrode {id} is labeled but missing from the recording, skipped"),
        }
    }

    let parts: Vec<ElectrodeWindows> = selected
        .par_iter()
        .map(|&(id, interval, i, j)| {
            let ew = extract(
                id,
                interictal.data.row(i),
                ictal.data.row(j),
                interval,
                cfg.interictal.start,
                cfg.ictal.start,
                &params,
            );
            log::debug!(
                "electrode {id}: {} interictal + {} ictal windows, {} positive",
                ew.interictal.len(),
                ew.ictal.len(),
                ew.ictal
                    .labels
                    .iter()
                    .chain(ew.interictal.labels.iter())
                    .filter(|&&l| l == 1)
                    .count()
            );
            ew
        })
        .collect();

    let dataset = assemble(&parts, cfg.sequence_len)?;
    log::info!("assembled {} windows from {} electrodes", dataset.len(), parts.len());

    let mut splits = split(&dataset, &cfg.split);
    for (name, d) in [("train", &splits.train), ("test", &splits.test), ("val", &splits.val)] {
        let c = d.label_counts();
        log::info!(
            "{name}: {} windows ({} seizure, {} non-seizure)",
            d.len(),
            c.seizure,
            c.non_seizure
        );
    }

    let standardizer = cfg.standardize.then(|| {
        let st = Standardizer::fit(&splits.train.windows);
        for d in [&mut splits.train, &mut splits.test, &mut splits.val] {
            st.apply_inplace(&mut d.windows);
        }
        log::info!("standardized with train mean {} std {}", st.mean, st.std);
        st
    });

    let class_weights = compute_class_weights(splits.train.labels.view())?;
    log::info!("class weights: {:?}", class_weights.iter().collect::<Vec<_>>());

    Ok(PreparedDataset { splits, class_weights, standardizer, sfreq: ictal.sfreq })
}

fn load_checked<S>(source: &S, segment: Segment, cfg: &PipelineConfig) -> Result<Recording>
where
    S: RecordingSource + ?Sized,
{
    let rec = source.load(segment)?;
    if (rec.sfreq - cfg.sample_rate).abs() > 1e-3 {
        return Err(PrepError::InvalidConfig(format!(
            "{segment} recording is sampled at {} Hz, configuration says {} Hz",
            rec.sfreq, cfg.sample_rate
        )));
    }
    log::info!(
        "{segment}: {} ch × {} samples @ {} Hz",
        rec.n_channels(),
        rec.n_samples(),
        rec.sfreq
    );
    Ok(rec)
}

fn warn_past_end(segment: Segment, len: usize, clock: SegmentClock, params: &WindowParams) {
    if let Some(last) = params.right_edges(len).last() {
        let t = clock.start + last as i64 * params.sample_period;
        if t > clock.end {
            log::warn!("{segment}: last window ends at {t}, after the segment end {}", clock.end);
        }
    }
}

/// Shared helpers for synthetic recordings and label tables.
use ictal::{LabelRow, LabelTable, PipelineConfig, Recording, SegmentClock, SplitFractions};
use ndarray::Array2;
use std::f64::consts::PI;

pub const SFREQ: f32 = 1024.0;
pub const INTERICTAL_START: i64 = 407_898_590_000;
pub const ICTAL_START: i64 = 416_039_606_029;

#[allow(unused)]
/// `n_t` samples per named channel: two sines, 60 Hz line noise and a
/// per-channel DC offset.
pub fn recording(names: &[&str], n_t: usize, sfreq: f32) -> Recording {
    let data = Array2::from_shape_fn((names.len(), n_t), |(c, t)| {
        let t = t as f64 / sfreq as f64;
        let f = 3.0 + 2.0 * c as f64;
        (30.0 * (2.0 * PI * f * t).sin()
            + 5.0 * (2.0 * PI * 17.0 * t + c as f64).sin()
            + 4.0 * (2.0 * PI * 60.0 * t).sin()
            + 100.0 * c as f64) as f32
    });
    Recording::new(names.iter().map(|s| s.to_string()).collect(), data, sfreq).unwrap()
}

#[allow(unused)]
/// Pure tone of `freq` Hz on one channel.
pub fn tone(freq: f64, n_t: usize, sfreq: f32) -> Array2<f32> {
    Array2::from_shape_fn((1, n_t), |(_, t)| {
        (2.0 * PI * freq * t as f64 / sfreq as f64).sin() as f32
    })
}

#[allow(unused)]
/// 1024 Hz, no decimation, 1024-sample windows every 256 samples.
pub fn undecimated_config() -> PipelineConfig {
    PipelineConfig {
        interictal: SegmentClock { start: INTERICTAL_START, end: INTERICTAL_START + 2000 * 1024 },
        ictal: SegmentClock { start: ICTAL_START, end: ICTAL_START + 2000 * 1024 },
        sample_rate: SFREQ,
        decimation_factor: 1,
        sequence_len: 1024,
        step_size: 256,
        split: SplitFractions::default(),
        ..PipelineConfig::default()
    }
}

#[allow(unused)]
pub fn table(rows: &[(&str, &str, &str)]) -> LabelTable {
    LabelTable::new(
        rows.iter().map(|&(id, on, off)| LabelRow::new(id, on, off)).collect(),
        "-",
    )
}

#[allow(unused)]
/// Root-mean-square of a slice.
pub fn rms(x: &[f32]) -> f32 {
    (x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32).sqrt()
}

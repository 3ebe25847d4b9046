//! Signal conditioning: band-pass → notch → decimation.
//!
//! Each stage runs per channel and is zero-phase. Channels are independent
//! and filtered on the rayon pool; results are written back in channel
//! order, so output never depends on scheduling.
//!
//! After the band-pass every channel is shifted so that its first sample
//! equals the unfiltered first sample:
//!   `filtered += original[0] - filtered[0]`
use ndarray::Array2;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::decimate::{decimate, min_samples};
use crate::error::{PrepError, Result};
use crate::filter::{butter_bandpass, check_band, check_notch, iir_notch, sosfiltfilt, Sos};
use crate::recording::Recording;

/// Notch quality factor used when none is configured.
pub const DEFAULT_NOTCH_Q: f32 = 30.0;

/// Run every conditioning stage on `rec` and return the new recording at
/// `rec.sfreq / cfg.decimation_factor`.
///
/// # Errors
/// * [`PrepError::InvalidCutoff`] for band edges or a notch outside
///   `(0, Nyquist)` or an inverted band.
/// * [`PrepError::EmptyChannel`] if the recording is too short for any of
///   the three filters.
pub fn condition(rec: &Recording, cfg: &PipelineConfig) -> Result<Recording> {
    let bandpass = bandpass_filter(rec.sfreq, cfg.low_cut, cfg.high_cut, cfg.filter_order)?;
    let notch = notch_filter(rec.sfreq, cfg.notch_freq, cfg.notch_q)?;
    let required = bandpass
        .padlen()
        .max(notch.padlen())
        .max(min_samples(cfg.decimation_factor, cfg.decimation_filter));
    check_length(rec, required)?;

    log::debug!(
        "conditioning {} ch × {} samples: band-pass {}–{} Hz, notch {} Hz, ÷{}",
        rec.n_channels(),
        rec.n_samples(),
        cfg.low_cut,
        cfg.high_cut,
        cfg.notch_freq,
        cfg.decimation_factor
    );

    let mut data = rec.data.clone();
    apply_bandpass(&mut data, &bandpass);
    apply_notch(&mut data, &notch);
    let data = decimate(&data, cfg.decimation_factor, cfg.decimation_filter);

    Recording::new(
        rec.ch_names.clone(),
        data,
        rec.sfreq / cfg.decimation_factor.max(1) as f32,
    )
}

/// Design the band-pass after checking the cutoffs against `sfreq`.
pub fn bandpass_filter(sfreq: f32, low: f32, high: f32, order: usize) -> Result<Sos> {
    check_band(low, high, sfreq)?;
    Ok(butter_bandpass(order, low as f64, high as f64, sfreq as f64))
}

/// Design the notch after checking `freq` against `sfreq`.
pub fn notch_filter(sfreq: f32, freq: f32, q: f32) -> Result<Sos> {
    check_notch(freq, sfreq)?;
    Ok(iir_notch(freq as f64, q as f64, sfreq as f64))
}

/// Zero-phase band-pass of every channel of `data` ([C, T]) in place,
/// followed by first-sample realignment.
pub fn apply_bandpass(data: &mut Array2<f32>, sos: &Sos) {
    map_channels(data, |x| {
        let mut y = sosfiltfilt(sos, x);
        if let (Some(&x0), Some(&y0)) = (x.first(), y.first()) {
            let offset = x0 - y0;
            y.iter_mut().for_each(|v| *v += offset);
            // `y0 + (x0 - y0)` can round away from `x0`.
            y[0] = x0;
        }
        y
    });
}

/// Zero-phase notch of every channel of `data` ([C, T]) in place.
pub fn apply_notch(data: &mut Array2<f32>, sos: &Sos) {
    map_channels(data, |x| sosfiltfilt(sos, x));
}

fn map_channels<F>(data: &mut Array2<f32>, f: F)
where
    F: Fn(&[f64]) -> Vec<f64> + Sync,
{
    let view = data.view();
    let rows: Vec<Vec<f64>> = (0..view.nrows())
        .into_par_iter()
        .map(|ch| {
            let x: Vec<f64> = view.row(ch).iter().map(|&v| v as f64).collect();
            f(&x)
        })
        .collect();
    for (mut dst, src) in data.rows_mut().into_iter().zip(rows) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s as f32;
        }
    }
}

fn check_length(rec: &Recording, required: usize) -> Result<()> {
    if rec.n_samples() > required {
        return Ok(());
    }
    let channel = rec.ch_names.first().cloned().unwrap_or_default();
    Err(PrepError::EmptyChannel { channel, len: rec.n_samples(), required })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn recording(n_ch: usize, n_t: usize, sfreq: f32) -> Recording {
        let data = Array2::from_shape_fn((n_ch, n_t), |(c, t)| {
            let t = t as f64 / sfreq as f64;
            (5.0 * (2.0 * PI * 7.0 * t).sin()
                + 2.0 * (2.0 * PI * 60.0 * t).sin()
                + 100.0
                + c as f64) as f32
        });
        let names = (0..n_ch).map(|c| format!("E{c}")).collect();
        Recording::new(names, data, sfreq).unwrap()
    }

    #[test]
    fn first_sample_realigned_after_bandpass() {
        let rec = recording(3, 4096, 1024.0);
        let sos = bandpass_filter(1024.0, 0.16, 200.0, 4).unwrap();
        let mut data = rec.data.clone();
        apply_bandpass(&mut data, &sos);
        for c in 0..3 {
            assert_eq!(data[[c, 0]], rec.data[[c, 0]]);
        }
    }

    #[test]
    fn condition_is_deterministic() {
        let rec = recording(4, 4096, 1024.0);
        let cfg = PipelineConfig::default();
        let a = condition(&rec, &cfg).unwrap();
        let b = condition(&rec, &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.n_samples(), 410);
        approx::assert_abs_diff_eq!(a.sfreq, 102.4, epsilon = 1e-4);
    }

    #[test]
    fn short_channel_is_rejected() {
        let rec = recording(2, 27, 1024.0);
        let err = condition(&rec, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PrepError::EmptyChannel { len: 27, required: 27, .. }));
    }

    #[test]
    fn cutoff_above_nyquist_is_rejected() {
        let rec = recording(1, 4096, 256.0);
        let err = condition(&rec, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PrepError::InvalidCutoff(_)));
    }

    #[test]
    fn notch_removes_line_noise() {
        let sfreq = 1024.0;
        let n = 16_384;
        let mut data = Array2::from_shape_fn((1, n), |(_, t)| {
            (2.0 * PI * 60.0 * t as f64 / sfreq).sin() as f32
        });
        let sos = notch_filter(sfreq as f32, 60.0, DEFAULT_NOTCH_Q).unwrap();
        apply_notch(&mut data, &sos);
        let interior = data.slice(ndarray::s![0, 4096..12_288]);
        let peak = interior.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
        assert!(peak < 1e-3, "residual 60 Hz peak {peak}");
    }
}

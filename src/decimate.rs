//! Integer-factor decimation with an anti-aliasing low-pass.
//!
//! Matches `scipy.signal.decimate(x, q, zero_phase=True)`:
//!   1. low-pass at `0.8 / q` (IIR) or `1 / q` (FIR) of Nyquist, zero-phase
//!   2. keep every `q`-th sample starting at index 0
//!
//! Output length is `ceil(T / q)`.
use ndarray::Array2;
use rayon::prelude::*;

use crate::config::DecimationFilter;
use crate::filter::{cheby1_lowpass, decimation_fir, filter_1d, sosfiltfilt, Sos};

/// Chebyshev I order used by the IIR variant.
pub const IIR_ORDER: usize = 8;
/// Pass-band ripple (dB) of the IIR variant.
pub const IIR_RIPPLE_DB: f64 = 0.05;

/// Output length of decimating `n` samples by `factor`.
pub fn decimated_len(n: usize, factor: usize) -> usize {
    n.div_ceil(factor)
}

/// The IIR anti-aliasing filter for `factor`.
pub fn iir_antialias(factor: usize) -> Sos {
    cheby1_lowpass(IIR_ORDER, IIR_RIPPLE_DB, 0.8 / factor as f64)
}

/// Minimum channel length the anti-aliasing filter needs (exclusive).
///
/// Zero for the FIR variant, which pads internally.
pub fn min_samples(factor: usize, filter: DecimationFilter) -> usize {
    match filter {
        _ if factor <= 1 => 0,
        DecimationFilter::Iir => iir_antialias(factor).padlen(),
        DecimationFilter::Fir => 0,
    }
}

/// Decimate `data` ([C, T]) along time by `factor`.
///
/// `factor == 1` returns a copy. Channels are filtered in parallel and
/// written back in order.
pub fn decimate(data: &Array2<f32>, factor: usize, filter: DecimationFilter) -> Array2<f32> {
    if factor <= 1 {
        return data.clone();
    }
    let (n_ch, n_t) = data.dim();
    let n_out = decimated_len(n_t, factor);

    let rows: Vec<Vec<f32>> = match filter {
        DecimationFilter::Iir => {
            let sos = iir_antialias(factor);
            (0..n_ch)
                .into_par_iter()
                .map(|ch| {
                    let x: Vec<f64> = data.row(ch).iter().map(|&v| v as f64).collect();
                    stride(&sosfiltfilt(&sos, &x), factor)
                })
                .collect()
        }
        DecimationFilter::Fir => {
            let h = decimation_fir(factor);
            (0..n_ch)
                .into_par_iter()
                .map(|ch| {
                    let x: Vec<f64> = data.row(ch).iter().map(|&v| v as f64).collect();
                    stride(&filter_1d(&x, &h), factor)
                })
                .collect()
        }
    };

    let mut out = Array2::<f32>::zeros((n_ch, n_out));
    for (mut dst, src) in out.rows_mut().into_iter().zip(rows) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = s;
        }
    }
    out
}

fn stride(y: &[f64], factor: usize) -> Vec<f32> {
    y.iter().step_by(factor).map(|&v| v as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, sfreq: f64, n: usize) -> Array2<f32> {
        Array2::from_shape_fn((1, n), |(_, t)| (2.0 * PI * freq * t as f64 / sfreq).sin() as f32)
    }

    #[test]
    fn factor_one_is_identity() {
        let data = Array2::from_shape_fn((2, 100), |(c, t)| (c + t) as f32);
        assert_eq!(decimate(&data, 1, DecimationFilter::Iir), data);
    }

    #[test]
    fn output_length_is_ceil() {
        let data = Array2::zeros((3, 1001));
        assert_eq!(decimate(&data, 10, DecimationFilter::Iir).dim(), (3, 101));
        assert_eq!(decimate(&data, 10, DecimationFilter::Fir).dim(), (3, 101));
        assert_eq!(decimated_len(1000, 10), 100);
    }

    #[test]
    fn fir_preserves_dc() {
        let data = Array2::from_elem((1, 2048), 3.25_f32);
        let out = decimate(&data, 4, DecimationFilter::Fir);
        for &v in out.iter() {
            approx::assert_abs_diff_eq!(v, 3.25, epsilon = 1e-4);
        }
    }

    #[test]
    fn iir_dc_within_ripple() {
        let data = Array2::from_elem((1, 2048), 1.0_f32);
        let out = decimate(&data, 4, DecimationFilter::Iir);
        // Two passes through a 0.05 dB ripple floor.
        for &v in out.iter() {
            assert!(v > 0.985 && v < 1.0001, "v = {v}");
        }
    }

    #[test]
    fn slow_sine_survives() {
        let sfreq = 1024.0;
        let data = tone(2.0, sfreq, 8192);
        for filter in [DecimationFilter::Iir, DecimationFilter::Fir] {
            let out = decimate(&data, 8, filter);
            for k in 100..900 {
                let t = (k * 8) as f64 / sfreq;
                let expected = (2.0 * PI * 2.0 * t).sin() as f32;
                assert!((out[[0, k]] - expected).abs() < 2e-2, "{filter:?} k={k}");
            }
        }
    }

    #[test]
    fn iir_rejects_aliasing_tone() {
        // 400 Hz would alias to 9.6 Hz at 102.4 Hz without filtering.
        let data = tone(400.0, 1024.0, 20_480);
        let out = decimate(&data, 10, DecimationFilter::Iir);
        let interior = out.slice(ndarray::s![0, 200..1800]);
        let rms = (interior.iter().map(|v| v * v).sum::<f32>() / interior.len() as f32).sqrt();
        assert!(rms < 1e-3, "aliased rms {rms}");
    }
}

//! Overlap-add zero-phase FIR convolution.
//!
//! Zero-phase is achieved by shifting the output left by `(N-1)/2` samples,
//! not by running the filter twice. The edge transient is suppressed by
//! odd-reflection padding of `N-1` samples on each side.
use rustfft::{num_complex::Complex, FftPlanner};

/// Filter a single 1-D signal with the overlap-add algorithm.
///
/// Returns a vector of the same length as `x`.
pub fn filter_1d(x: &[f64], h: &[f64]) -> Vec<f64> {
    let n_x = x.len();
    let n_h = h.len();

    if n_x == 0 || n_h == 0 {
        return x.to_vec();
    }

    let shift = (n_h - 1) / 2;
    let n_edge = n_h - 1;

    let x_ext = odd_extend(x, n_edge, n_edge);
    let n_ext = x_ext.len();

    let n_fft = choose_fft_len(n_h, n_ext);
    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(n_fft);
    let fft_inv = planner.plan_fft_inverse(n_fft);

    let mut h_fft = zero_padded(h, n_fft);
    fft_fwd.process(&mut h_fft);

    let n_seg = n_fft - n_h + 1;
    let n_segments = n_ext.div_ceil(n_seg);
    let mut x_filtered = vec![0.0_f64; n_ext];
    let inv_scale = 1.0 / n_fft as f64;

    for seg_idx in 0..n_segments {
        let start = seg_idx * n_seg;
        let stop = (start + n_seg).min(n_ext);

        let mut buf = zero_padded(&x_ext[start..stop], n_fft);
        fft_fwd.process(&mut buf);
        for (b, &hf) in buf.iter_mut().zip(h_fft.iter()) {
            *b *= hf;
        }
        fft_inv.process(&mut buf);

        // Accumulate, shifted left by the group delay.
        let out_start = start.saturating_sub(shift);
        let out_end = (out_start + n_fft).min(n_ext);
        let prod_start = shift.saturating_sub(start);

        for (o, p) in (out_start..out_end).zip(prod_start..n_fft) {
            x_filtered[o] += buf[p].re * inv_scale;
        }
    }

    x_filtered[n_edge..n_edge + n_x].to_vec()
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Odd-reflection padding around the end samples.
///
/// Left:  `pad[i] = 2*x[0] - x[n_l-i]`  for i in 0..n_l
/// Right: `pad[i] = 2*x[-1] - x[-(i+2)]` for i in 0..n_r
///
/// Requests longer than `len(x) - 1` are filled with zeros beyond the
/// reflectable part.
pub(crate) fn odd_extend(x: &[f64], n_l: usize, n_r: usize) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return vec![0.0; n_l + n_r];
    }
    let actual_l = n_l.min(n - 1);
    let actual_r = n_r.min(n - 1);

    let mut out = Vec::with_capacity(n_l + n + n_r);
    out.resize(n_l - actual_l, 0.0);
    for i in (1..=actual_l).rev() {
        out.push(2.0 * x[0] - x[i]);
    }

    out.extend_from_slice(x);

    let last = x[n - 1];
    for i in 1..=actual_r {
        out.push(2.0 * last - x[n - 1 - i]);
    }
    out.resize(n_l + n + n_r, 0.0);
    out
}

/// Choose the FFT block size (power of 2 minimising operation count).
///
///   `cost = ceil(n_x / (N - n_h + 1)) * N * (log2(N) + 1) + 4e-5 * N * n_x`
fn choose_fft_len(n_h: usize, n_x: usize) -> usize {
    let min_fft = 2 * n_h - 1;

    let max_pow = (n_x.max(min_fft) as f64).log2().ceil() as u32 + 1;
    let min_pow = (min_fft as f64).log2().ceil() as u32;

    let mut best_n = 1_usize << max_pow;
    let mut best_cost = f64::INFINITY;

    for pow in min_pow..=max_pow {
        let n = 1_usize << pow;
        if n < min_fft {
            continue;
        }
        let n_seg = (n - n_h + 1) as f64;
        let cost = (n_x as f64 / n_seg).ceil() * n as f64 * (pow as f64 + 1.0)
            + 4e-5 * n as f64 * n_x as f64;
        if cost < best_cost {
            best_cost = cost;
            best_n = n;
        }
    }
    best_n
}

fn zero_padded(x: &[f64], n_fft: usize) -> Vec<Complex<f64>> {
    x.iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n_fft)
        .collect()
}

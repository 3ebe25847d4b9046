//! Windowed-sinc FIR design matching `scipy.signal.firwin`.
//!
//! Used for the FIR anti-aliasing variant of decimation:
//!   • `20 · q + 1` taps for a factor `q`
//!   • cutoff at `1 / q` of Nyquist
//!   • Hamming window, unit DC gain
use std::f64::consts::PI;

/// Design a low-pass FIR filter of `n` taps with a Hamming-windowed sinc.
///
/// `cutoff_hz` is the -6 dB point. The taps are scaled to unit DC gain.
pub fn firwin(n: usize, cutoff_hz: f64, sfreq: f64) -> Vec<f64> {
    debug_assert!(n % 2 == 1, "firwin requires odd N for linear-phase filter");
    let alpha = (n - 1) as f64 / 2.0;
    let fc = cutoff_hz / (sfreq / 2.0);

    let win = hamming(n);

    let mut h: Vec<f64> = (0..n)
        .map(|i| {
            let x = i as f64 - alpha;
            // f(x) = sin(π·fc·x) / (π·x);  lim_{x→0} f(x) = fc
            let sinc = if x == 0.0 { fc } else { (PI * fc * x).sin() / (PI * x) };
            sinc * win[i]
        })
        .collect();

    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    h
}

/// Hamming window of length `n`.
pub fn hamming(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / (n - 1) as f64).cos())
        .collect()
}

/// Anti-aliasing low-pass for decimation by `factor`.
///
/// Same as `scipy.signal.decimate(..., ftype='fir')`: `firwin(20q + 1, 1/q)`.
pub fn decimation_fir(factor: usize) -> Vec<f64> {
    let n = 20 * factor + 1;
    // Normalized to Nyquist, so sfreq = 2 makes cutoff_hz = 1/q.
    firwin(n, 1.0 / factor as f64, 2.0)
}

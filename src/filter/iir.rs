//! IIR design in second-order sections and forward-backward application.
//!
//! Designs follow the analog-prototype route of `scipy.signal.iirfilter`:
//!   1. normalized prototype zeros/poles/gain (Butterworth or Chebyshev I)
//!   2. pre-warp the digital cutoffs: `w = 4 · tan(π · Wn / 2)`  (fs = 2)
//!   3. frequency transform (low-pass → low-pass / band-pass)
//!   4. bilinear transform, zeros at infinity map to `z = -1`
//!   5. pair conjugate roots into biquads
//!
//! Coefficients are never expanded into a single high-order polynomial; at
//! the band edges used for iEEG (0.16 Hz at 1 kHz) that form loses all
//! precision.
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

use super::apply::odd_extend;

/// One second-order section, `a[0] == 1`.
///
/// `H(z) = (b0 + b1·z⁻¹ + b2·z⁻²) / (1 + a1·z⁻¹ + a2·z⁻²)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    /// Steady-state transposed-direct-form-II state for a unit step input.
    ///
    /// Same as `scipy.signal.lfilter_zi(b, a)` for a biquad.
    fn step_state(&self) -> [f64; 2] {
        let g = self.dc_gain();
        let z2 = self.b[2] - self.a[2] * g;
        let z1 = self.b[1] - self.a[1] * g + z2;
        [z1, z2]
    }
}

/// Cascade of biquads.
#[derive(Debug, Clone, PartialEq)]
pub struct Sos {
    pub sections: Vec<Biquad>,
}

impl Sos {
    pub fn n_sections(&self) -> usize {
        self.sections.len()
    }

    /// Edge extension used by [`sosfiltfilt`]: `3 · ntaps`.
    ///
    /// `ntaps = 2 · n_sections + 1`, less the number of sections whose
    /// numerator and denominator are both only first order.
    pub fn padlen(&self) -> usize {
        let n = self.sections.len();
        let b_first = self.sections.iter().filter(|s| s.b[2] == 0.0).count();
        let a_first = self.sections.iter().filter(|s| s.a[2] == 0.0).count();
        3 * (2 * n + 1 - b_first.min(a_first))
    }

    /// Gain at DC (`z = 1`).
    pub fn dc_gain(&self) -> f64 {
        self.sections.iter().map(Biquad::dc_gain).product()
    }

    /// Magnitude response at `freq` Hz for sampling rate `sfreq`.
    pub fn magnitude_at(&self, freq: f64, sfreq: f64) -> f64 {
        let w = 2.0 * PI * freq / sfreq;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        self.sections
            .iter()
            .map(|s| {
                let num = s.b[0] + z1 * s.b[1] + z2 * s.b[2];
                let den = s.a[0] + z1 * s.a[1] + z2 * s.a[2];
                (num / den).norm()
            })
            .product()
    }

    /// Per-section initial state for a step of height 1 (`sosfilt_zi`).
    pub fn step_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|s| {
                let [z1, z2] = s.step_state();
                let zi = [scale * z1, scale * z2];
                scale *= s.dc_gain();
                zi
            })
            .collect()
    }

    /// Filter `x` in place starting from `state`, which is updated.
    pub fn filter_inplace(&self, x: &mut [f64], state: &mut [[f64; 2]]) {
        for (s, z) in self.sections.iter().zip(state.iter_mut()) {
            let [b0, b1, b2] = s.b;
            let [_, a1, a2] = s.a;
            for v in x.iter_mut() {
                let input = *v;
                let y = b0 * input + z[0];
                z[0] = b1 * input - a1 * y + z[1];
                z[1] = b2 * input - a2 * y;
                *v = y;
            }
        }
    }
}

/// Zero-phase forward-backward filtering, matching `scipy.signal.sosfiltfilt`
/// with `padtype='odd'` and the default pad length.
///
/// Callers are expected to supply more than [`Sos::padlen`] samples; shorter
/// input gets a proportionally shorter extension.
pub fn sosfiltfilt(sos: &Sos, x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return vec![];
    }
    let edge = sos.padlen().min(n - 1);
    let mut ext = odd_extend(x, edge, edge);
    let zi = sos.step_state();

    let x0 = ext[0];
    let mut state: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * x0, z[1] * x0]).collect();
    sos.filter_inplace(&mut ext, &mut state);

    ext.reverse();
    let y0 = ext[0];
    let mut state: Vec<[f64; 2]> = zi.iter().map(|z| [z[0] * y0, z[1] * y0]).collect();
    sos.filter_inplace(&mut ext, &mut state);
    ext.reverse();

    ext[edge..edge + n].to_vec()
}

// ── Design ──────────────────────────────────────────────────────────────────

/// Band-pass Butterworth of prototype order `order` (digital order `2·order`).
///
/// `low` / `high` are in Hz; both must lie strictly inside `(0, sfreq/2)`.
/// Callers validate with [`super::check_band`].
pub fn butter_bandpass(order: usize, low: f64, high: f64, sfreq: f64) -> Sos {
    let nyq = sfreq / 2.0;
    let wl = prewarp(low / nyq);
    let wh = prewarp(high / nyq);
    let bw = wh - wl;
    let wo = (wl * wh).sqrt();

    let (z, p, k) = lp_to_bp(&[], &butter_prototype(order), 1.0, wo, bw);
    let (z, p, k) = bilinear(&z, &p, k);
    zpk_to_sos(&z, &p, k)
}

/// Low-pass Chebyshev type I with `ripple_db` pass-band ripple.
///
/// `cutoff` is normalized to Nyquist, `0 < cutoff < 1`.
pub fn cheby1_lowpass(order: usize, ripple_db: f64, cutoff: f64) -> Sos {
    let wo = prewarp(cutoff);
    let (z, p, k) = cheby1_prototype(order, ripple_db);
    let degree = (p.len() - z.len()) as i32;
    let z: Vec<Complex64> = z.iter().map(|&v| v * wo).collect();
    let p: Vec<Complex64> = p.iter().map(|&v| v * wo).collect();
    let k = k * wo.powi(degree);
    let (z, p, k) = bilinear(&z, &p, k);
    zpk_to_sos(&z, &p, k)
}

/// Second-order IIR notch at `freq` Hz with quality factor `q`.
///
/// Matches `scipy.signal.iirnotch(freq, q, fs=sfreq)`: unit gain at DC and
/// Nyquist, `-3 dB` bandwidth `freq / q`.
pub fn iir_notch(freq: f64, q: f64, sfreq: f64) -> Sos {
    let w0 = 2.0 * PI * freq / sfreq;
    let bw = w0 / q;
    let beta = (bw / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);
    let cos_w0 = w0.cos();
    Sos {
        sections: vec![Biquad {
            b: [gain, -2.0 * gain * cos_w0, gain],
            a: [1.0, -2.0 * gain * cos_w0, 2.0 * gain - 1.0],
        }],
    }
}

/// Bilinear pre-warp of a Nyquist-normalized frequency (fs = 2).
fn prewarp(wn: f64) -> f64 {
    4.0 * (PI * wn / 2.0).tan()
}

/// Analog Butterworth prototype poles: `-exp(jπm / 2N)`, `m = -N+1, -N+3, …, N-1`.
fn butter_prototype(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|i| {
            let m = -n + 1.0 + 2.0 * i as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * n))
        })
        .collect()
}

/// Analog Chebyshev I prototype `(zeros, poles, gain)`.
fn cheby1_prototype(order: usize, ripple_db: f64) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let n = order as f64;
    let eps = (10f64.powf(0.1 * ripple_db) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / n;
    let p: Vec<Complex64> = (0..order)
        .map(|i| {
            let m = -n + 1.0 + 2.0 * i as f64;
            let theta = PI * m / (2.0 * n);
            -(Complex64::new(mu, theta)).sinh()
        })
        .collect();
    let mut k = p.iter().map(|&v| -v).product::<Complex64>().re;
    if order % 2 == 0 {
        k /= (1.0 + eps * eps).sqrt();
    }
    (vec![], p, k)
}

/// Low-pass → band-pass transform around `wo` with bandwidth `bw`.
fn lp_to_bp(
    z: &[Complex64],
    p: &[Complex64],
    k: f64,
    wo: f64,
    bw: f64,
) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let degree = p.len() - z.len();
    let wo2 = Complex64::new(wo * wo, 0.0);
    let split = |roots: &[Complex64]| -> Vec<Complex64> {
        let half: Vec<Complex64> = roots.iter().map(|&r| r * (bw / 2.0)).collect();
        let plus = half.iter().map(|&h| h + (h * h - wo2).sqrt());
        let minus = half.iter().map(|&h| h - (h * h - wo2).sqrt());
        plus.chain(minus).collect()
    };
    let mut z_bp = split(z);
    z_bp.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    (z_bp, split(p), k * bw.powi(degree as i32))
}

/// Bilinear transform with fs = 2.
fn bilinear(z: &[Complex64], p: &[Complex64], k: f64) -> (Vec<Complex64>, Vec<Complex64>, f64) {
    let fs2 = Complex64::new(4.0, 0.0);
    let degree = p.len() - z.len();
    let z_d: Vec<Complex64> = z
        .iter()
        .map(|&v| (fs2 + v) / (fs2 - v))
        .chain(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree))
        .collect();
    let p_d: Vec<Complex64> = p.iter().map(|&v| (fs2 + v) / (fs2 - v)).collect();
    let num: Complex64 = z.iter().map(|&v| fs2 - v).product();
    let den: Complex64 = p.iter().map(|&v| fs2 - v).product();
    (z_d, p_d, k * (num / den).re)
}

/// Quadratic factors `[1, c1, c2]` of a conjugate-symmetric root set.
///
/// Complex roots pair with their conjugates (ordered farthest from the unit
/// circle first); real roots pair smallest with largest.
fn quadratics(roots: &[Complex64]) -> Vec<[f64; 3]> {
    let is_real = |r: &Complex64| r.im.abs() <= 1e-10 * r.norm().max(1.0);
    let mut upper: Vec<Complex64> = roots
        .iter()
        .filter(|r| !is_real(r) && r.im > 0.0)
        .copied()
        .collect();
    let mut real: Vec<f64> = roots.iter().filter(|r| is_real(r)).map(|r| r.re).collect();
    upper.sort_by(|a, b| a.norm().total_cmp(&b.norm()));
    real.sort_by(f64::total_cmp);

    let mut quads: Vec<[f64; 3]> = upper.iter().map(|r| [1.0, -2.0 * r.re, r.norm_sqr()]).collect();
    let (mut lo, mut hi) = (0, real.len());
    while hi - lo >= 2 {
        let (r1, r2) = (real[lo], real[hi - 1]);
        quads.push([1.0, -(r1 + r2), r1 * r2]);
        lo += 1;
        hi -= 1;
    }
    if hi - lo == 1 {
        quads.push([1.0, -real[lo], 0.0]);
    }
    quads
}

fn zpk_to_sos(z: &[Complex64], p: &[Complex64], k: f64) -> Sos {
    let mut num = quadratics(z);
    let mut den = quadratics(p);
    let n = num.len().max(den.len()).max(1);
    num.resize(n, [1.0, 0.0, 0.0]);
    den.resize(n, [1.0, 0.0, 0.0]);
    for c in num[0].iter_mut() {
        *c *= k;
    }
    Sos {
        sections: num.into_iter().zip(den).map(|(b, a)| Biquad { b, a }).collect(),
    }
}

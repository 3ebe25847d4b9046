//! Filter design and application.
//!
//! - [`iir`]: Butterworth band-pass, Chebyshev I low-pass and second-order
//!   notch designs as second-order sections, plus forward-backward
//!   ([`sosfiltfilt`]) zero-phase application.
//! - [`design`]: Hamming-windowed sinc FIR design for FIR decimation.
//! - [`apply`]: Overlap-add zero-phase FIR convolution.

pub mod apply;
pub mod design;
pub mod iir;

pub use apply::filter_1d;
pub use design::{decimation_fir, firwin, hamming};
pub use iir::{butter_bandpass, cheby1_lowpass, iir_notch, sosfiltfilt, Biquad, Sos};

use crate::error::{PrepError, Result};

/// Check band-pass cutoffs: `0 < low < high < sfreq / 2`.
pub fn check_band(low: f32, high: f32, sfreq: f32) -> Result<()> {
    let nyq = sfreq / 2.0;
    if !(low > 0.0) {
        return Err(PrepError::InvalidCutoff(format!("low cutoff must be positive, got {low} Hz")));
    }
    if low >= high {
        return Err(PrepError::InvalidCutoff(format!(
            "low cutoff {low} Hz must be below high cutoff {high} Hz"
        )));
    }
    if high >= nyq {
        return Err(PrepError::InvalidCutoff(format!(
            "high cutoff {high} Hz must be below Nyquist ({nyq} Hz)"
        )));
    }
    Ok(())
}

/// Check a notch frequency: `0 < freq < sfreq / 2`.
pub fn check_notch(freq: f32, sfreq: f32) -> Result<()> {
    let nyq = sfreq / 2.0;
    if !(freq > 0.0 && freq < nyq) {
        return Err(PrepError::InvalidCutoff(format!(
            "notch frequency {freq} Hz must lie in (0, {nyq}) Hz"
        )));
    }
    Ok(())
}

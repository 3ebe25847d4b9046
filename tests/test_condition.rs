mod common;
use common::{recording, rms, tone, SFREQ};
use ictal::condition::{apply_bandpass, apply_notch, bandpass_filter, notch_filter};
use ictal::{condition, DecimationFilter, PipelineConfig, PrepError};
use ndarray::s;

// ── Determinism ───────────────────────────────────────────────────────────────

#[test]
fn condition_is_bit_identical_across_runs() {
    let rec = recording(&["LA1", "LA2", "LB1", "LB2", "RC3"], 20_480, SFREQ);
    let cfg = PipelineConfig::default();
    let a = condition(&rec, &cfg).unwrap();
    let b = condition(&rec, &cfg).unwrap();
    assert_eq!(a.data, b.data);
}

#[test]
fn condition_does_not_depend_on_thread_count() {
    let rec = recording(&["LA1", "LA2", "LB1", "LB2", "RC3", "RC4"], 8192, SFREQ);
    let cfg = PipelineConfig::default();
    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| condition(&rec, &cfg).unwrap());
    let pooled = condition(&rec, &cfg).unwrap();
    assert_eq!(single.data, pooled.data);
}

#[test]
fn channels_are_filtered_independently() {
    let both = recording(&["A", "B"], 8192, SFREQ);
    let only_b = ictal::Recording::new(
        vec!["B".into()],
        both.data.slice(s![1..2, ..]).to_owned(),
        SFREQ,
    )
    .unwrap();
    let cfg = PipelineConfig::default();
    let out_both = condition(&both, &cfg).unwrap();
    let out_b = condition(&only_b, &cfg).unwrap();
    assert_eq!(out_both.data.row(1), out_b.data.row(0));
    assert_eq!(out_both.ch_names, both.ch_names);
}

// ── Band-pass ─────────────────────────────────────────────────────────────────

#[test]
fn first_sample_is_restored_exactly() {
    let rec = recording(&["A", "B", "C"], 4096, SFREQ);
    let sos = bandpass_filter(SFREQ, 0.16, 200.0, 4).unwrap();
    let mut data = rec.data.clone();
    apply_bandpass(&mut data, &sos);
    for c in 0..3 {
        assert_eq!(data[[c, 0]], rec.data[[c, 0]], "channel {c}");
    }
}

/// Amplitude of the `freq` Hz component of `x`, by projection onto a complex
/// exponential. `x` must span a whole number of periods.
fn tone_amplitude(x: &[f32], freq: f64, sfreq: f32) -> f64 {
    let w = 2.0 * std::f64::consts::PI * freq / sfreq as f64;
    let (re, im) = x.iter().enumerate().fold((0.0, 0.0), |(re, im), (n, &v)| {
        let v = v as f64;
        (re + v * (w * n as f64).cos(), im - v * (w * n as f64).sin())
    });
    2.0 * (re * re + im * im).sqrt() / x.len() as f64
}

#[test]
fn bandpass_attenuates_out_of_band_tone() {
    let sos = bandpass_filter(SFREQ, 0.16, 200.0, 4).unwrap();
    assert!(sos.magnitude_at(400.0, SFREQ as f64) < 1e-2);
    approx::assert_abs_diff_eq!(sos.magnitude_at(20.0, SFREQ as f64), 1.0, epsilon = 1e-3);

    let mut pass = tone(20.0, 16_384, SFREQ);
    let mut stop = tone(400.0, 16_384, SFREQ);
    apply_bandpass(&mut pass, &sos);
    apply_bandpass(&mut stop, &sos);
    // 8192 samples hold exactly 160 periods of 20 Hz and 3200 of 400 Hz, so
    // the slow low-edge transient and the realignment offset do not leak
    // into either bin.
    let pass_amp = tone_amplitude(&pass.slice(s![0, 4096..12_288]).to_vec(), 20.0, SFREQ);
    let stop_amp = tone_amplitude(&stop.slice(s![0, 4096..12_288]).to_vec(), 400.0, SFREQ);
    approx::assert_abs_diff_eq!(pass_amp, 1.0, epsilon = 1e-2);
    assert!(stop_amp < 1e-3, "400 Hz amplitude {stop_amp}");
}

#[test]
fn notch_leaves_neighbouring_bands() {
    let sos = notch_filter(SFREQ, 60.0, 30.0).unwrap();
    let mut line = tone(60.0, 16_384, SFREQ);
    let mut alpha = tone(10.0, 16_384, SFREQ);
    apply_notch(&mut line, &sos);
    apply_notch(&mut alpha, &sos);
    assert!(rms(&line.slice(s![0, 4096..12_288]).to_vec()) < 1e-3);
    approx::assert_abs_diff_eq!(
        rms(&alpha.slice(s![0, 4096..12_288]).to_vec()),
        std::f32::consts::FRAC_1_SQRT_2,
        epsilon = 1e-3
    );
}

// ── Decimation through condition() ───────────────────────────────────────────

#[test]
fn decimated_rate_and_length() {
    let rec = recording(&["A"], 10_001, SFREQ);
    for filter in [DecimationFilter::Iir, DecimationFilter::Fir] {
        let cfg = PipelineConfig { decimation_filter: filter, ..PipelineConfig::default() };
        let out = condition(&rec, &cfg).unwrap();
        assert_eq!(out.n_samples(), 1001, "{filter:?}");
        approx::assert_abs_diff_eq!(out.sfreq, 102.4, epsilon = 1e-4);
    }
}

#[test]
fn factor_one_keeps_length() {
    let rec = recording(&["A"], 2000, SFREQ);
    let cfg = PipelineConfig { decimation_factor: 1, ..PipelineConfig::default() };
    let out = condition(&rec, &cfg).unwrap();
    assert_eq!(out.n_samples(), 2000);
    assert_eq!(out.sfreq, SFREQ);
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[test]
fn inverted_band_is_invalid_cutoff() {
    let rec = recording(&["A"], 4096, SFREQ);
    let cfg = PipelineConfig { low_cut: 200.0, high_cut: 0.16, ..PipelineConfig::default() };
    assert!(matches!(condition(&rec, &cfg), Err(PrepError::InvalidCutoff(_))));
}

#[test]
fn notch_above_nyquist_is_invalid_cutoff() {
    let rec = recording(&["A"], 4096, SFREQ);
    let cfg = PipelineConfig { notch_freq: 600.0, ..PipelineConfig::default() };
    assert!(matches!(condition(&rec, &cfg), Err(PrepError::InvalidCutoff(_))));
}

#[test]
fn too_short_channel_is_empty_channel() {
    let rec = recording(&["LA1"], 20, SFREQ);
    match condition(&rec, &PipelineConfig::default()) {
        Err(PrepError::EmptyChannel { channel, len, .. }) => {
            assert_eq!(channel, "LA1");
            assert_eq!(len, 20);
        }
        other => panic!("expected EmptyChannel, got {other:?}"),
    }
}

/// pipeline_steps: read one segment file, run each conditioning step, write
/// every intermediate array to a safetensors file for comparison against a
/// reference implementation (e.g. scipy.signal).
///
/// Output keys:
///   raw          [C, T]          f32  input samples
///   bandpass     [C, T]          f32  after zero-phase band-pass + realignment
///   notch        [C, T]          f32  after zero-phase notch
///   decimated    [C, ceil(T/q)]  f32  after anti-aliased decimation
///   bandpass_sos [n, 6]          f64  b0 b1 b2 a0 a1 a2 per section
///   notch_sos    [n, 6]          f64
///   sfreq        [1]             f32  input rate
///   sfreq_out    [1]             f32  decimated rate
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use ictal::{
    condition::{apply_bandpass, apply_notch, bandpass_filter, notch_filter},
    decimate::decimate,
    filter::Sos,
    io::{load_recording, StWriter},
    DecimationFilter,
};

#[derive(Parser, Debug)]
#[command(name = "pipeline_steps")]
struct Args {
    /// Input segment file.
    #[arg(long)]
    input: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Band-pass lower cutoff (Hz).
    #[arg(long, default_value_t = 0.16_f32)]
    low: f32,

    /// Band-pass upper cutoff (Hz).
    #[arg(long, default_value_t = 200.0_f32)]
    high: f32,

    /// Butterworth prototype order.
    #[arg(long, default_value_t = 4)]
    order: usize,

    /// Notch frequency (Hz).
    #[arg(long, default_value_t = 60.0_f32)]
    notch: f32,

    /// Notch quality factor.
    #[arg(long, default_value_t = ictal::condition::DEFAULT_NOTCH_Q)]
    notch_q: f32,

    /// Decimation factor.
    #[arg(long, default_value_t = 10)]
    factor: usize,

    /// Use the FIR anti-aliasing filter instead of the Chebyshev IIR.
    #[arg(long)]
    fir: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
    let args = Args::parse();

    // ── 1. Read segment ────────────────────────────────────────────────────
    let t_read = now();
    let rec = load_recording(&args.input)?;
    let ms_read = t_read.elapsed().as_secs_f64() * 1000.0;
    let (n_ch, n_t) = rec.data.dim();

    // ── 2. Band-pass ───────────────────────────────────────────────────────
    let t_bp = now();
    let bp = bandpass_filter(rec.sfreq, args.low, args.high, args.order)?;
    let mut data_bp = rec.data.clone();
    apply_bandpass(&mut data_bp, &bp);
    let ms_bp = t_bp.elapsed().as_secs_f64() * 1000.0;

    // ── 3. Notch ───────────────────────────────────────────────────────────
    let t_notch = now();
    let notch = notch_filter(rec.sfreq, args.notch, args.notch_q)?;
    let mut data_notch = data_bp.clone();
    apply_notch(&mut data_notch, &notch);
    let ms_notch = t_notch.elapsed().as_secs_f64() * 1000.0;

    // ── 4. Decimate ────────────────────────────────────────────────────────
    let t_dec = now();
    let filter = if args.fir { DecimationFilter::Fir } else { DecimationFilter::Iir };
    let data_dec = decimate(&data_notch, args.factor, filter);
    let ms_dec = t_dec.elapsed().as_secs_f64() * 1000.0;
    let sfreq_out = rec.sfreq / args.factor.max(1) as f32;

    log::info!(
        "TIMING read={ms_read:.4}ms bandpass={ms_bp:.4}ms notch={ms_notch:.4}ms decimate={ms_dec:.4}ms"
    );
    log::info!("  {n_ch} ch × {n_t} samples  {} Hz → {sfreq_out} Hz", rec.sfreq);

    // ── 5. Write output ────────────────────────────────────────────────────
    let mut w = StWriter::new();
    w.add_f32_arr2("raw", &rec.data);
    w.add_f32_arr2("bandpass", &data_bp);
    w.add_f32_arr2("notch", &data_notch);
    w.add_f32_arr2("decimated", &data_dec);
    add_sos(&mut w, "bandpass_sos", &bp);
    add_sos(&mut w, "notch_sos", &notch);
    w.add_f32("sfreq", &[rec.sfreq], &[1]);
    w.add_f32("sfreq_out", &[sfreq_out], &[1]);
    w.write(&args.output)?;

    log::info!("written → {}", args.output.display());
    Ok(())
}

fn add_sos(w: &mut StWriter, name: &str, sos: &Sos) {
    let coeffs: Vec<f64> = sos
        .sections
        .iter()
        .flat_map(|s| s.b.iter().chain(s.a.iter()).copied())
        .collect();
    w.add_f64(name, &coeffs, &[sos.n_sections(), 6]);
}

#[inline(always)]
fn now() -> std::time::Instant { std::time::Instant::now() }

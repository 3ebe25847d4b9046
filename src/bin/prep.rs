use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use ictal::io::{load_label_table, write_prepared, SafetensorsSource};
use ictal::{build_dataset, DecimationFilter, PipelineConfig};

#[derive(Parser)]
#[command(name = "prep", about = "iEEG seizure-onset window dataset builder")]
struct Args {
    /// Interictal segment (safetensors: data, sfreq, ch_names)
    #[arg(long)]
    interictal: PathBuf,

    /// Ictal segment (safetensors: data, sfreq, ch_names)
    #[arg(long)]
    ictal: PathBuf,

    /// Header-less electrode,onset,offset CSV
    #[arg(long)]
    labels: PathBuf,

    /// Dataset safetensors output path
    #[arg(long)]
    output: PathBuf,

    /// JSON configuration; omitted fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Decimation factor
    #[arg(long)]
    decimation_factor: Option<usize>,

    /// Anti-aliasing filter used for decimation
    #[arg(long, value_parser = parse_filter)]
    decimation_filter: Option<DecimationFilter>,

    /// Window length in samples
    #[arg(long)]
    sequence_len: Option<usize>,

    /// Stride between window right edges
    #[arg(long)]
    step_size: Option<usize>,

    /// Line-noise notch frequency (Hz)
    #[arg(long)]
    notch_freq: Option<f32>,

    /// Standardize windows with training-split statistics
    #[arg(long)]
    standardize: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn parse_filter(s: &str) -> Result<DecimationFilter, String> {
    match s {
        "iir" => Ok(DecimationFilter::Iir),
        "fir" => Ok(DecimationFilter::Fir),
        _ => Err(format!("unknown decimation filter {s:?} (expected iir or fir)")),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            PipelineConfig::from_json_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(v) = args.decimation_factor {
        cfg.decimation_factor = v;
    }
    if let Some(v) = args.decimation_filter {
        cfg.decimation_filter = v;
    }
    if let Some(v) = args.sequence_len {
        cfg.sequence_len = v;
    }
    if let Some(v) = args.step_size {
        cfg.step_size = v;
    }
    if let Some(v) = args.notch_freq {
        cfg.notch_freq = v;
    }
    cfg.standardize |= args.standardize;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    let labels = load_label_table(&args.labels, &cfg.unmarked_placeholder)?;
    let source = SafetensorsSource { interictal: args.interictal, ictal: args.ictal };

    let prepared = build_dataset(&source, &labels, &cfg)?;
    write_prepared(&prepared, &args.output)?;
    log::info!("written → {}", args.output.display());

    Ok(())
}

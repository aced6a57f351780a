//! Loudness and tonality analysis of WAV files.

use anyhow::Context;
use clap::Args;
use hms_io::load_signal;
use hms_model::{FieldType, HearingModel, HmsConfig, HmsResult};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Analyze WAV files with the hearing model.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV files
    #[arg(value_name = "INPUT", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Sound field: free or diffuse
    #[arg(long)]
    pub field: Option<FieldType>,

    /// Pascal per unit of full-scale WAV amplitude
    #[arg(long)]
    pub calibration: Option<f64>,

    /// Seconds at the start excluded from averages
    #[arg(long)]
    pub time_skip: Option<f64>,

    /// Block length in samples at 48 kHz
    #[arg(long)]
    pub block_len: Option<usize>,

    /// Hop between blocks in samples at 48 kHz
    #[arg(long)]
    pub hop: Option<usize>,

    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the full result bundle as JSON
    #[arg(long)]
    pub json: bool,
}

/// Analysis settings as read from a `--config` file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(flatten)]
    model: HmsConfig,
    calibration: Option<f64>,
}

/// JSON record for one analysed file.
#[derive(Serialize)]
struct FileReport<'a> {
    input: String,
    calibration: f64,
    #[serde(flatten)]
    result: &'a HmsResult,
}

/// Merge the config file (if any) with command-line overrides.
fn resolve_config(args: &AnalyzeArgs) -> anyhow::Result<(HmsConfig, f64)> {
    let file = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            toml::from_str::<FileConfig>(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => FileConfig::default(),
    };

    let mut config = file.model;
    if let Some(field) = args.field {
        config.field = field;
    }
    if let Some(seconds) = args.time_skip {
        config.time_skip = seconds;
    }
    if let Some(block_len) = args.block_len {
        config.block_len = block_len;
    }
    if let Some(hop) = args.hop {
        config.hop = hop;
    }
    let calibration = args.calibration.or(file.calibration).unwrap_or(1.0);

    Ok((config, calibration))
}

fn argmax(values: &[f64]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

fn summary(input: &Path, result: &HmsResult) -> String {
    let mut lines = vec![
        input.display().to_string(),
        format!("  Field:        {}", result.field),
        format!(
            "  Blocks:       {} ({} skipped, {:.3}s time skip)",
            result.num_blocks(),
            result.skipped_blocks,
            result.time_skip
        ),
        format!(
            "  Loudness:     {:.2} sone_HMS (max {:.2}, N5 {:.2})",
            result.loudness.average, result.loudness.max, result.loudness.n5
        ),
        format!("  Tonality:     {:.2} tu_HMS", result.tonality.average),
    ];

    if result.loudness.average > 0.0 {
        if let Some(z) = argmax(&result.loudness.specific_average) {
            lines.push(format!(
                "  Loudest band: z = {:.1} Bark_HMS ({:.0} Hz)",
                result.band_rates[z], result.band_centers_hz[z]
            ));
        }
    }
    if result.tonality.average > 0.0 {
        if let Some(z) = argmax(&result.tonality.specific_average) {
            lines.push(format!(
                "  Most tonal:   z = {:.1} Bark_HMS ({:.0} Hz, T' {:.2})",
                result.band_rates[z], result.band_centers_hz[z], result.tonality.specific_average[z]
            ));
        }
    }

    lines.join("\n")
}

/// Run the analyze command.
pub fn run(args: AnalyzeArgs) -> anyhow::Result<()> {
    let (config, calibration) = resolve_config(&args)?;
    let model = HearingModel::new(config).context("invalid analysis configuration")?;

    let pb = if args.inputs.len() > 1 {
        let pb = ProgressBar::new(args.inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("##-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut results = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        pb.set_message(input.display().to_string());

        let signal = load_signal(input, calibration)
            .with_context(|| format!("failed to load {}", input.display()))?;
        let result = model
            .analyze(&signal)
            .with_context(|| format!("failed to analyze {}", input.display()))?;
        info!(input = %input.display(), loudness = result.loudness.average, "analyzed");

        if !args.json {
            pb.suspend(|| println!("{}\n", summary(input, &result)));
        }
        results.push(result);
        pb.inc(1);
    }
    pb.finish_and_clear();

    if args.json {
        let reports: Vec<FileReport<'_>> = args
            .inputs
            .iter()
            .zip(&results)
            .map(|(input, result)| FileReport {
                input: input.display().to_string(),
                calibration,
                result,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    Ok(())
}

//! Background removal CLI tool
//!
//! A single image is processed directly or in four parallel tiles; a
//! directory is processed as a batch into a fresh timestamped folder.

use super::config::CliConfigBuilder;
use crate::{
    backends::{ExecutionProvider, OnnxBackend},
    batch::BatchRunner,
    config::{RemovalConfig, TilingMode},
    locale::Locale,
    models::ModelId,
    pipeline::TiledPipeline,
    remover::{BackgroundRemover, RemovalOutput},
    services::{ImageIOService, ProgressReporter, TracingProgressReporter},
    session_cache::SessionCache,
    tracing_config::{init_cli_tracing, TracingFormat},
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Tiled background removal with a configurable matting preconditioner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-tiles")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image file, or a directory for batch processing
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output file for a single image [default: <stem>_nobg.png next to the input]
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Segmentation model (u2net, u2netp, u2net_human_seg, u2net_cloth_seg,
    /// silueta, isnet-general-use, isnet-anime)
    #[arg(short, long)]
    pub model: Option<ModelId>,

    /// Directory holding the <model>.onnx files [default: $U2NET_HOME or ~/.u2net]
    #[arg(long, value_name = "DIR")]
    pub model_dir: Option<PathBuf>,

    /// ONNX Runtime execution provider
    #[arg(long, value_enum, default_value_t = ExecutionProvider::Auto)]
    pub provider: ExecutionProvider,

    /// Refine the mask with alpha matting
    #[arg(long)]
    pub alpha_matting: bool,

    /// Trimap foreground threshold (0-255)
    #[arg(long)]
    pub foreground_threshold: Option<u8>,

    /// Trimap background threshold (0-255)
    #[arg(long)]
    pub background_threshold: Option<u8>,

    /// Trimap erosion size
    #[arg(long)]
    pub erode_size: Option<u8>,

    /// Write the segmentation mask instead of the cutout
    #[arg(long)]
    pub only_mask: bool,

    /// Incomplete-Cholesky discard threshold, e.g. "1e-4"
    #[arg(long, value_name = "NUMBER", allow_hyphen_values = true)]
    pub discard_threshold: Option<String>,

    /// Comma separated diagonal shifts, e.g. "0,1e-4,1e-3"
    #[arg(long, value_name = "LIST", allow_hyphen_values = true)]
    pub shifts: Option<String>,

    /// Matting regularization strength, e.g. "1e-7"
    #[arg(long, value_name = "NUMBER", allow_hyphen_values = true)]
    pub epsilon: Option<String>,

    /// Split a single image into four tiles processed in parallel
    #[arg(long)]
    pub tiled: bool,

    /// How tiles are merged back together
    #[arg(long, value_enum)]
    pub tiling_mode: Option<TilingMode>,

    /// Base directory for batch results
    #[arg(long, value_name = "DIR", default_value = "results")]
    pub dest_base: PathBuf,

    /// Abort a batch on the first failing file
    #[arg(long)]
    pub fail_fast: bool,

    /// Only process batch files matching this glob (e.g. "*.jpg")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Language of user-facing messages (en, zh-CN)
    #[arg(long)]
    pub locale: Option<Locale>,

    /// JSON configuration file; command line flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Compact log output without colors
    #[arg(long)]
    pub compact_logs: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.compact_logs {
        TracingFormat::Compact
    } else {
        TracingFormat::Console
    };
    init_cli_tracing(cli.verbose, format).context("Failed to initialize tracing")?;

    let config = CliConfigBuilder::from_cli(&cli)?;
    info!(
        input = %cli.input.display(),
        model = %config.model,
        locale = %config.locale,
        "Starting background removal"
    );

    let model_dir = cli.model_dir.clone().unwrap_or_else(crate::backends::default_model_dir);
    let backend = Arc::new(OnnxBackend::new(model_dir).with_execution_provider(cli.provider));

    if cli.input.is_dir() {
        run_batch(&cli, &config, backend)
    } else {
        run_single(&cli, &config, backend)
    }
}

fn run_single(cli: &Cli, config: &RemovalConfig, backend: Arc<OnnxBackend>) -> Result<()> {
    if !ImageIOService::is_supported_format(&cli.input) {
        warn!(
            input = %cli.input.display(),
            "Unrecognized image extension, detecting the format from content"
        );
    }
    let image = ImageIOService::load_image(&cli.input)
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    let preconditioner = config.preconditioner();

    let output: RemovalOutput = if cli.tiled {
        TiledPipeline::new(backend, config.locale, config.tiling_mode).process_tiled(
            &image,
            config.model,
            &config.matting,
            &preconditioner,
        )?
    } else {
        BackgroundRemover::with_backend(backend, config.locale).remove(
            Some(&image),
            config.model,
            &config.matting,
            &preconditioner,
        )?
    };

    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| generate_output_path(&cli.input));
    ImageIOService::save_png(&output.image, &output_path)
        .with_context(|| format!("Failed to save {}", output_path.display()))?;

    println!("{}", output.timings.summary(config.locale));
    info!(output = %output_path.display(), "Saved result");
    Ok(())
}

fn run_batch(cli: &Cli, config: &RemovalConfig, backend: Arc<OnnxBackend>) -> Result<()> {
    if cli.output.is_some() {
        warn!("--output is ignored for directory input; results go under --dest-base");
    }

    // Compact logs replace the progress bar with log events
    let reporter: Arc<dyn ProgressReporter> = if cli.compact_logs {
        Arc::new(TracingProgressReporter)
    } else {
        Arc::new(ProgressBarReporter::new())
    };
    let cache = Arc::new(SessionCache::new(backend));
    let runner = BatchRunner::from_config(cache, config)?.with_reporter(reporter);

    let report = runner.run(
        &cli.input,
        &cli.dest_base,
        config.model,
        &config.matting,
        &config.preconditioner(),
    )?;

    println!(
        "Processed {} file(s) into {} in {:.2}s",
        report.success_count(),
        report.destination.display(),
        report.total_time.as_secs_f64()
    );
    for failed in report.failed() {
        eprintln!("Failed: {} - {}", failed.source.display(), failed.error);
    }

    if report.is_success() {
        Ok(())
    } else {
        anyhow::bail!("{} file(s) failed", report.failure_count())
    }
}

/// `<dir>/<stem>_nobg.png` next to the input
fn generate_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_nobg.png"))
}

/// Batch progress rendered as an indicatif bar
struct ProgressBarReporter {
    bar: ProgressBar,
}

impl ProgressBarReporter {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl ProgressReporter for ProgressBarReporter {
    fn on_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, file: &Path, _index: usize) {
        self.bar.set_message(format!("Processing {}", file.display()));
    }

    fn on_file_complete(&self, file: &Path, _output: &Path, processing_time: Duration) {
        self.bar.println(format!(
            "{} ({:.2}s)",
            file.display(),
            processing_time.as_secs_f64()
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, file: &Path, error: &str) {
        self.bar.println(format!("Failed: {} - {}", file.display(), error));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, successful: usize, failed: usize, total_time: Duration) {
        self.bar.finish_with_message(format!(
            "{successful} done, {failed} failed in {:.2}s",
            total_time.as_secs_f64()
        ));
    }
}

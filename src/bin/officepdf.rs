//! CLI binary for officepdf.
//!
//! A thin shim over the library crate: flags become request form fields,
//! go through the same validation as any other request, and the resulting
//! files are copied into the output directory.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use officepdf::{
    convert_to_dir, convert_with_timeout, Artifact, ConversionOutput, ConvertError, ConvertForm,
    EngineConfig, Pipeline, PipelineProgressCallback, ProgressCallback, Stage,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the running stage, with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    stage_start: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            stage_start: Mutex::new(None),
        })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_pipeline_start(&self, inputs: &[PathBuf]) {
        self.bar.set_message(format!("{} document(s)", inputs.len()));
    }

    fn on_stage_start(&self, stage: Stage) {
        if let Ok(mut start) = self.stage_start.lock() {
            *start = Some(Instant::now());
        }
        self.bar.set_prefix(stage.to_string());
    }

    fn on_stage_complete(&self, stage: Stage, artifacts: &[Artifact]) {
        let elapsed = self
            .stage_start
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.bar.println(format!(
            "  {} {:<14} {}  {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{} file(s)", artifacts.len())),
            dim(&format!("{elapsed:.1}s")),
        ));
    }

    fn on_pipeline_complete(&self, _artifacts: &[Artifact]) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PDF per document, written to ./out
  officepdf report.docx budget.xlsx -o out

  # Merge into a single PDF/A-2b (converted after rendering)
  officepdf --merge --pdf-format PDF/A-2b cover.docx annex.odt -o out

  # Let LibreOffice produce PDF/A-1a directly, pages 1-3 only
  officepdf --native-pdf-format PDF/A-1a --page-ranges 1-3 letter.docx

  # Slide images + data.json (titles and speaker notes)
  officepdf --as-images --density 150 --quality 90 --resize 75% deck.pptx -o slides

EXIT STATUS:
  0  success
  1  conversion failed (tool error, timeout, I/O)
  2  invalid request (bad option, unsupported input, malformed page ranges, …)

ENVIRONMENT VARIABLES:
  OFFICEPDF_SOFFICE          LibreOffice binary     (default: soffice)
  OFFICEPDF_QPDF             qpdf binary            (default: qpdf)
  OFFICEPDF_GS               Ghostscript binary     (default: gs)
  OFFICEPDF_CONVERT          ImageMagick binary     (default: convert)
  OFFICEPDF_COMMAND_TIMEOUT  per-tool timeout, seconds (default: 300)
  RUST_LOG                   tracing filter, overrides -v/-q
"#;

/// Convert office documents to PDF, PDF/A or slide images.
#[derive(Parser, Debug)]
#[command(
    name = "officepdf",
    version,
    about = "Convert office documents to PDF, PDF/A or slide images",
    long_about = "Convert Word, Excel, PowerPoint and OpenDocument files to PDF with LibreOffice. \
Optionally merge the results (qpdf), convert them to PDF/A (Ghostscript) or render the single \
resulting PDF to slide images with per-slide titles and notes (ImageMagick).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Documents to convert, in output order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the produced files are written to.
    #[arg(short, long, env = "OFFICEPDF_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Landscape orientation.
    #[arg(long)]
    landscape: bool,

    /// Pages to render, e.g. `1-3,5` (empty = all).
    #[arg(long)]
    page_ranges: Option<String>,

    /// Target PDF format (PDF/A-1a, PDF/A-1b, PDF/A-2b, PDF/A-3b, PDF/UA-1).
    #[arg(long)]
    target_format: Option<String>,

    /// With --target-format: true = produced by the renderer, false = converted afterwards.
    #[arg(long)]
    apply_format_natively: Option<String>,

    /// Target format produced directly by the renderer.
    #[arg(long)]
    native_pdf_format: Option<String>,

    /// Target format applied after rendering (and merging).
    #[arg(long)]
    pdf_format: Option<String>,

    /// Deprecated: same as `--native-pdf-format PDF/A-1a`.
    #[arg(long)]
    native_pdf_a1a_format: bool,

    /// Merge all PDFs into one, in input order.
    #[arg(long)]
    merge: bool,

    /// Render the (single) resulting PDF to images plus data.json.
    #[arg(long)]
    as_images: bool,

    /// Image density in DPI.
    #[arg(long)]
    density: Option<String>,

    /// JPEG quality.
    #[arg(long)]
    quality: Option<String>,

    /// Resize applied after rendering, e.g. `50%`.
    #[arg(long)]
    resize: Option<String>,

    /// Number of documents rendered (or converted) in parallel.
    #[arg(short, long, env = "OFFICEPDF_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Deadline for the whole conversion, in seconds.
    #[arg(long, env = "OFFICEPDF_TIMEOUT")]
    timeout: Option<u64>,

    /// LibreOffice binary.
    #[arg(long, env = "OFFICEPDF_SOFFICE")]
    soffice: Option<PathBuf>,

    /// qpdf binary.
    #[arg(long, env = "OFFICEPDF_QPDF")]
    qpdf: Option<PathBuf>,

    /// Ghostscript binary.
    #[arg(long, env = "OFFICEPDF_GS")]
    gs: Option<PathBuf>,

    /// ImageMagick `convert` binary.
    #[arg(long = "convert", env = "OFFICEPDF_CONVERT")]
    imagemagick: Option<PathBuf>,

    /// Timeout for a single tool invocation, in seconds.
    #[arg(long, env = "OFFICEPDF_COMMAND_TIMEOUT", default_value_t = 300)]
    command_timeout: u64,

    /// Print the conversion output (files, roles, stats) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "OFFICEPDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", red("error:"));
            let client_error = err
                .downcast_ref::<ConvertError>()
                .is_some_and(ConvertError::is_client_error);
            ExitCode::from(if client_error { 2 } else { 1 })
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    let mut pipeline = Pipeline::from_config(&engine_config(cli));
    if show_progress {
        pipeline = pipeline.with_progress(CliProgressCallback::new() as ProgressCallback);
    }

    let extensions = pipeline.adapters().renderer.extensions();
    let options = form(cli)
        .into_builder(cli.inputs.clone(), &extensions)?
        .concurrency(cli.concurrency)
        .build()?;

    let output = match cli.timeout {
        Some(secs) => {
            convert_with_timeout(
                &pipeline,
                &options,
                &cli.output_dir,
                Duration::from_secs(secs),
            )
            .await
        }
        None => convert_to_dir(&pipeline, &options, &cli.output_dir).await,
    }
    .context("Conversion failed")?;

    report(cli, &output)
}

fn engine_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::default().with_command_timeout_secs(cli.command_timeout);
    if let Some(ref p) = cli.soffice {
        config = config.with_soffice(p);
    }
    if let Some(ref p) = cli.qpdf {
        config = config.with_qpdf(p);
    }
    if let Some(ref p) = cli.gs {
        config = config.with_ghostscript(p);
    }
    if let Some(ref p) = cli.imagemagick {
        config = config.with_imagemagick(p);
    }
    config
}

/// Map flags to request form fields so they get request validation.
fn form(cli: &Cli) -> ConvertForm {
    let flag = |set: bool| set.then(|| "true".to_string());
    let pairs: Vec<(&str, Option<String>)> = vec![
        ("landscape", flag(cli.landscape)),
        ("nativePageRanges", cli.page_ranges.clone()),
        ("targetFormat", cli.target_format.clone()),
        ("applyFormatNatively", cli.apply_format_natively.clone()),
        ("nativePdfFormat", cli.native_pdf_format.clone()),
        ("pdfFormat", cli.pdf_format.clone()),
        ("nativePdfA1aFormat", flag(cli.native_pdf_a1a_format)),
        ("merge", flag(cli.merge)),
        ("asImages", flag(cli.as_images)),
        ("slideImageDensity", cli.density.clone()),
        ("slideImageQuality", cli.quality.clone()),
        ("slideImageResize", cli.resize.clone()),
    ];
    ConvertForm::from_pairs(
        pairs
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (*name, v))),
    )
}

fn report(cli: &Cli, output: &ConversionOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    for path in output.paths() {
        println!("{}", path.display());
    }
    if !cli.quiet {
        eprintln!(
            "{}  {} file(s)  {}ms  →  {}",
            green("✔"),
            bold(&output.artifacts.len().to_string()),
            output.stats.total_duration_ms,
            bold(&cli.output_dir.display().to_string()),
        );
    }
    Ok(())
}

//! CLI binary for filigrane.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `WatermarkConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use filigrane::{inspect, watermark, WatermarkConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Watermark a single document
  filigrane contract.pdf --text "CONFIDENTIAL"

  # Merge several documents, pages kept in argument order
  filigrane cover.pdf body.pdf annex.pdf --text "DRAFT"

  # Lighter watermark, lower resolution, custom output directory
  filigrane report.pdf --text "INTERNAL" --opacity 0.25 --dpi 150 -o out/

  # Keep the editable intermediate to check tiling parameters
  filigrane page.pdf --text "SAMPLE" --keep-intermediate -v

  # Inspect page sizes and orientations, no watermarking
  filigrane --inspect-only scan.pdf

  # JSON result for scripting
  filigrane a.pdf b.pdf --text "COPY" --json > result.json

ENVIRONMENT VARIABLES:
  FILIGRANE_TEXT            Default watermark text
  FILIGRANE_OUTPUT_DIR      Default output directory
  FILIGRANE_DPI             Default flattening resolution
  PDFIUM_DYNAMIC_LIB_PATH   Path to an existing libpdfium

OUTPUT:
  The final document is written to {output-dir}/{job-id}_filigrane.pdf.
  Every page of the output is a single full-page image: the watermark is
  baked into the pixels and cannot be removed with a PDF editor. Text in
  the output is not selectable or searchable.
"#;

/// Merge, watermark, and flatten PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "filigrane",
    version,
    about = "Merge PDFs, tile a diagonal text watermark over every page, and flatten to image-only pages",
    long_about = "Merge one or more PDF documents into a single file, stamp every page with a \
repeating diagonal semi-transparent text watermark, then rasterise the result so the \
watermark cannot be stripped. Tiling adapts to each page's orientation.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF files, merged in the order given.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Watermark text tiled across every page.
    #[arg(short, long, env = "FILIGRANE_TEXT")]
    text: Option<String>,

    /// Output directory for the final document.
    #[arg(short, long, env = "FILIGRANE_OUTPUT_DIR", default_value = "watermarked")]
    output_dir: PathBuf,

    /// Scratch directory for per-job intermediates.
    #[arg(long, env = "FILIGRANE_SCRATCH_DIR", default_value = "uploads")]
    scratch_dir: PathBuf,

    /// Watermark opacity, in (0, 1].
    #[arg(long, env = "FILIGRANE_OPACITY", default_value_t = 0.4)]
    opacity: f32,

    /// Tile rotation in degrees, counter-clockwise.
    #[arg(long, env = "FILIGRANE_ANGLE", default_value_t = 25.0)]
    angle: f32,

    /// Flattening resolution (72–400).
    #[arg(long, env = "FILIGRANE_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// JPEG quality for flattened pages (1–100).
    #[arg(long, env = "FILIGRANE_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Keep the watermarked-but-unflattened intermediate file.
    #[arg(long, env = "FILIGRANE_KEEP_INTERMEDIATE")]
    keep_intermediate: bool,

    /// Print page metadata only, no watermarking.
    #[arg(long)]
    inspect_only: bool,

    /// Output structured JSON instead of a summary line.
    #[arg(long, env = "FILIGRANE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "FILIGRANE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILIGRANE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FILIGRANE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        for input in &cli.inputs {
            let meta = inspect(input)
                .with_context(|| format!("Failed to inspect {}", input.display()))?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&meta)
                        .context("Failed to serialise metadata")?
                );
            } else {
                println!("File:   {}", input.display());
                println!("Pages:  {}", meta.page_count);
                for (i, page) in meta.pages.iter().enumerate() {
                    println!(
                        "  page {:>3}: {:>7.1} x {:>7.1} pt  {:?}",
                        i + 1,
                        page.width,
                        page.height,
                        page.orientation
                    );
                }
            }
        }
        return Ok(());
    }

    let text = cli
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .context("Watermark text is required (--text or FILIGRANE_TEXT)")?;

    let config = WatermarkConfig::builder()
        .opacity(cli.opacity)
        .angle_degrees(cli.angle)
        .dpi(cli.dpi)
        .jpeg_quality(cli.jpeg_quality)
        .output_dir(&cli.output_dir)
        .scratch_dir(&cli.scratch_dir)
        .keep_intermediate(cli.keep_intermediate)
        .build()
        .context("Invalid configuration")?;

    // One spinner for the whole job; the pipeline is three sequential
    // stages, not a per-page loop the bar could track.
    let spinner = if show_progress {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Watermarking");
        bar.set_message(format!("{} document(s)…", cli.inputs.len()));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let result = watermark(&cli.inputs, text, &config).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let output = result.context("Watermarking failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{} {} pages  {}ms  →  {}",
            green("✔"),
            bold(&output.stats.total_pages.to_string()),
            output.stats.total_duration_ms,
            bold(&output.output_path.display().to_string()),
        );
        eprintln!(
            "   merge {}ms  /  watermark {}ms  /  flatten {}ms  /  {} bytes",
            dim(&output.stats.merge_duration_ms.to_string()),
            dim(&output.stats.watermark_duration_ms.to_string()),
            dim(&output.stats.flatten_duration_ms.to_string()),
            dim(&output.stats.output_bytes.to_string()),
        );
    }

    Ok(())
}

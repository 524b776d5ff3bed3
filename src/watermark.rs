//! Job orchestration: run the full merge → watermark → flatten pipeline.
//!
//! The async entry points ([`watermark`], [`watermark_bytes`]) validate
//! inputs up front, then hand the whole CPU-bound pipeline to
//! `spawn_blocking` — lopdf parsing and pdfium rendering can hold a core for
//! seconds on large documents, and must not stall the async runtime.
//! [`watermark_sync`] is the same pipeline for callers without a runtime.

use crate::config::WatermarkConfig;
use crate::error::FiligraneError;
use crate::output::{DocumentMetadata, JobOutput, JobStats, PageInfo};
use crate::pipeline::{composite, flatten, input, merge};
use crate::store::JobPaths;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Watermark and flatten a set of local PDF files.
///
/// Inputs are merged in the order given; the output lands in
/// `config.output_dir` under a unique job-id file name.
///
/// # Example
/// ```rust,no_run
/// use filigrane::WatermarkConfig;
///
/// # async fn run() -> Result<(), filigrane::FiligraneError> {
/// let config = WatermarkConfig::default();
/// let out = filigrane::watermark(
///     &["a.pdf".into(), "b.pdf".into()],
///     "CONFIDENTIAL",
///     &config,
/// )
/// .await?;
/// println!("wrote {}", out.output_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn watermark(
    inputs: &[PathBuf],
    text: &str,
    config: &WatermarkConfig,
) -> Result<JobOutput, FiligraneError> {
    let resolved = inputs
        .iter()
        .map(input::resolve_local)
        .collect::<Result<Vec<_>, _>>()?;
    run_blocking(resolved, text.to_owned(), config.clone()).await
}

/// Watermark and flatten in-memory PDF buffers (e.g. HTTP uploads).
///
/// Buffers are spilled to managed temp files so the flattener can open them
/// by path; the temp files live until the job completes.
pub async fn watermark_bytes(
    inputs: Vec<Vec<u8>>,
    text: &str,
    config: &WatermarkConfig,
) -> Result<JobOutput, FiligraneError> {
    let resolved = inputs
        .iter()
        .enumerate()
        .map(|(i, bytes)| input::resolve_bytes(bytes, i + 1))
        .collect::<Result<Vec<_>, _>>()?;
    run_blocking(resolved, text.to_owned(), config.clone()).await
}

/// Synchronous variant of [`watermark`] for callers without a tokio runtime.
pub fn watermark_sync(
    inputs: &[PathBuf],
    text: &str,
    config: &WatermarkConfig,
) -> Result<JobOutput, FiligraneError> {
    let resolved = inputs
        .iter()
        .map(input::resolve_local)
        .collect::<Result<Vec<_>, _>>()?;
    run_job(resolved, text, config)
}

async fn run_blocking(
    resolved: Vec<input::ResolvedInput>,
    text: String,
    config: WatermarkConfig,
) -> Result<JobOutput, FiligraneError> {
    tokio::task::spawn_blocking(move || run_job(resolved, &text, &config))
        .await
        .map_err(|e| FiligraneError::Internal(format!("pipeline task panicked: {e}")))?
}

/// The pipeline proper. Runs on the calling thread.
fn run_job(
    resolved: Vec<input::ResolvedInput>,
    text: &str,
    config: &WatermarkConfig,
) -> Result<JobOutput, FiligraneError> {
    if resolved.is_empty() {
        return Err(FiligraneError::EmptyJob {
            detail: "no input documents".into(),
        });
    }
    let text = text.trim();
    if text.is_empty() {
        return Err(FiligraneError::EmptyJob {
            detail: "watermark text is empty".into(),
        });
    }

    let job_start = Instant::now();
    let paths = JobPaths::allocate(config)?;
    info!(
        "Job {} started: {} input document(s)",
        paths.job_id,
        resolved.len()
    );

    let result = run_stages(&resolved, text, config, &paths, job_start);
    paths.cleanup_scratch(config.keep_intermediate);
    result
}

fn run_stages(
    resolved: &[input::ResolvedInput],
    text: &str,
    config: &WatermarkConfig,
    paths: &JobPaths,
    job_start: Instant,
) -> Result<JobOutput, FiligraneError> {
    // Stage 1: merge.
    let merge_start = Instant::now();
    let docs = resolved
        .iter()
        .enumerate()
        .map(|(i, r)| merge::load_document(r.path(), i + 1))
        .collect::<Result<Vec<_>, _>>()?;
    let mut merged = merge::merge_documents(docs)?;
    merged
        .save(&paths.merged)
        .map_err(|e| FiligraneError::Structure(format!("failed to write merged document: {e}")))?;
    let merge_duration = merge_start.elapsed();

    // Stage 2: watermark overlay.
    let watermark_start = Instant::now();
    let total_pages = composite::apply_watermark(&mut merged, text, config)?;
    merged.save(&paths.intermediate).map_err(|e| {
        FiligraneError::Structure(format!("failed to write watermarked document: {e}"))
    })?;
    let watermark_duration = watermark_start.elapsed();
    info!(
        "Job {}: watermarked {} page(s) with \"{}\"",
        paths.job_id, total_pages, text
    );

    // Stage 3: flatten. Re-reads the intermediate from disk because pdfium
    // opens documents by path.
    let flatten_start = Instant::now();
    flatten::flatten_file(&paths.intermediate, &paths.output, config)?;
    let flatten_duration = flatten_start.elapsed();

    let output_bytes = std::fs::metadata(&paths.output)
        .map_err(|e| FiligraneError::OutputWriteFailed {
            path: paths.output.clone(),
            source: e,
        })?
        .len();

    let stats = JobStats {
        input_documents: resolved.len(),
        total_pages,
        dpi: config.dpi,
        output_bytes,
        merge_duration_ms: merge_duration.as_millis() as u64,
        watermark_duration_ms: watermark_duration.as_millis() as u64,
        flatten_duration_ms: flatten_duration.as_millis() as u64,
        total_duration_ms: job_start.elapsed().as_millis() as u64,
    };
    info!(
        "Job {} done: {} pages, {} bytes in {} ms",
        paths.job_id, stats.total_pages, stats.output_bytes, stats.total_duration_ms
    );

    Ok(JobOutput {
        file_name: paths.output_file_name(),
        output_path: paths.output.clone(),
        stats,
    })
}

/// Read page count and per-page dimensions from a PDF without modifying it.
///
/// Works on any stage's output, including flattened documents (whose page
/// dimensions are pixel counts rather than points).
pub fn inspect(path: &Path) -> Result<DocumentMetadata, FiligraneError> {
    let resolved = input::resolve_local(path)?;
    let doc = merge::load_document(resolved.path(), 1)?;

    let pages = doc
        .get_pages()
        .into_values()
        .map(|page_id| {
            let mb = composite::resolve_media_box(&doc, page_id)?;
            Ok(PageInfo::new(mb[2] - mb[0], mb[3] - mb[1]))
        })
        .collect::<Result<Vec<_>, FiligraneError>>()?;

    Ok(DocumentMetadata {
        page_count: pages.len(),
        pages,
    })
}

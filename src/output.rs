//! Result types returned by watermarking jobs and document inspection.

use crate::config::Orientation;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The result of a completed watermarking job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    /// Storage identifier of the final document, e.g.
    /// `3f2a…_filigrane.pdf`. Unique per job.
    pub file_name: String,

    /// Absolute or config-relative path of the final document on disk.
    pub output_path: PathBuf,

    /// Timing and size statistics for the run.
    pub stats: JobStats,
}

/// Statistics for a single watermarking job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    /// Number of input documents merged.
    pub input_documents: usize,

    /// Total pages in the merged (and final) document.
    pub total_pages: usize,

    /// Flattening resolution used.
    pub dpi: u32,

    /// Size of the final output file in bytes.
    pub output_bytes: u64,

    /// Wall-clock duration of the merge stage.
    pub merge_duration_ms: u64,

    /// Wall-clock duration of tile generation + compositing.
    pub watermark_duration_ms: u64,

    /// Wall-clock duration of rasterisation + output assembly.
    pub flatten_duration_ms: u64,

    /// End-to-end job duration.
    pub total_duration_ms: u64,
}

/// Metadata about a PDF document, extracted without modifying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Number of pages.
    pub page_count: usize,

    /// Per-page dimensions and orientation, in document order.
    pub pages: Vec<PageInfo>,
}

/// Dimensions and orientation of a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageInfo {
    /// Page width in PDF points.
    pub width: f32,

    /// Page height in PDF points.
    pub height: f32,

    /// Derived from the width vs height comparison.
    pub orientation: Orientation,
}

impl PageInfo {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            orientation: Orientation::of_page(width, height),
        }
    }
}

//! Error types for the filigrane library.
//!
//! Every stage failure is fatal to the job: a watermarking run either
//! produces a complete flattened output document or nothing at all. There is
//! deliberately no partial-success type here — the failure modes (bad input
//! file, corrupt PDF, render failure) are almost always permanent, so callers
//! get one [`FiligraneError`] and no retry machinery.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the filigrane library.
#[derive(Debug, Error)]
pub enum FiligraneError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// A job was started with no input documents, or the merged document
    /// ended up with zero pages.
    #[error("Nothing to watermark: {detail}")]
    EmptyJob { detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// A source document could not be parsed.
    #[error("Input document {index} ('{path}') is malformed: {detail}")]
    MalformedDocument {
        index: usize,
        path: PathBuf,
        detail: String,
    },

    /// Structural manipulation of a document failed (missing catalog,
    /// broken Pages tree, unwritable object graph).
    #[error("PDF structure error: {0}")]
    Structure(String),

    /// pdfium returned an error while rendering a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// JPEG encoding of a rendered page bitmap failed.
    #[error("Image encoding failed for page {page}: {detail}")]
    ImageEncodingFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

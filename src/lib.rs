//! # filigrane
//!
//! Batch PDF watermarking: merge uploaded documents, stamp every page with a
//! repeating diagonal text watermark, then rasterise the result into an
//! image-only PDF so the watermark cannot be stripped with a PDF editor.
//!
//! ## Pipeline
//!
//! ```text
//! inputs ──▶ merge ──▶ watermark overlay ──▶ flatten ──▶ {id}_filigrane.pdf
//!            lopdf      lopdf content ops     pdfium + JPEG
//! ```
//!
//! 1. **Merge** — N source documents become one, pages in input order.
//! 2. **Watermark** — each page gets a rotated, semi-transparent tiled text
//!    overlay, with tiling parameters chosen per page orientation.
//! 3. **Flatten** — every page is rendered to a bitmap at a fixed DPI and
//!    reassembled as a full-page JPEG, discarding all text and vector
//!    objects.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use filigrane::WatermarkConfig;
//!
//! # async fn run() -> Result<(), filigrane::FiligraneError> {
//! let config = WatermarkConfig::builder().dpi(200).build()?;
//! let out = filigrane::watermark(
//!     &["contract.pdf".into(), "annex.pdf".into()],
//!     "CONFIDENTIAL",
//!     &config,
//! )
//! .await?;
//! println!("{} ({} pages)", out.output_path.display(), out.stats.total_pages);
//! # Ok(())
//! # }
//! ```
//!
//! Flattening needs a pdfium library at runtime (bundled, system, or via
//! `PDFIUM_DYNAMIC_LIB_PATH`); every earlier stage is pure Rust.

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod store;
pub mod watermark;

pub use config::{Orientation, WatermarkConfig, WatermarkConfigBuilder};
pub use error::FiligraneError;
pub use output::{DocumentMetadata, JobOutput, JobStats, PageInfo};
pub use watermark::{inspect, watermark, watermark_bytes, watermark_sync};

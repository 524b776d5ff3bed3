//! The watermark-and-flatten pipeline, stage by stage.
//!
//! Data flows in one direction:
//!
//! ```text
//! input  ──▶ merge ──▶ tile + composite ──▶ flatten
//! (validate)  (one doc)  (overlay per page)   (image-only output)
//! ```
//!
//! Each stage is a plain function over lopdf/pdfium types so it can be
//! tested in isolation; the [`crate::watermark`] module wires them together
//! and owns the per-job file layout.

pub mod composite;
pub mod flatten;
pub mod input;
pub mod merge;
pub mod tile;

#[cfg(test)]
pub(crate) mod testutil;

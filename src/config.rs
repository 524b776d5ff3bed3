//! Configuration types for a watermarking job.
//!
//! All job behaviour is controlled through [`WatermarkConfig`], built via its
//! [`WatermarkConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across jobs, serialise them for logging, and diff
//! two runs to understand why their outputs differ.
//!
//! The watermark *text* is not part of the config — it is per-job input and
//! is passed alongside the input documents, the way the original service
//! received it with each upload.

use crate::error::FiligraneError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a watermark-and-flatten job.
///
/// Built via [`WatermarkConfig::builder()`] or using
/// [`WatermarkConfig::default()`].
///
/// # Example
/// ```rust
/// use filigrane::WatermarkConfig;
///
/// let config = WatermarkConfig::builder()
///     .opacity(0.3)
///     .dpi(150)
///     .output_dir("out")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// Watermark fill opacity, in (0, 1]. Default: 0.4.
    ///
    /// Carried into the page as an ExtGState (`/ca`, `/CA`). 0.4 over a
    /// 0.3-gray fill reads clearly on white pages without drowning content.
    pub opacity: f32,

    /// Tile rotation in degrees, counter-clockwise. Default: 25.
    ///
    /// The offsets the tile generator emits are derived so that this angle
    /// leaves no uncovered corners; changing it does not require retuning
    /// the step constants for moderate angles (±15–40°).
    pub angle_degrees: f32,

    /// Flattening resolution in DPI. Range: 72–400. Default: 200.
    ///
    /// 200 DPI keeps body text legible after rasterisation while holding
    /// per-page bitmaps to a manageable size (A4 ≈ 1654 × 2339 px). Lower it
    /// for draft output, raise it when small print must survive flattening.
    pub dpi: u32,

    /// JPEG quality for the flattened page images, 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// Directory the final `{job_id}_filigrane.pdf` is written to.
    /// Created if missing. Default: `watermarked`.
    pub output_dir: PathBuf,

    /// Scratch directory for per-job intermediates (`{job_id}_merged.pdf`,
    /// `{job_id}_temp.pdf`). Created if missing. Default: `uploads`.
    ///
    /// Intermediates are deleted best-effort when the job finishes; unique
    /// job ids make the directory safe to share between concurrent jobs
    /// without locking.
    pub scratch_dir: PathBuf,

    /// Keep the watermarked-but-unflattened intermediate instead of deleting
    /// it. Default: false. Useful when debugging tiling parameters.
    pub keep_intermediate: bool,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            opacity: 0.4,
            angle_degrees: 25.0,
            dpi: 200,
            jpeg_quality: 85,
            output_dir: PathBuf::from("watermarked"),
            scratch_dir: PathBuf::from("uploads"),
            keep_intermediate: false,
        }
    }
}

impl WatermarkConfig {
    /// Create a new builder for `WatermarkConfig`.
    pub fn builder() -> WatermarkConfigBuilder {
        WatermarkConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WatermarkConfig`].
#[derive(Debug)]
pub struct WatermarkConfigBuilder {
    config: WatermarkConfig,
}

impl WatermarkConfigBuilder {
    pub fn opacity(mut self, opacity: f32) -> Self {
        self.config.opacity = opacity;
        self
    }

    pub fn angle_degrees(mut self, degrees: f32) -> Self {
        self.config.angle_degrees = degrees;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.config.keep_intermediate = keep;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WatermarkConfig, FiligraneError> {
        let c = &self.config;
        if !(c.opacity > 0.0 && c.opacity <= 1.0) {
            return Err(FiligraneError::InvalidConfig(format!(
                "Opacity must be in (0, 1], got {}",
                c.opacity
            )));
        }
        if !c.angle_degrees.is_finite() {
            return Err(FiligraneError::InvalidConfig(
                "Rotation angle must be finite".into(),
            ));
        }
        if c.dpi < 72 || c.dpi > 400 {
            return Err(FiligraneError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Page orientation, derived from the width vs height comparison.
///
/// The tile generator keeps two parameter sets because a landscape page
/// swept by the same fixed portrait offsets ends up visibly under-tiled on
/// the long axis. Square pages count as portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    /// Classify a page by its dimensions in points.
    pub fn of_page(width: f32, height: f32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

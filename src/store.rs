//! Per-job storage layout: unique identifiers and scratch/output paths.
//!
//! Every job gets a UUIDv4 hex identifier that prefixes all of its files, so
//! concurrent jobs can share the scratch and output directories without any
//! locking. The naming mirrors the pipeline stages:
//!
//! ```text
//! {scratch_dir}/{id}_merged.pdf     merged inputs, pre-watermark
//! {scratch_dir}/{id}_temp.pdf       watermarked, pre-flatten
//! {output_dir}/{id}_filigrane.pdf   final flattened output
//! ```

use crate::config::WatermarkConfig;
use crate::error::FiligraneError;
use std::path::PathBuf;
use uuid::Uuid;

/// The file-system layout for one job.
#[derive(Debug, Clone)]
pub struct JobPaths {
    /// Hex UUIDv4 prefixing every file of this job.
    pub job_id: String,
    /// Merged inputs before watermarking.
    pub merged: PathBuf,
    /// Watermarked document before flattening.
    pub intermediate: PathBuf,
    /// Final flattened output.
    pub output: PathBuf,
}

impl JobPaths {
    /// Allocate paths for a new job, creating the scratch and output
    /// directories if they do not exist yet.
    pub fn allocate(config: &WatermarkConfig) -> Result<Self, FiligraneError> {
        for dir in [&config.scratch_dir, &config.output_dir] {
            std::fs::create_dir_all(dir).map_err(|e| FiligraneError::OutputWriteFailed {
                path: dir.clone(),
                source: e,
            })?;
        }

        let job_id = Uuid::new_v4().simple().to_string();
        Ok(Self {
            merged: config.scratch_dir.join(format!("{job_id}_merged.pdf")),
            intermediate: config.scratch_dir.join(format!("{job_id}_temp.pdf")),
            output: config.output_dir.join(format!("{job_id}_filigrane.pdf")),
            job_id,
        })
    }

    /// The storage identifier of the final document.
    pub fn output_file_name(&self) -> String {
        format!("{}_filigrane.pdf", self.job_id)
    }

    /// Best-effort removal of scratch files. Failures are logged, not
    /// propagated — the job already produced (or failed to produce) its
    /// output by the time this runs.
    pub fn cleanup_scratch(&self, keep_intermediate: bool) {
        for (path, keep) in [(&self.merged, false), (&self.intermediate, keep_intermediate)] {
            if keep || !path.exists() {
                continue;
            }
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove scratch file {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(root: &std::path::Path) -> WatermarkConfig {
        WatermarkConfig::builder()
            .scratch_dir(root.join("uploads"))
            .output_dir(root.join("watermarked"))
            .build()
            .expect("valid config")
    }

    #[test]
    fn allocate_creates_directories_and_unique_ids() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = test_config(tmp.path());

        let a = JobPaths::allocate(&config).expect("allocate");
        let b = JobPaths::allocate(&config).expect("allocate");

        assert!(config.scratch_dir.is_dir());
        assert!(config.output_dir.is_dir());
        assert_ne!(a.job_id, b.job_id, "job ids must be unique");
        assert!(a.output.ends_with(a.output_file_name()));
    }

    #[test]
    fn cleanup_removes_only_scratch_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = test_config(tmp.path());
        let paths = JobPaths::allocate(&config).expect("allocate");

        std::fs::write(&paths.merged, b"x").unwrap();
        std::fs::write(&paths.intermediate, b"x").unwrap();
        std::fs::write(&paths.output, b"x").unwrap();

        paths.cleanup_scratch(false);
        assert!(!paths.merged.exists());
        assert!(!paths.intermediate.exists());
        assert!(paths.output.exists(), "output must never be cleaned up");
    }

    #[test]
    fn cleanup_can_keep_intermediate() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let config = test_config(tmp.path());
        let paths = JobPaths::allocate(&config).expect("allocate");

        std::fs::write(&paths.merged, b"x").unwrap();
        std::fs::write(&paths.intermediate, b"x").unwrap();

        paths.cleanup_scratch(true);
        assert!(!paths.merged.exists());
        assert!(paths.intermediate.exists());
    }
}

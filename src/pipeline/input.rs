//! Input resolution: validate source files before any PDF work starts.
//!
//! lopdf and pdfium both produce opaque parse errors when handed arbitrary
//! bytes, so we validate the `%PDF` magic up front and turn the common
//! mistakes (wrong path, no read permission, uploaded a ZIP) into errors
//! that tell the caller what to fix. In-memory buffers are spilled to a
//! managed [`tempfile::TempDir`] so the flattener, which needs a
//! file-system path for pdfium, can open them; cleanup happens automatically
//! when the `ResolvedInput` is dropped, even on panic.

use crate::error::FiligraneError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// A validated input document — either a caller-owned file or a buffer
/// spilled to a temp directory.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local(PathBuf),
    /// Input was an in-memory buffer; written to a temp directory that is
    /// kept alive until processing completes.
    Spilled { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedInput {
    /// Get the path to the PDF file regardless of how it was resolved.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Spilled { path, .. } => path,
        }
    }
}

/// Validate a local file: it must exist, be readable, and start with `%PDF`.
pub fn resolve_local(path: impl Into<PathBuf>) -> Result<ResolvedInput, FiligraneError> {
    let path: PathBuf = path.into();

    if !path.exists() {
        return Err(FiligraneError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            use std::io::Read;
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(FiligraneError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FiligraneError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(FiligraneError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Spill an in-memory PDF buffer to a managed temp file and validate it.
///
/// `index` is the 1-based position of the buffer in the job's input list,
/// used only for the temp file name.
pub fn resolve_bytes(bytes: &[u8], index: usize) -> Result<ResolvedInput, FiligraneError> {
    let temp_dir = TempDir::new().map_err(|e| FiligraneError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(format!("input_{index}.pdf"));

    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(FiligraneError::NotAPdf { path, magic });
    }

    std::fs::write(&path, bytes).map_err(|e| FiligraneError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    })?;

    debug!("Spilled {}-byte input buffer to {}", bytes.len(), path.display());
    Ok(ResolvedInput::Spilled {
        path,
        _temp_dir: temp_dir,
    })
}

//! Canonical `sparse/0/` layout for engine output.
//!
//! The engine writes its model either straight into `sparse/` or into numbered
//! `sparse/<n>/` folders when the reconstruction splits. Consumers always read
//! `sparse/0/{cameras,images,points3D}.bin`.

use crate::PipelineError;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Name of the primary model directory.
pub const PRIMARY_MODEL: &str = "0";

/// What [`normalize_sparse_layout`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOutcome {
    /// No sparse directory at all.
    Missing,
    /// A `0` entry already exists; nothing was touched.
    AlreadyNormalized,
    /// Created `0/` and moved this many files into it (possibly none).
    Moved(usize),
}

/// Move loose model files from `sparse_dir` into `sparse_dir/0/`.
///
/// Does nothing if an entry named `0` already exists, so running it again is a no-op.
/// Directory entries (other numbered models) are left in place.
pub fn normalize_sparse_layout(sparse_dir: &Path) -> Result<LayoutOutcome, PipelineError> {
    if !sparse_dir.is_dir() {
        return Ok(LayoutOutcome::Missing);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(sparse_dir)? {
        let entry = entry?;
        if entry.file_name() == PRIMARY_MODEL {
            return Ok(LayoutOutcome::AlreadyNormalized);
        }
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    let model_dir = sparse_dir.join(PRIMARY_MODEL);
    fs::create_dir_all(&model_dir)?;
    for source in &files {
        if let Some(name) = source.file_name() {
            fs::rename(source, model_dir.join(name))?;
        }
    }

    debug!("Moved {} files into {}", files.len(), model_dir.display());
    Ok(LayoutOutcome::Moved(files.len()))
}

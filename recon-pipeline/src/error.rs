use crate::ingest::ResizeError;
use crate::reconstruction::{StageKind, StageStatus};
use recon_data::DataError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort a preprocessing or reconstruction run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Stage {stage} failed ({status})")]
    StageFailed { stage: StageKind, status: StageStatus },

    #[error("Both sequential ({sequential}) and exhaustive ({exhaustive}) matching failed")]
    MatchingFailed {
        sequential: StageStatus,
        exhaustive: StageStatus,
    },

    #[error("Failed to launch {stage}: {message}")]
    Launch { stage: StageKind, message: String },

    #[error("Resize error: {0}")]
    Resize(#[from] ResizeError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported depth format: {0}")]
    UnsupportedDepth(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Process exit code to report for this error.
    ///
    /// A failed stage forwards the engine's own exit code when it has one.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::StageFailed { status, .. } => status.exit_code(),
            _ => 1,
        }
    }
}

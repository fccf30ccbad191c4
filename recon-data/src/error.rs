use thiserror::Error;

/// Errors raised while reading or writing recon data files.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pose file truncated while reading {0}")]
    Truncated(&'static str),

    #[error("Invalid image name in pose file: {0}")]
    InvalidName(String),

    #[error("Invalid frame id for scene {scene}: {value}")]
    InvalidFrameId { scene: String, value: String },
}

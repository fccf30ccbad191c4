//! Recon Pipeline Crate
//!
//! This crate drives sparse reconstruction of ordered image sequences and picks
//! the best of several attempts per scene. It also prepares the resized
//! image/depth pairs the reconstruction consumes.
//!
//! ## Modules
//!
//! - [`ingest`]: Resize/crop transform and per-scene frame preprocessing
//! - [`reconstruction`]: Engine stage sequencing, fallback matching, output layout
//! - [`quality`]: Pose-count quality gate, best-result selection, run comparison
//! - [`config`]: Serializable pipeline configuration

pub mod config;
mod error;
pub mod ingest;
pub mod quality;
pub mod reconstruction;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use ingest::{ResizeError, ScenePreprocessor, resize_and_crop};
pub use quality::{BestResultSelector, Quality, QualityGate};
pub use reconstruction::{ReconstructionDriver, SceneJob, StageRunner, Strategy};

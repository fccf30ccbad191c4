//! Sparse reconstruction through an external engine
//!
//! This module sequences the engine's stages for one scene, applies the
//! matching fallback of the robust strategy, and normalizes the output layout.

pub mod driver;
pub mod normalizer;
pub mod options;
pub mod stage;

pub use driver::{DriverReport, ReconstructionDriver, SceneJob, StageRecord};
pub use normalizer::{LayoutOutcome, normalize_sparse_layout};
pub use options::{EngineOptions, RobustParams, StandardParams, Strategy};
pub use stage::{StageInvocation, StageKind, StageOutput, StageRunner, StageStatus};

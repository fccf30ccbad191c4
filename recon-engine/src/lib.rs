//! Recon Engine - Launches reconstruction engine stages as child processes
//!
//! This crate provides the process-backed implementation of the `StageRunner`
//! trait from recon-pipeline:
//!
//! - Arguments are passed verbatim, never through a shell
//! - Environment overrides apply to the child only
//! - An optional wall-clock limit kills stages that hang
//!
//! ## Example
//!
//! ```ignore
//! use recon_engine::ProcessRunner;
//! use recon_pipeline::reconstruction::{EngineOptions, ReconstructionDriver, SceneJob, Strategy};
//!
//! let runner = ProcessRunner::new("colmap");
//! let driver = ReconstructionDriver::new(runner, Strategy::robust(), EngineOptions::default());
//! let report = driver.run(&SceneJob::from_roots("scene0001_00", "data".as_ref(), "results".as_ref()))?;
//! ```

mod process;

pub use process::{EngineError, ProcessRunner, resolve_executable};

// Re-export the runner trait for convenience
pub use recon_pipeline::reconstruction::{StageInvocation, StageOutput, StageRunner, StageStatus};

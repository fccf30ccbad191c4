//! Recon Data Crate
//!
//! Data model and file formats shared by the reconstruction tooling: scenes and
//! their curated frame lists, the resize configuration, and the binary pose file
//! written by the reconstruction engine.
//! This crate does no image processing and never launches the engine.

mod error;
pub mod pose;
pub mod selection;
pub mod types;

pub use error::DataError;
pub use pose::{ImagePose, PointObservation, count_poses, read_pose_file, write_pose_file};
pub use selection::FrameSelection;
pub use types::{ResizeSpec, Scene};

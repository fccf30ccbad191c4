//! Frame ingestion module
//!
//! Turns raw captured frames into the normalized inputs the reconstruction expects:
//! - Resize/crop transform for color + depth pairs
//! - Frame loading and saving
//! - Per-scene preprocessing over a curated frame subset

pub mod frame;
pub mod preprocess;
pub mod resize;

pub use frame::{DepthImage, FramePair};
pub use preprocess::{PreprocessSummary, SceneOutcome, ScenePreprocessor};
pub use resize::{ResizeError, ResizePlan, resize_and_crop};

//! Core data types for scenes and the resize configuration.
//!
//! These are plain values shared by the preprocessing and reconstruction stages.
//! Image buffers live in recon-pipeline, next to the code that transforms them.

use serde::{Deserialize, Serialize};

/// Output resolution for the resize/crop transform.
///
/// One value is shared read-only by every transform invocation in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    /// Target height in pixels.
    pub height: u32,
    /// Target width in pixels.
    pub width: u32,
}

impl ResizeSpec {
    /// Create a new resize spec.
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// Square target of the given edge length.
    pub fn square(size: u32) -> Self {
        Self {
            height: size,
            width: size,
        }
    }

    /// True if both target dimensions are non-zero.
    pub fn is_valid(&self) -> bool {
        self.height > 0 && self.width > 0
    }
}

impl Default for ResizeSpec {
    fn default() -> Self {
        Self::square(448)
    }
}

/// A named, ordered capture sequence selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    /// Scene identifier, also the directory name on disk.
    pub id: String,
    /// Frame identifiers in capture order.
    pub frames: Vec<String>,
}

impl Scene {
    /// Create a scene from an id and its ordered frame ids.
    pub fn new(id: impl Into<String>, frames: Vec<String>) -> Self {
        Self {
            id: id.into(),
            frames,
        }
    }

    /// Number of selected frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

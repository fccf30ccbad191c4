//! Registered-pose count as a quality signal

use crate::PipelineError;
use recon_data::count_poses;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pose file location relative to a scene's output directory.
pub fn pose_file_path(scene_dir: &Path) -> PathBuf {
    scene_dir.join("sparse").join("0").join("images.bin")
}

/// Classification of a reconstruction by registered-pose count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    /// Nothing registered.
    Failed,
    Poor,
    Marginal,
    Good,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Quality::Failed => "failed",
            Quality::Poor => "poor",
            Quality::Marginal => "marginal",
            Quality::Good => "good",
        }
    }

    pub fn is_good(&self) -> bool {
        *self == Quality::Good
    }

    /// Below the marginal threshold, including failed.
    pub fn is_poor(&self) -> bool {
        matches!(self, Quality::Failed | Quality::Poor)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum count for [`Quality::Good`].
    pub good: usize,
    /// Minimum count for [`Quality::Marginal`].
    pub marginal: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self { good: 25, marginal: 15 }
    }
}

/// Reads pose counts and classifies them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityGate {
    thresholds: QualityThresholds,
}

impl QualityGate {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> QualityThresholds {
        self.thresholds
    }

    pub fn classify(&self, count: usize) -> Quality {
        if count == 0 {
            Quality::Failed
        } else if count >= self.thresholds.good {
            Quality::Good
        } else if count >= self.thresholds.marginal {
            Quality::Marginal
        } else {
            Quality::Poor
        }
    }

    /// Number of registered poses in a pose file. A missing file counts as zero.
    pub fn pose_count(&self, pose_file: &Path) -> Result<usize, PipelineError> {
        if !pose_file.exists() {
            debug!("No pose file at {}", pose_file.display());
            return Ok(0);
        }
        Ok(count_poses(pose_file)?)
    }

    /// Pose count of a scene output directory laid out as `sparse/0/images.bin`.
    pub fn scene_count(&self, scene_dir: &Path) -> Result<usize, PipelineError> {
        self.pose_count(&pose_file_path(scene_dir))
    }

    /// Count and classification of a scene output directory.
    pub fn assess(&self, scene_dir: &Path) -> Result<(usize, Quality), PipelineError> {
        let count = self.scene_count(scene_dir)?;
        Ok((count, self.classify(count)))
    }
}

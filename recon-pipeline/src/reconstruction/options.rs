//! Driver strategies and engine options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment override that keeps the engine from opening a display.
pub const HEADLESS_ENV: (&str, &str) = ("QT_QPA_PLATFORM", "offscreen");

/// Options shared by every stage invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Engine executable, resolved through `PATH` when not a path.
    pub executable: PathBuf,
    /// Camera model name passed to feature extraction.
    pub camera_model: String,
    pub use_gpu: bool,
    /// Pass [`HEADLESS_ENV`] to every invocation.
    pub headless: bool,
    /// Wall-clock limit per stage; `None` waits indefinitely.
    pub stage_timeout_secs: Option<u64>,
}

impl EngineOptions {
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("colmap"),
            camera_model: "SIMPLE_RADIAL".to_string(),
            use_gpu: true,
            headless: true,
            stage_timeout_secs: None,
        }
    }
}

/// Parameters of the baseline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardParams {
    pub ba_global_function_tolerance: f64,
}

impl Default for StandardParams {
    fn default() -> Self {
        Self {
            ba_global_function_tolerance: 1e-6,
        }
    }
}

/// Parameters of the robust configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobustParams {
    pub max_num_features: u32,
    pub first_octave: i32,
    /// Neighbor window for sequential matching.
    pub overlap: u32,
    pub loop_detection: bool,
    pub ba_global_function_tolerance: f64,
    pub min_num_matches: u32,
    pub init_min_num_inliers: u32,
    pub abs_pose_min_num_inliers: u32,
}

impl Default for RobustParams {
    fn default() -> Self {
        Self {
            max_num_features: 16384,
            first_octave: -1,
            overlap: 15,
            loop_detection: false,
            ba_global_function_tolerance: 1e-5,
            min_num_matches: 10,
            init_min_num_inliers: 50,
            abs_pose_min_num_inliers: 10,
        }
    }
}

/// Which stage sequence the driver runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Strategy {
    /// extract -> exhaustive match -> map; every failure is fatal.
    Standard(StandardParams),
    /// extract -> sequential match -> exhaustive match -> map; only extraction
    /// and a double matching failure are fatal.
    Robust(RobustParams),
}

impl Strategy {
    pub fn standard() -> Self {
        Strategy::Standard(StandardParams::default())
    }

    pub fn robust() -> Self {
        Strategy::Robust(RobustParams::default())
    }

    /// Short tag recorded on reports.
    pub fn tag(&self) -> &'static str {
        match self {
            Strategy::Standard(_) => "standard",
            Strategy::Robust(_) => "robust",
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::standard()
    }
}

//! Quality assessment and result selection
//!
//! The registered-pose count of a reconstruction is its only quality signal.
//! This module reads it, classifies it, and uses it to pick and compare
//! attempts across configurations.

pub mod analysis;
pub mod gate;
pub mod selector;

pub use analysis::{Comparison, ComparisonReport, SceneComparison, compare};
pub use gate::{Quality, QualityGate, QualityThresholds, pose_file_path};
pub use selector::{
    Attempt, BestResult, BestResultSelector, CombineSummary, ResultSource, discover_scenes, read_scene_list,
    select_best, write_scene_list,
};

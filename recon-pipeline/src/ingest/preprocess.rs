//! Per-scene preprocessing of curated frame subsets
//!
//! Source layout: `<input>/<scene>/images/<frame>.jpg` and `<input>/<scene>/depths/<frame>.png`.
//! Output layout: `<output>/<scene>/color/<frame>.png` and `<output>/<scene>/depth/<frame>.png`.

use crate::PipelineError;
use crate::ingest::FramePair;
use rayon::prelude::*;
use recon_data::{FrameSelection, ResizeSpec, Scene};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const SOURCE_COLOR_DIR: &str = "images";
pub const SOURCE_DEPTH_DIR: &str = "depths";
pub const OUTPUT_COLOR_DIR: &str = "color";
pub const OUTPUT_DEPTH_DIR: &str = "depth";

const SOURCE_COLOR_EXT: &str = "jpg";
const SOURCE_DEPTH_EXT: &str = "png";
const OUTPUT_EXT: &str = "png";

/// Result of preprocessing one scene.
#[derive(Debug, Clone, Default)]
pub struct SceneOutcome {
    pub scene_id: String,
    /// Frames requested by the selection.
    pub requested: usize,
    /// Frames actually written.
    pub written: usize,
    /// Frames that were skipped, with the reason.
    pub failures: Vec<(String, String)>,
}

/// Aggregate over a whole selection.
#[derive(Debug, Clone, Default)]
pub struct PreprocessSummary {
    pub scenes: Vec<SceneOutcome>,
    /// Scenes skipped before any frame was touched, with the reason.
    pub skipped: Vec<(String, String)>,
}

impl PreprocessSummary {
    pub fn total_written(&self) -> usize {
        self.scenes.iter().map(|s| s.written).sum()
    }
}

/// Applies the resize transform to selected frames and writes the normalized tree.
#[derive(Debug, Clone)]
pub struct ScenePreprocessor {
    input_root: PathBuf,
    output_root: PathBuf,
    spec: ResizeSpec,
}

impl ScenePreprocessor {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>, spec: ResizeSpec) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            spec,
        }
    }

    pub fn spec(&self) -> ResizeSpec {
        self.spec
    }

    /// Directory that receives a scene's normalized frames.
    pub fn scene_output_dir(&self, scene_id: &str) -> PathBuf {
        self.output_root.join(scene_id)
    }

    /// Fail with [`PipelineError::MissingInput`] unless the scene and both source folders exist.
    pub fn check_scene(&self, scene_id: &str) -> Result<(), PipelineError> {
        let scene_dir = self.input_root.join(scene_id);
        for dir in [
            scene_dir.clone(),
            scene_dir.join(SOURCE_COLOR_DIR),
            scene_dir.join(SOURCE_DEPTH_DIR),
        ] {
            if !dir.is_dir() {
                return Err(PipelineError::MissingInput(dir));
            }
        }
        Ok(())
    }

    /// Transform and write a single frame.
    pub fn process_frame(&self, scene_id: &str, frame_id: &str) -> Result<(), PipelineError> {
        let scene_dir = self.input_root.join(scene_id);
        let color_path = frame_path(&scene_dir.join(SOURCE_COLOR_DIR), frame_id, SOURCE_COLOR_EXT);
        let depth_path = frame_path(&scene_dir.join(SOURCE_DEPTH_DIR), frame_id, SOURCE_DEPTH_EXT);

        let frame = FramePair::load(&color_path, &depth_path)?.resized(self.spec)?;

        let out_dir = self.scene_output_dir(scene_id);
        frame.save(
            &frame_path(&out_dir.join(OUTPUT_COLOR_DIR), frame_id, OUTPUT_EXT),
            &frame_path(&out_dir.join(OUTPUT_DEPTH_DIR), frame_id, OUTPUT_EXT),
        )
    }

    /// Process every selected frame of a scene.
    ///
    /// Frames are independent; a frame that cannot be read, transformed, or
    /// written is logged and skipped without affecting the others.
    #[tracing::instrument(skip_all, fields(scene = %scene.id))]
    pub fn process_scene(&self, scene: &Scene) -> Result<SceneOutcome, PipelineError> {
        self.check_scene(&scene.id)?;

        let out_dir = self.scene_output_dir(&scene.id);
        fs::create_dir_all(out_dir.join(OUTPUT_COLOR_DIR))?;
        fs::create_dir_all(out_dir.join(OUTPUT_DEPTH_DIR))?;

        let results: Vec<(String, Result<(), PipelineError>)> = scene
            .frames
            .par_iter()
            .map(|frame_id| (frame_id.clone(), self.process_frame(&scene.id, frame_id)))
            .collect();

        let mut outcome = SceneOutcome {
            scene_id: scene.id.clone(),
            requested: scene.frame_count(),
            ..Default::default()
        };
        for (frame_id, result) in results {
            match result {
                Ok(()) => {
                    debug!("Wrote frame {}", frame_id);
                    outcome.written += 1;
                }
                Err(e) => {
                    warn!("Error processing frame {}: {}", frame_id, e);
                    outcome.failures.push((frame_id, e.to_string()));
                }
            }
        }

        info!("Processed {}/{} frames", outcome.written, outcome.requested);
        Ok(outcome)
    }

    /// Process every scene of a selection. Scenes with missing inputs are skipped.
    pub fn process_selection(&self, selection: &FrameSelection) -> Result<PreprocessSummary, PipelineError> {
        fs::create_dir_all(&self.output_root)?;

        let mut summary = PreprocessSummary::default();
        for scene in selection.scenes() {
            match self.process_scene(&scene) {
                Ok(outcome) => summary.scenes.push(outcome),
                Err(PipelineError::MissingInput(path)) => {
                    warn!("Skipping {}: {} not found", scene.id, path.display());
                    summary.skipped.push((scene.id, format!("{} not found", path.display())));
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            "Preprocessing complete: {} frames over {} scenes",
            summary.total_written(),
            summary.scenes.len()
        );
        Ok(summary)
    }
}

fn frame_path(dir: &Path, frame_id: &str, ext: &str) -> PathBuf {
    dir.join(format!("{frame_id}.{ext}"))
}

//! Subcommand arguments and their execution.
//!
//! Each command returns the process exit code it wants; errors that abort the
//! whole command are returned as [`AppError`].

use crate::error::AppError;
use crate::report;
use clap::Args;
use rayon::prelude::*;
use recon_data::{FrameSelection, ResizeSpec};
use recon_engine::{ProcessRunner, resolve_executable};
use recon_pipeline::quality::{
    BestResultSelector, ComparisonReport, QualityGate, ResultSource, discover_scenes, write_scene_list,
};
use recon_pipeline::reconstruction::{DriverReport, ReconstructionDriver, SceneJob};
use recon_pipeline::{PipelineConfig, PipelineError, ScenePreprocessor};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

const DEFAULT_SELECTION_FILE: &str = "selected_seqs_test.json";

#[derive(Args, Debug)]
pub struct PreprocessArgs {
    /// Root holding `<scene>/images` and `<scene>/depths`
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Root that receives `<scene>/color` and `<scene>/depth`
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Frame selection JSON [default: <input-dir>/selected_seqs_test.json]
    #[arg(long)]
    pub selection: Option<PathBuf>,

    /// Process only this scene
    #[arg(long)]
    pub scene: Option<String>,

    /// Output height (overrides config, default 448)
    #[arg(long)]
    pub target_height: Option<u32>,

    /// Output width (overrides config, default 448)
    #[arg(long)]
    pub target_width: Option<u32>,

    /// Pipeline config JSON
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl PreprocessArgs {
    fn resize_spec(&self, config: &PipelineConfig) -> ResizeSpec {
        ResizeSpec::new(
            self.target_height.unwrap_or(config.resize.height),
            self.target_width.unwrap_or(config.resize.width),
        )
    }
}

#[derive(Args, Debug)]
pub struct ReconstructArgs {
    /// Scene to reconstruct; all scenes under the source path if omitted
    #[arg(long)]
    pub scene: Option<String>,

    /// Root holding `<scene>/color`
    #[arg(short, long)]
    pub source_path: PathBuf,

    /// Results root; each scene writes `<output>/<scene>`
    #[arg(short, long)]
    pub output_path: PathBuf,

    /// Camera model [default: SIMPLE_RADIAL]
    #[arg(long)]
    pub camera: Option<String>,

    /// Disable GPU feature extraction and matching
    #[arg(long)]
    pub no_gpu: bool,

    /// Engine executable [default: colmap]
    #[arg(long)]
    pub colmap_executable: Option<PathBuf>,

    /// Use the robust strategy with matcher fallback
    #[arg(long)]
    pub robust: bool,

    /// Kill any stage running longer than this
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Scenes reconstructed concurrently
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Directory name prefix used to discover scenes
    #[arg(long, default_value = "scene")]
    pub scene_prefix: String,

    /// Pipeline config JSON
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ReconstructArgs {
    /// Command-line flags take precedence over the config file.
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(camera) = &self.camera {
            config.engine.camera_model = camera.clone();
        }
        if self.no_gpu {
            config.engine.use_gpu = false;
        }
        if let Some(exe) = &self.colmap_executable {
            config.engine.executable = exe.clone();
        }
        if self.timeout_secs.is_some() {
            config.engine.stage_timeout_secs = self.timeout_secs;
        }
    }
}

#[derive(Args, Debug)]
pub struct CombineArgs {
    /// Results root of the baseline run
    #[arg(long, default_value = "results")]
    pub baseline: PathBuf,

    /// Results root of the robust run
    #[arg(long, default_value = "results_robust")]
    pub robust: PathBuf,

    /// Combined results root
    #[arg(long, default_value = "results_combined")]
    pub output: PathBuf,

    /// File that receives the sorted good-scene list
    #[arg(long, default_value = "good_scenes_combined.txt")]
    pub good_scenes: PathBuf,

    #[arg(long, default_value = "scene")]
    pub scene_prefix: String,

    /// Pipeline config JSON (quality thresholds)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Results root of the baseline run
    #[arg(long, default_value = "results")]
    pub baseline: PathBuf,

    /// Results root of the robust run
    #[arg(long, default_value = "results_robust")]
    pub robust: PathBuf,

    /// File that receives the sorted good-scene list
    #[arg(long, default_value = "good_scenes_robust.txt")]
    pub good_scenes: PathBuf,

    #[arg(long, default_value = "scene")]
    pub scene_prefix: String,

    /// Pipeline config JSON (quality thresholds)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn preprocess(args: &PreprocessArgs) -> Result<i32, AppError> {
    let config = PipelineConfig::load(args.config.as_deref())?;
    let selection_path = args
        .selection
        .clone()
        .unwrap_or_else(|| args.input_dir.join(DEFAULT_SELECTION_FILE));
    let mut selection = FrameSelection::from_path(&selection_path)?;

    if let Some(scene) = &args.scene {
        match selection.only(scene) {
            Some(single) => selection = single,
            None => {
                error!("Scene {} not found in {}", scene, selection_path.display());
                return Ok(0);
            }
        }
    }

    let spec = args.resize_spec(&config);
    info!(
        "Preprocessing {} scenes ({} frames) to {}x{}",
        selection.len(),
        selection.total_frames(),
        spec.width,
        spec.height
    );
    let preprocessor = ScenePreprocessor::new(&args.input_dir, &args.output_dir, spec);
    let summary = preprocessor.process_selection(&selection)?;
    report::print_preprocess(&summary);
    Ok(0)
}

pub fn reconstruct(args: &ReconstructArgs) -> Result<i32, AppError> {
    let mut config = PipelineConfig::load(args.config.as_deref())?;
    args.apply(&mut config);

    let scenes = match &args.scene {
        Some(scene) => vec![scene.clone()],
        None => discover_scenes(&args.source_path, &args.scene_prefix)?,
    };
    if scenes.is_empty() {
        warn!("No scenes found under {}", args.source_path.display());
        return Ok(0);
    }

    let executable = resolve_executable(&config.engine.executable)?;
    let runner = ProcessRunner::from_options(&config.engine).with_executable(executable);
    let driver = ReconstructionDriver::new(runner, config.strategy(args.robust), config.engine.clone())
        .with_gate(QualityGate::new(config.quality));

    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.jobs.max(1)).build()?;
    let results: Vec<(String, Result<DriverReport, PipelineError>)> = pool.install(|| {
        scenes
            .par_iter()
            .map(|scene| {
                let job = SceneJob::from_roots(scene, &args.source_path, &args.output_path);
                (scene.clone(), driver.run(&job))
            })
            .collect()
    });

    report::print_reconstruction(&results);
    Ok(reconstruction_exit_code(&results, args.robust))
}

/// First fatal error's code; otherwise 1 if a robust run registered nothing.
fn reconstruction_exit_code(results: &[(String, Result<DriverReport, PipelineError>)], robust: bool) -> i32 {
    if let Some(err) = results.iter().find_map(|(_, r)| r.as_ref().err()) {
        return err.exit_code();
    }
    let empty = results
        .iter()
        .filter_map(|(_, r)| r.as_ref().ok())
        .any(|report| !report.reconstructed());
    if robust && empty { 1 } else { 0 }
}

pub fn combine(args: &CombineArgs) -> Result<i32, AppError> {
    let config = PipelineConfig::load(args.config.as_deref())?;
    let gate = QualityGate::new(config.quality);

    let mut scenes = BTreeSet::new();
    for root in [&args.baseline, &args.robust] {
        scenes.extend(scenes_or_empty(root, &args.scene_prefix)?);
    }
    let scenes: Vec<String> = scenes.into_iter().collect();
    info!("Combining {} scenes into {}", scenes.len(), args.output.display());

    let selector = BestResultSelector::new(
        ResultSource::new("ORIG", &args.baseline),
        ResultSource::new("ROBUST", &args.robust),
        &args.output,
    )
    .with_gate(gate);
    let summary = selector.combine_all(&scenes)?;
    write_scene_list(&args.good_scenes, &summary.good_scenes)?;

    report::print_combine(&summary, &args.good_scenes);
    Ok(0)
}

pub fn analyze(args: &AnalyzeArgs) -> Result<i32, AppError> {
    let config = PipelineConfig::load(args.config.as_deref())?;
    let gate = QualityGate::new(config.quality);

    let scenes = discover_scenes(&args.robust, &args.scene_prefix)?;
    let comparison = ComparisonReport::build(&gate, &args.baseline, &args.robust, &scenes)?;
    write_scene_list(&args.good_scenes, &comparison.good_scene_ids())?;

    report::print_analysis(&comparison, gate.thresholds().good, &args.good_scenes);
    Ok(0)
}

fn scenes_or_empty(root: &Path, prefix: &str) -> Result<Vec<String>, PipelineError> {
    if root.is_dir() {
        discover_scenes(root, prefix)
    } else {
        warn!("Results root {} does not exist", root.display());
        Ok(Vec::new())
    }
}

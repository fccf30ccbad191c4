//! Stage sequencing for one scene.
//!
//! Stages share the scene's feature/match database and run strictly one after
//! another; each call blocks until the engine exits. Scenes are independent and
//! may be driven concurrently as long as each has its own output directory.

use crate::PipelineError;
use crate::quality::{Quality, QualityGate, pose_file_path};
use crate::reconstruction::normalizer::{LayoutOutcome, normalize_sparse_layout};
use crate::reconstruction::options::{EngineOptions, HEADLESS_ENV, RobustParams, StandardParams, Strategy};
use crate::reconstruction::stage::{StageInvocation, StageKind, StageRunner, StageStatus};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Input images subdirectory of a preprocessed scene.
pub const IMAGE_SUBDIR: &str = "color";
pub const DATABASE_FILE: &str = "database.db";
pub const SPARSE_DIR: &str = "sparse";

/// Paths for one scene's reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneJob {
    pub scene_id: String,
    pub image_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl SceneJob {
    pub fn new(scene_id: impl Into<String>, image_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            scene_id: scene_id.into(),
            image_dir: image_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// `<source>/<scene>/color` in, `<output>/<scene>` out.
    pub fn from_roots(scene_id: &str, source_root: &Path, output_root: &Path) -> Self {
        Self::new(
            scene_id,
            source_root.join(scene_id).join(IMAGE_SUBDIR),
            output_root.join(scene_id),
        )
    }

    pub fn database_path(&self) -> PathBuf {
        self.output_dir.join(DATABASE_FILE)
    }

    pub fn sparse_dir(&self) -> PathBuf {
        self.output_dir.join(SPARSE_DIR)
    }

    pub fn pose_file(&self) -> PathBuf {
        pose_file_path(&self.output_dir)
    }
}

/// A stage that ran and how it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRecord {
    pub stage: StageKind,
    pub status: StageStatus,
}

/// Outcome of a driver run that was not aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverReport {
    pub scene_id: String,
    pub strategy: &'static str,
    pub stages: Vec<StageRecord>,
    /// Soft failures that did not stop the run.
    pub warnings: Vec<String>,
    pub layout: LayoutOutcome,
    pub registered: usize,
    pub quality: Quality,
    pub output_dir: PathBuf,
}

impl DriverReport {
    /// True if the engine registered at least one image.
    pub fn reconstructed(&self) -> bool {
        self.registered > 0
    }
}

#[derive(Default)]
struct StageLog {
    stages: Vec<StageRecord>,
    warnings: Vec<String>,
}

impl StageLog {
    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Drives the external engine through one strategy's stage sequence.
pub struct ReconstructionDriver<R> {
    runner: R,
    strategy: Strategy,
    engine: EngineOptions,
    gate: QualityGate,
}

impl<R: StageRunner> ReconstructionDriver<R> {
    pub fn new(runner: R, strategy: Strategy, engine: EngineOptions) -> Self {
        Self {
            runner,
            strategy,
            engine,
            gate: QualityGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// Run every stage for one scene, then normalize the output and count poses.
    ///
    /// Fails before launching anything if the image directory is missing.
    /// A scene that registers nothing is still `Ok`; the report says so.
    #[tracing::instrument(skip_all, fields(scene = %job.scene_id, strategy = self.strategy.tag()))]
    pub fn run(&self, job: &SceneJob) -> Result<DriverReport, PipelineError> {
        if !job.image_dir.is_dir() {
            error!("Scene {} not found at {}", job.scene_id, job.image_dir.display());
            return Err(PipelineError::MissingInput(job.image_dir.clone()));
        }
        fs::create_dir_all(job.sparse_dir())?;
        info!(
            "Processing scene {} ({}): {} -> {}",
            job.scene_id,
            self.strategy.tag(),
            job.image_dir.display(),
            job.output_dir.display()
        );

        let mut log = StageLog::default();
        match &self.strategy {
            Strategy::Standard(params) => self.run_standard(job, params, &mut log)?,
            Strategy::Robust(params) => self.run_robust(job, params, &mut log)?,
        }

        let layout = normalize_sparse_layout(&job.sparse_dir())?;
        let registered = self.gate.pose_count(&job.pose_file())?;
        let quality = self.gate.classify(registered);
        info!("Registered {} images ({})", registered, quality);

        Ok(DriverReport {
            scene_id: job.scene_id.clone(),
            strategy: self.strategy.tag(),
            stages: log.stages,
            warnings: log.warnings,
            layout,
            registered,
            quality,
            output_dir: job.output_dir.clone(),
        })
    }

    fn run_standard(&self, job: &SceneJob, params: &StandardParams, log: &mut StageLog) -> Result<(), PipelineError> {
        self.require(self.extraction(job, None), log)?;
        self.require(self.exhaustive_matching(job), log)?;

        let mapping = self
            .mapping(job)
            .option("Mapper.ba_global_function_tolerance", params.ba_global_function_tolerance);
        self.require(mapping, log)
    }

    fn run_robust(&self, job: &SceneJob, params: &RobustParams, log: &mut StageLog) -> Result<(), PipelineError> {
        self.require(self.extraction(job, Some(params)), log)?;

        let sequential = self.invoke(self.sequential_matching(job, params), log)?;
        if !sequential.success() {
            log.warn(format!(
                "Sequential matching failed ({sequential}); trying exhaustive matching"
            ));
        }

        let exhaustive = self.invoke(self.exhaustive_matching(job), log)?;
        if !exhaustive.success() {
            if !sequential.success() {
                error!("Both sequential and exhaustive matching failed");
                return Err(PipelineError::MatchingFailed { sequential, exhaustive });
            }
            log.warn(format!("Exhaustive matching failed ({exhaustive}); using sequential matches"));
        }

        let mapping = self
            .mapping(job)
            .option("Mapper.ba_global_function_tolerance", params.ba_global_function_tolerance)
            .option("Mapper.min_num_matches", params.min_num_matches)
            .option("Mapper.init_min_num_inliers", params.init_min_num_inliers)
            .option("Mapper.abs_pose_min_num_inliers", params.abs_pose_min_num_inliers);
        let status = self.invoke(mapping, log)?;
        if !status.success() {
            log.warn(format!("Mapper returned {status}; evaluating partial output"));
        }
        Ok(())
    }

    fn invoke(&self, invocation: StageInvocation, log: &mut StageLog) -> Result<StageStatus, PipelineError> {
        info!("Running {}", invocation.stage);
        debug!("{}", invocation.display_args());

        let output = self.runner.run(&invocation)?;
        if !output.output.is_empty() {
            debug!("{} output:\n{}", invocation.stage, output.output);
        }
        log.stages.push(StageRecord {
            stage: invocation.stage,
            status: output.status,
        });
        Ok(output.status)
    }

    fn require(&self, invocation: StageInvocation, log: &mut StageLog) -> Result<(), PipelineError> {
        let stage = invocation.stage;
        let status = self.invoke(invocation, log)?;
        if status.success() {
            Ok(())
        } else {
            error!("{} failed ({})", stage, status);
            Err(PipelineError::StageFailed { stage, status })
        }
    }

    fn base(&self, stage: StageKind, job: &SceneJob) -> StageInvocation {
        let mut invocation = StageInvocation::new(stage)
            .current_dir(&job.output_dir)
            .path("database_path", &job.database_path());
        if self.engine.headless {
            invocation = invocation.env(HEADLESS_ENV.0, HEADLESS_ENV.1);
        }
        invocation
    }

    fn extraction(&self, job: &SceneJob, robust: Option<&RobustParams>) -> StageInvocation {
        let mut invocation = self
            .base(StageKind::FeatureExtraction, job)
            .path("image_path", &job.image_dir)
            .option("ImageReader.single_camera", 1)
            .option("ImageReader.camera_model", &self.engine.camera_model)
            .toggle("SiftExtraction.use_gpu", self.engine.use_gpu);
        if let Some(params) = robust {
            invocation = invocation
                .option("SiftExtraction.max_num_features", params.max_num_features)
                .option("SiftExtraction.first_octave", params.first_octave);
        }
        invocation
    }

    fn sequential_matching(&self, job: &SceneJob, params: &RobustParams) -> StageInvocation {
        self.base(StageKind::SequentialMatching, job)
            .toggle("SiftMatching.use_gpu", self.engine.use_gpu)
            .option("SequentialMatching.overlap", params.overlap)
            .toggle("SequentialMatching.loop_detection", params.loop_detection)
    }

    fn exhaustive_matching(&self, job: &SceneJob) -> StageInvocation {
        self.base(StageKind::ExhaustiveMatching, job)
            .toggle("SiftMatching.use_gpu", self.engine.use_gpu)
    }

    fn mapping(&self, job: &SceneJob) -> StageInvocation {
        self.base(StageKind::Mapping, job)
            .path("image_path", &job.image_dir)
            .path("output_path", &job.sparse_dir())
    }
}

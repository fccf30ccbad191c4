//! Comparison of a robust run against a baseline run.

use crate::PipelineError;
use crate::quality::QualityGate;
use std::path::Path;

/// Where a scene landed after the robust run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// Robust run reached the good threshold.
    Good,
    Improved,
    Same,
    Worse,
    /// Robust run registered nothing.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneComparison {
    pub scene_id: String,
    pub baseline: usize,
    pub robust: usize,
    pub outcome: Comparison,
}

/// Classify one scene. Failure takes precedence, then the good threshold.
pub fn compare(baseline: usize, robust: usize, good_threshold: usize) -> Comparison {
    if robust == 0 {
        Comparison::Failed
    } else if robust >= good_threshold {
        Comparison::Good
    } else if robust > baseline {
        Comparison::Improved
    } else if robust == baseline {
        Comparison::Same
    } else {
        Comparison::Worse
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonReport {
    pub entries: Vec<SceneComparison>,
}

impl ComparisonReport {
    /// Compare every scene between two results roots.
    pub fn build(
        gate: &QualityGate,
        baseline_root: &Path,
        robust_root: &Path,
        scenes: &[String],
    ) -> Result<Self, PipelineError> {
        let good = gate.thresholds().good;
        let entries = scenes
            .iter()
            .map(|scene_id| {
                let baseline = gate.scene_count(&baseline_root.join(scene_id))?;
                let robust = gate.scene_count(&robust_root.join(scene_id))?;
                Ok(SceneComparison {
                    scene_id: scene_id.clone(),
                    baseline,
                    robust,
                    outcome: compare(baseline, robust, good),
                })
            })
            .collect::<Result<Vec<_>, PipelineError>>()?;
        Ok(Self { entries })
    }

    pub fn with_outcome(&self, outcome: Comparison) -> impl Iterator<Item = &SceneComparison> {
        self.entries.iter().filter(move |e| e.outcome == outcome)
    }

    pub fn count(&self, outcome: Comparison) -> usize {
        self.with_outcome(outcome).count()
    }

    /// Good scenes, most registered first.
    pub fn good(&self) -> Vec<&SceneComparison> {
        let mut good: Vec<_> = self.with_outcome(Comparison::Good).collect();
        good.sort_by(|a, b| b.robust.cmp(&a.robust));
        good
    }

    /// Improved scenes that did not reach the good threshold, largest gain first.
    pub fn improved_below_good(&self) -> Vec<&SceneComparison> {
        let mut improved: Vec<_> = self.with_outcome(Comparison::Improved).collect();
        improved.sort_by(|a, b| (b.robust - b.baseline).cmp(&(a.robust - a.baseline)));
        improved
    }

    /// Scenes that lost poses, in scan order, at most `limit` of them.
    pub fn worse(&self, limit: usize) -> Vec<&SceneComparison> {
        self.with_outcome(Comparison::Worse).take(limit).collect()
    }

    /// Good scene ids, sorted.
    pub fn good_scene_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.with_outcome(Comparison::Good).map(|e| e.scene_id.clone()).collect();
        ids.sort();
        ids
    }
}

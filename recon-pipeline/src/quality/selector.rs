//! Best-of-N selection across reconstruction runs.
//!
//! Each source is a results root holding `<scene>/sparse/0/images.bin`. Sources
//! are listed in preference order: the first source wins ties, so a challenger
//! only replaces the baseline with strictly more registered poses.

use crate::PipelineError;
use crate::quality::{Quality, QualityGate};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A results root produced by one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSource {
    pub tag: String,
    pub root: PathBuf,
}

impl ResultSource {
    pub fn new(tag: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            tag: tag.into(),
            root: root.into(),
        }
    }
}

/// One configuration's reconstruction of one scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub scene_id: String,
    pub tag: String,
    pub scene_dir: PathBuf,
    pub registered: usize,
}

/// Winning attempt for a scene and how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestResult {
    pub scene_id: String,
    pub winner: Attempt,
    /// Every attempt considered, in preference order.
    pub candidates: Vec<Attempt>,
    pub quality: Quality,
    /// False when the winning scene directory did not exist.
    pub copied: bool,
}

/// Pick the attempt with the most registered poses; earlier attempts win ties.
pub fn select_best(candidates: &[Attempt]) -> Option<&Attempt> {
    let mut iter = candidates.iter();
    let first = iter.next()?;
    Some(iter.fold(first, |best, next| {
        if next.registered > best.registered { next } else { best }
    }))
}

/// Aggregate over a combine run.
#[derive(Debug, Clone, Default)]
pub struct CombineSummary {
    pub results: Vec<BestResult>,
    /// Number of scenes won per source tag.
    pub picks: BTreeMap<String, usize>,
    /// Scenes whose winner is [`Quality::Good`], sorted.
    pub good_scenes: Vec<String>,
}

/// Copies the best attempt of every scene into a combined results root.
#[derive(Debug, Clone)]
pub struct BestResultSelector {
    sources: Vec<ResultSource>,
    destination: PathBuf,
    gate: QualityGate,
}

impl BestResultSelector {
    /// Baseline first, so it is kept on ties.
    pub fn new(baseline: ResultSource, challenger: ResultSource, destination: impl Into<PathBuf>) -> Self {
        Self::with_sources(vec![baseline, challenger], destination)
    }

    /// Any number of sources in preference order.
    pub fn with_sources(sources: Vec<ResultSource>, destination: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            destination: destination.into(),
            gate: QualityGate::default(),
        }
    }

    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Read every source's attempt at a scene.
    pub fn attempts(&self, scene_id: &str) -> Result<Vec<Attempt>, PipelineError> {
        self.sources
            .iter()
            .map(|source| {
                let scene_dir = source.root.join(scene_id);
                Ok(Attempt {
                    scene_id: scene_id.to_string(),
                    tag: source.tag.clone(),
                    registered: self.gate.scene_count(&scene_dir)?,
                    scene_dir,
                })
            })
            .collect()
    }

    /// Select and copy the best attempt for one scene, replacing any earlier copy.
    #[tracing::instrument(skip(self))]
    pub fn combine_scene(&self, scene_id: &str) -> Result<BestResult, PipelineError> {
        let candidates = self.attempts(scene_id)?;
        let winner = select_best(&candidates)
            .cloned()
            .ok_or_else(|| PipelineError::MissingInput(self.destination.join(scene_id)))?;
        let quality = self.gate.classify(winner.registered);

        let destination = self.destination.join(scene_id);
        let copied = if winner.scene_dir.is_dir() {
            if destination.exists() {
                fs::remove_dir_all(&destination)?;
            }
            copy_dir_all(&winner.scene_dir, &destination)?;
            true
        } else {
            debug!("No output for {} under {}", scene_id, winner.tag);
            false
        };

        info!("{}: {} frames ({}) {}", scene_id, winner.registered, winner.tag, quality);
        Ok(BestResult {
            scene_id: scene_id.to_string(),
            winner,
            candidates,
            quality,
            copied,
        })
    }

    /// Combine a set of scenes. Duplicate ids are processed once, so no two
    /// workers ever write the same destination.
    pub fn combine_all(&self, scene_ids: &[String]) -> Result<CombineSummary, PipelineError> {
        fs::create_dir_all(&self.destination)?;
        let unique: Vec<&String> = scene_ids.iter().collect::<BTreeSet<_>>().into_iter().collect();

        let results = unique
            .par_iter()
            .map(|scene_id| self.combine_scene(scene_id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut summary = CombineSummary::default();
        for source in &self.sources {
            summary.picks.insert(source.tag.clone(), 0);
        }
        for result in &results {
            *summary.picks.entry(result.winner.tag.clone()).or_default() += 1;
            if result.quality.is_good() {
                summary.good_scenes.push(result.scene_id.clone());
            }
        }
        summary.good_scenes.sort();
        summary.results = results;
        Ok(summary)
    }
}

/// Scene directories under `root` whose names start with `prefix`, sorted.
pub fn discover_scenes(root: &Path, prefix: &str) -> Result<Vec<String>, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::MissingInput(root.to_path_buf()));
    }
    let mut scenes = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(prefix) {
                scenes.push(name.to_string());
            }
        }
    }
    scenes.sort();
    Ok(scenes)
}

/// Persist scene ids, sorted, one per line.
pub fn write_scene_list(path: &Path, scenes: &[String]) -> Result<(), PipelineError> {
    let mut sorted = scenes.to_vec();
    sorted.sort();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = fs::File::create(path)?;
    for scene in &sorted {
        writeln!(file, "{scene}")?;
    }
    Ok(())
}

/// Read a scene list written by [`write_scene_list`]; blank lines are ignored.
pub fn read_scene_list(path: &Path) -> Result<Vec<String>, PipelineError> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Recursive copy. Symlinks are followed, so linked directories are copied as contents.
fn copy_dir_all(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if fs::metadata(entry.path())?.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(tag: &str, registered: usize) -> Attempt {
        Attempt {
            scene_id: "scene".into(),
            tag: tag.into(),
            scene_dir: PathBuf::from(tag),
            registered,
        }
    }

    #[test]
    fn test_baseline_superior() {
        let candidates = [attempt("ORIG", 30), attempt("ROBUST", 12)];
        assert_eq!(select_best(&candidates).unwrap().tag, "ORIG");
    }

    #[test]
    fn test_tie_prefers_baseline() {
        let candidates = [attempt("ORIG", 10), attempt("ROBUST", 10)];
        assert_eq!(select_best(&candidates).unwrap().tag, "ORIG");
    }

    #[test]
    fn test_challenger_superior() {
        let candidates = [attempt("ORIG", 5), attempt("ROBUST", 40)];
        assert_eq!(select_best(&candidates).unwrap().tag, "ROBUST");
    }

    #[test]
    fn test_first_of_equal_maxima_wins() {
        let candidates = [attempt("A", 3), attempt("B", 9), attempt("C", 9)];
        assert_eq!(select_best(&candidates).unwrap().tag, "B");
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_scene_list_roundtrip_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lists/good.txt");
        write_scene_list(&path, &["scene2".into(), "scene1".into()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "scene1\nscene2\n");
        assert_eq!(read_scene_list(&path).unwrap(), vec!["scene1", "scene2"]);
    }

    #[test]
    fn test_discover_scenes_filters_prefix() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["scene0002_00", "scene0001_00", "other"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("scene_notes.txt"), b"").unwrap();
        assert_eq!(
            discover_scenes(dir.path(), "scene").unwrap(),
            vec!["scene0001_00", "scene0002_00"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_follows_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let shared = dir.path().join("shared_sparse");
        fs::create_dir_all(&shared).unwrap();
        fs::write(shared.join("images.bin"), b"poses").unwrap();

        let scene = dir.path().join("scene0001_00");
        fs::create_dir_all(&scene).unwrap();
        fs::write(scene.join("database.db"), b"db").unwrap();
        std::os::unix::fs::symlink(&shared, scene.join("sparse")).unwrap();

        let out = dir.path().join("out");
        copy_dir_all(&scene, &out).unwrap();
        assert!(out.join("database.db").is_file());
        let sparse = out.join("sparse");
        assert!(!fs::symlink_metadata(&sparse).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(sparse.join("images.bin")).unwrap(), b"poses");
    }
}

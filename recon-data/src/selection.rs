//! Frame selection files.
//!
//! A selection is a JSON object mapping scene id to the ordered list of frame
//! ids to process. Frame ids may be written as strings or as integers.

use crate::{DataError, Scene};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Curated frame subsets per scene, iterated in scene id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSelection {
    scenes: BTreeMap<String, Vec<String>>,
}

impl FrameSelection {
    /// Load a selection from a JSON file.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        debug!("Loading frame selection from: {}", path.display());
        let file = File::open(path)?;
        let raw: BTreeMap<String, Vec<JsonValue>> = serde_json::from_reader(BufReader::new(file))?;
        let selection = Self::from_raw(raw)?;
        info!(
            "Frame selection loaded: {} scenes, {} frames",
            selection.len(),
            selection.total_frames()
        );
        Ok(selection)
    }

    /// Parse a selection from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        let raw: BTreeMap<String, Vec<JsonValue>> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: BTreeMap<String, Vec<JsonValue>>) -> Result<Self, DataError> {
        let mut scenes = BTreeMap::new();
        for (scene, values) in raw {
            let mut frames = Vec::with_capacity(values.len());
            for value in values {
                let id = match value {
                    JsonValue::String(s) => s,
                    JsonValue::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
                    other => {
                        return Err(DataError::InvalidFrameId {
                            scene,
                            value: other.to_string(),
                        });
                    }
                };
                frames.push(id);
            }
            scenes.insert(scene, frames);
        }
        Ok(Self { scenes })
    }

    /// Insert or replace the frame list of a scene.
    pub fn insert(&mut self, scene: impl Into<String>, frames: Vec<String>) {
        self.scenes.insert(scene.into(), frames);
    }

    /// Number of scenes.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Total number of selected frames across all scenes.
    pub fn total_frames(&self) -> usize {
        self.scenes.values().map(Vec::len).sum()
    }

    pub fn contains(&self, scene: &str) -> bool {
        self.scenes.contains_key(scene)
    }

    /// Look up one scene.
    pub fn get(&self, scene: &str) -> Option<Scene> {
        self.scenes
            .get_key_value(scene)
            .map(|(id, frames)| Scene::new(id.clone(), frames.clone()))
    }

    /// Iterate scenes in id order.
    pub fn scenes(&self) -> impl Iterator<Item = Scene> + '_ {
        self.scenes
            .iter()
            .map(|(id, frames)| Scene::new(id.clone(), frames.clone()))
    }

    /// Narrow the selection to a single scene, or `None` if it is not present.
    pub fn only(&self, scene: &str) -> Option<Self> {
        let frames = self.scenes.get(scene)?;
        let mut scenes = BTreeMap::new();
        scenes.insert(scene.to_string(), frames.clone());
        Some(Self { scenes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_string_and_integer_ids() {
        let selection =
            FrameSelection::from_json_str(r#"{"scene0001_00": ["000010", 20, "30"]}"#).unwrap();
        let scene = selection.get("scene0001_00").unwrap();
        assert_eq!(scene.frames, vec!["000010", "20", "30"]);
    }

    #[test]
    fn test_frame_order_is_preserved() {
        let selection =
            FrameSelection::from_json_str(r#"{"a": ["9", "1", "5"], "b": []}"#).unwrap();
        assert_eq!(selection.get("a").unwrap().frames, vec!["9", "1", "5"]);
        assert_eq!(selection.total_frames(), 3);
    }

    #[test]
    fn test_scenes_iterate_in_id_order() {
        let selection =
            FrameSelection::from_json_str(r#"{"scene2": ["1"], "scene1": ["2"]}"#).unwrap();
        let ids: Vec<String> = selection.scenes().map(|s| s.id).collect();
        assert_eq!(ids, vec!["scene1", "scene2"]);
    }

    #[test]
    fn test_rejects_float_frame_id() {
        let err = FrameSelection::from_json_str(r#"{"scene": [1.5]}"#).unwrap_err();
        assert!(matches!(err, DataError::InvalidFrameId { .. }));
    }

    #[test]
    fn test_only_unknown_scene() {
        let selection = FrameSelection::from_json_str(r#"{"scene": ["1"]}"#).unwrap();
        assert!(selection.only("missing").is_none());
        let narrowed = selection.only("scene").unwrap();
        assert_eq!(narrowed.len(), 1);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"scene0000_00": ["0", "1"]}}"#).unwrap();
        let selection = FrameSelection::from_path(file.path()).unwrap();
        assert!(selection.contains("scene0000_00"));
        assert_eq!(selection.total_frames(), 2);
    }
}

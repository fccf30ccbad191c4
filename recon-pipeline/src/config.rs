//! Pipeline configuration
//!
//! Every section falls back to its defaults, so a config file only needs the
//! values it changes:
//!
//! ```json
//! { "engine": { "use_gpu": false }, "robust": { "overlap": 10 } }
//! ```

use crate::PipelineError;
use crate::quality::QualityThresholds;
use crate::reconstruction::{EngineOptions, RobustParams, StandardParams, Strategy};
use recon_data::ResizeSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub resize: ResizeSpec,
    pub quality: QualityThresholds,
    pub engine: EngineOptions,
    pub standard: StandardParams,
    pub robust: RobustParams,
}

impl PipelineConfig {
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Load from `path` if given, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Driver strategy built from the configured parameters.
    pub fn strategy(&self, robust: bool) -> Strategy {
        if robust {
            Strategy::Robust(self.robust.clone())
        } else {
            Strategy::Standard(self.standard.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"engine": {"use_gpu": false}, "quality": {"good": 20}}"#).unwrap();
        assert!(!config.engine.use_gpu);
        assert_eq!(config.engine.camera_model, "SIMPLE_RADIAL");
        assert_eq!(config.quality.good, 20);
        assert_eq!(config.quality.marginal, 15);
        assert_eq!(config.resize, ResizeSpec::square(448));
    }

    #[test]
    fn test_strategy_selection() {
        let config = PipelineConfig::default();
        assert_eq!(config.strategy(true).tag(), "robust");
        assert_eq!(config.strategy(false).tag(), "standard");
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(PipelineConfig::load(None).unwrap(), PipelineConfig::default());
    }
}

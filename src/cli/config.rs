//! Configuration files for CLI commands

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{pipeline::TrainingConfig, q_learning::AgentConfig};

/// Contents of a `--config` file for `train`
///
/// Both sections are optional and fall back to their defaults:
///
/// ```json
/// {
///   "agent": { "learning_rate": 0.2, "epsilon_start": 0.5 },
///   "training": { "episodes": 5000, "learning": "traces" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub agent: AgentConfig,
    pub training: TrainingConfig,
}

impl RunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::LearningMode;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(
            &path,
            r#"{ "agent": { "learning_rate": 0.25 }, "training": { "learning": "traces" } }"#,
        )
        .unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.agent.learning_rate, 0.25);
        assert_eq!(config.agent.discount_factor, 0.9);
        assert_eq!(config.training.learning, LearningMode::Traces);
        assert_eq!(config.training.episodes, 1000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RunConfig::load(dir.path().join("absent.json")).is_err());
        assert_eq!(RunConfig::load_or_default(None).unwrap(), RunConfig::default());
    }
}

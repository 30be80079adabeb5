//! Pipeline configuration, read from an optional TOML file.
//!
//! ```toml
//! acting_user = "calendar-bot"
//! dry_run = false
//! skip_geocoding = true
//! default_lanes = 8
//!
//! [matching]
//! bias_best = 0.97
//! bias_good = 0.90
//! bias_min = 0.80
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::ActingUser;
use crate::error::ConfigError;
use crate::fuzzy::MatchThresholds;
use crate::pool::DEFAULT_LANES;
use crate::resolver::ResolverOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub acting_user: String,
    pub dry_run: bool,
    pub skip_geocoding: bool,
    pub default_lanes: u32,
    pub matching: MatchThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            acting_user: "batch".to_string(),
            dry_run: false,
            skip_geocoding: true,
            default_lanes: DEFAULT_LANES,
            matching: MatchThresholds::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults when `path` is `None`; missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&raw)?;
        debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = toml::from_str(raw)?;
        config.matching.validate()?;
        Ok(config)
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            acting_user: ActingUser::new(self.acting_user.clone()),
            dry_run: self.dry_run,
            skip_geocoding: self.skip_geocoding,
            thresholds: self.matching,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::load(None).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.skip_geocoding);
        assert_eq!(config.default_lanes, 8);
        assert_eq!(config.matching.good, 0.90);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        fs::write(&path, "acting_user = \"steward\"\n\n[matching]\nbias_good = 0.85\n").unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.acting_user, "steward");
        assert_eq!(config.matching.good, 0.85);
        assert_eq!(config.matching.best, 0.97);
        assert!(!config.dry_run);
        assert_eq!(config.resolver_options().acting_user.name(), "steward");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            PipelineConfig::parse("[matching]\nbias_min = 1.2\n"),
            Err(ConfigError::Threshold { name: "min", .. })
        ));
        assert!(matches!(PipelineConfig::parse("dry_run = \"yes\""), Err(ConfigError::Parse(_))));
        assert!(matches!(
            PipelineConfig::load(Some(Path::new("/nonexistent/pipeline.toml"))),
            Err(ConfigError::Read { .. })
        ));
    }
}

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GovernanceError, Result};
use crate::reputation::ReputationTable;

pub const CONFIG_FILE: &str = "config.yaml";

/// Deployment configuration for the governance engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Unacknowledged flags a comment may carry before it is sent back to review
    pub flag_threshold: u32,
    /// Floor for a rating's vote-adjusted weight
    pub min_rating_weight: i32,
    /// Net down-votes that send an active asset back to review; off when unset
    pub down_vote_threshold: Option<i64>,
    pub reputation: ReputationTable,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            flag_threshold: 10,
            min_rating_weight: 0,
            down_vote_threshold: None,
            reputation: ReputationTable::default(),
        }
    }
}

impl GovernanceConfig {
    /// Load `config.yaml` from `dir`, falling back to defaults when absent.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)?;
        let config: GovernanceConfig = serde_yaml::from_str(&text)
            .map_err(|e| GovernanceError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| GovernanceError::Config(format!("YAML serialization failed: {}", e)))?;
        fs::write(dir.join(CONFIG_FILE), yaml)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_rating_weight < 0 {
            return Err(GovernanceError::Config(format!(
                "min_rating_weight must be >= 0, got {}",
                self.min_rating_weight
            )));
        }
        if let Some(threshold) = self.down_vote_threshold {
            if threshold <= 0 {
                return Err(GovernanceError::Config(format!(
                    "down_vote_threshold must be > 0, got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = GovernanceConfig::load(tmp.path()).unwrap();
        assert_eq!(config, GovernanceConfig::default());
        assert_eq!(config.flag_threshold, 10);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "flag_threshold: 3\nreputation:\n  rejected: -10\n",
        )
        .unwrap();

        let config = GovernanceConfig::load(tmp.path()).unwrap();
        assert_eq!(config.flag_threshold, 3);
        assert_eq!(config.reputation.rejected, -10);
        assert_eq!(config.reputation.approved, 1);
        assert_eq!(config.min_rating_weight, 0);
    }

    #[test]
    fn test_negative_min_weight_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "min_rating_weight: -1\n").unwrap();

        let result = GovernanceConfig::load(tmp.path());
        assert!(matches!(result, Err(GovernanceError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let config = GovernanceConfig {
            down_vote_threshold: Some(4),
            ..GovernanceConfig::default()
        };
        config.save(tmp.path()).unwrap();

        assert_eq!(GovernanceConfig::load(tmp.path()).unwrap(), config);
    }
}

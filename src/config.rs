// Game configuration for Memory Match BASE Core
//
// Everything has a default; the JS layer may override fields with a JSON
// object at startup. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

use crate::types::{MemoryMatchError, Result};

/// Default localStorage key for saved progress
pub const DEFAULT_STORAGE_KEY: &str = "memory-match-base:progress";

/// Largest star slack accepted from a config
pub const MAX_STAR_SLACK: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    /// localStorage key the progress JSON lives under
    pub storage_key: String,
    /// Pairs on the board at level 1
    pub base_pairs: usize,
    /// Every this many levels the board gains a pair
    pub levels_per_extra_pair: usize,
    /// Moves over the pair count still worth three stars
    pub three_star_slack: u32,
    /// Moves over the pair count still worth two stars
    pub two_star_slack: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            base_pairs: 2,
            levels_per_extra_pair: 5,
            three_star_slack: 2,
            two_star_slack: 6,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON config. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<GameConfig> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            return Err(MemoryMatchError::InvalidConfig(
                "storageKey must not be empty".to_string(),
            ));
        }
        if self.base_pairs < 2 {
            return Err(MemoryMatchError::InvalidConfig(format!(
                "basePairs must be at least 2, got {}",
                self.base_pairs
            )));
        }
        if self.levels_per_extra_pair == 0 {
            return Err(MemoryMatchError::InvalidConfig(
                "levelsPerExtraPair must be positive".to_string(),
            ));
        }
        if self.two_star_slack > MAX_STAR_SLACK {
            return Err(MemoryMatchError::InvalidConfig(format!(
                "twoStarSlack must be at most {}, got {}",
                MAX_STAR_SLACK, self.two_star_slack
            )));
        }
        if self.two_star_slack < self.three_star_slack {
            return Err(MemoryMatchError::InvalidConfig(format!(
                "twoStarSlack ({}) must not be below threeStarSlack ({})",
                self.two_star_slack, self.three_star_slack
            )));
        }
        Ok(())
    }
}

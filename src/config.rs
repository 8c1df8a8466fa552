//! Configuration for dynamic queries.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DynamicQueryError, Result};
use crate::query::function_score::{BoostMode, CombinePolicy, ScoreMode};

/// Defaults applied to every query built with this configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QueryConfig {
    /// Initial boost mode of the function score policy.
    pub boost_mode: BoostMode,
    /// Initial score mode of the function score policy.
    pub score_mode: ScoreMode,
    /// Initial function score cap.
    pub max_boost: Option<f32>,
    /// Highlight presentation settings.
    pub highlight: HighlightConfig,
}

impl QueryConfig {
    /// Parse a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: QueryConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_boost) = self.max_boost {
            CombinePolicy::check_max_boost(max_boost).map_err(|_| {
                DynamicQueryError::config(format!(
                    "max_boost must be a non-negative number, got {max_boost}"
                ))
            })?;
        }
        if self.highlight.pre_tags.len() != self.highlight.post_tags.len() {
            return Err(DynamicQueryError::config(
                "highlight pre_tags and post_tags must have the same length",
            ));
        }
        Ok(())
    }

    /// Function score policy seeded from this configuration.
    pub fn combine_policy(&self) -> CombinePolicy {
        CombinePolicy {
            boost_mode: self.boost_mode,
            score_mode: self.score_mode,
            max_boost: self.max_boost,
        }
    }
}

/// Presentation settings of highlighted fragments.
///
/// Unset values are left to the backend's defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HighlightConfig {
    /// Markup inserted before each highlighted term.
    pub pre_tags: Vec<String>,
    /// Markup inserted after each highlighted term.
    pub post_tags: Vec<String>,
    /// Fragment size in characters.
    pub fragment_size: Option<u32>,
    /// Maximum number of fragments per field.
    pub number_of_fragments: Option<u32>,
}

impl HighlightConfig {
    /// Check whether every setting is left to the backend.
    pub fn is_default(&self) -> bool {
        *self == HighlightConfig::default()
    }
}

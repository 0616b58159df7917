// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session configuration, stored as RON.

use crate::error::{SessionError, SessionResult};
use crate::logging::DEFAULT_FILTER;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for an [`AnimationSession`](crate::AnimationSession)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length in frames of sampling and keyframe handles
    pub handle_offset: f64,
    /// Length of newly added effects
    pub default_duration: i64,
    /// Shortest allowed effect
    pub min_duration: i64,
    /// Key prefix of persisted effect entries
    pub store_prefix: String,
    /// Tracing filter used by [`init_logging`](crate::init_logging)
    pub log_filter: String,
    /// Fixed session seed; random when unset
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handle_offset: 5.0,
            default_duration: 20,
            min_duration: 1,
            store_prefix: "fx_".to_string(),
            log_filter: DEFAULT_FILTER.to_string(),
            seed: None,
        }
    }
}

impl SessionConfig {
    /// Parse a RON document
    pub fn from_ron_str(text: &str) -> SessionResult<Self> {
        let config: SessionConfig =
            ron::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty RON
    pub fn to_ron_string(&self) -> SessionResult<String> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        ron::ser::to_string_pretty(self, pretty).map_err(|e| SessionError::Config(e.to_string()))
    }

    /// Load from a file
    pub fn load(path: &Path) -> SessionResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Save to a file
    pub fn save(&self, path: &Path) -> SessionResult<()> {
        std::fs::write(path, self.to_ron_string()?)?;
        Ok(())
    }

    fn validate(&self) -> SessionResult<()> {
        if self.handle_offset.is_nan() || self.handle_offset <= 0.0 {
            return Err(SessionError::Config(format!(
                "handle_offset must be positive, got {}",
                self.handle_offset
            )));
        }
        if self.min_duration < 0 || self.default_duration < self.min_duration {
            return Err(SessionError::Config(format!(
                "durations out of order: min {} default {}",
                self.min_duration, self.default_duration
            )));
        }
        Ok(())
    }
}

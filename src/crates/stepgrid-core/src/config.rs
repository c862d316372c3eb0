//! Import and quantization options
//!
//! Every field has a default so a partial JSON document (or none at all)
//! yields a usable configuration.

use crate::grid::{DEFAULT_STEPS_PER_BEAT, MIN_STEP_COUNT};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default waveform resolution
pub const DEFAULT_POINT_COUNT: usize = 2000;

/// Upper bound for `pointCount`, far beyond any display width
pub const MAX_POINT_COUNT: usize = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Steps per quarter note (4 = sixteenth-note grid)
    pub steps_per_beat: u32,
    /// Number of points in a waveform envelope
    pub point_count: usize,
    /// Snap loop selections to grid lines before computing the playback rate
    pub grid_snap: bool,
    /// Desired grid length; imports never produce fewer steps than this
    pub target_step_count: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            steps_per_beat: DEFAULT_STEPS_PER_BEAT,
            point_count: DEFAULT_POINT_COUNT,
            grid_snap: true,
            target_step_count: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps_per_beat == 0 {
            return Err(ConfigError::Invalid("stepsPerBeat must be at least 1".into()));
        }
        if self.point_count == 0 {
            return Err(ConfigError::Invalid("pointCount must be at least 1".into()));
        }
        if self.point_count > MAX_POINT_COUNT {
            return Err(ConfigError::Invalid(format!(
                "pointCount must be at most {}",
                MAX_POINT_COUNT
            )));
        }
        if self.target_step_count == Some(0) {
            return Err(ConfigError::Invalid("targetStepCount must be at least 1".into()));
        }
        Ok(())
    }

    /// Grid length to use when nothing else determines it
    pub fn step_count(&self) -> u32 {
        self.target_step_count.unwrap_or(MIN_STEP_COUNT)
    }

    /// Lower bound for an imported pattern's step count
    pub fn min_step_count(&self) -> u32 {
        self.target_step_count
            .map_or(MIN_STEP_COUNT, |target| target.max(MIN_STEP_COUNT))
    }
}

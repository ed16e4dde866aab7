//! Typed pipeline configuration
//!
//! Window geometry and sampling rate form a contract between training and
//! inference: a model trained on 250-sample windows at 50 Hz only accepts
//! feature vectors computed the same way. Nothing here enforces that the two
//! sides agree, callers compare [`PipelineConfig`] values and warn.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

pub const DEFAULT_WINDOW_SIZE: usize = 250;
pub const DEFAULT_STEP_SIZE: usize = 250;
pub const DEFAULT_SAMPLING_RATE: f64 = 50.0;
pub const DEFAULT_WINDOW_DURATION: u64 = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Samples per window
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Samples between consecutive window starts
    #[serde(default = "default_step_size")]
    pub step_size: usize,
    /// Hz, scales the jerk finite difference
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate: f64,
    /// Seconds credited to an activity per predicted window
    #[serde(default = "default_window_duration")]
    pub window_duration: u64,
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_step_size() -> usize {
    DEFAULT_STEP_SIZE
}

fn default_sampling_rate() -> f64 {
    DEFAULT_SAMPLING_RATE
}

fn default_window_duration() -> u64 {
    DEFAULT_WINDOW_DURATION
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            step_size: DEFAULT_STEP_SIZE,
            sampling_rate: DEFAULT_SAMPLING_RATE,
            window_duration: DEFAULT_WINDOW_DURATION,
        }
    }
}

impl PipelineConfig {
    /// Build a validated configuration.
    pub fn new(
        window_size: usize,
        step_size: usize,
        sampling_rate: f64,
        window_duration: u64,
    ) -> PipelineResult<Self> {
        let config = Self {
            window_size,
            step_size,
            sampling_rate,
            window_duration,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file. Absent fields take their defaults, unknown
    /// fields are rejected.
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> PipelineResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        // Jerk needs at least one difference per window.
        if self.window_size < 2 {
            return Err(PipelineError::InvalidConfig(format!(
                "window_size must be at least 2 (got {})",
                self.window_size
            )));
        }
        if self.step_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "step_size must be positive".to_string(),
            ));
        }
        if !self.sampling_rate.is_finite() || self.sampling_rate <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "sampling_rate must be a positive number (got {})",
                self.sampling_rate
            )));
        }
        if self.window_duration == 0 {
            return Err(PipelineError::InvalidConfig(
                "window_duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Seconds actually covered by one window at the configured rate.
    pub fn window_span_secs(&self) -> f64 {
        self.window_size as f64 / self.sampling_rate
    }
}

/// Settings for the offline training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainerConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Fraction of windows held out for evaluation
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Seed for the train/test shuffle
    #[serde(default = "default_random_state")]
    pub random_state: u64,
}

fn default_test_size() -> f64 {
    0.2
}

fn default_random_state() -> u64 {
    42
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            test_size: default_test_size(),
            random_state: default_random_state(),
        }
    }
}

impl TrainerConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| PipelineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        self.pipeline.validate()?;
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "test_size must lie strictly between 0 and 1 (got {})",
                self.test_size
            )));
        }
        Ok(())
    }
}

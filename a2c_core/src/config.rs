//! Configuration for the A2C training core.
//!
//! All fields carry defaults; the builder methods mirror the field names.
//! `validate()` is run by the agent constructor, so an invalid configuration
//! never reaches a learning pass.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::normalization::{ObsNormalizationConfig, ReturnNormalizationConfig};

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A count parameter must be positive.
    #[error("{field} must be > 0, got {value}")]
    InvalidCount { field: &'static str, value: usize },

    /// A parameter is outside its valid range.
    #[error("{field} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Configuration for an [`A2C`](crate::agents::A2C) agent and its segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A2CConfig {
    /// Timesteps per segment (N). A learning pass runs every N updates.
    pub segment_size: usize,
    /// Critic mini-batches drawn per learning pass.
    pub batch_iterations: usize,
    /// Transitions per critic mini-batch. `None` uses the whole segment.
    pub batch_size: Option<usize>,
    /// Discount factor (gamma).
    pub discount_factor: f32,
    /// Trace decay (lambda) of the advantage estimator.
    pub trace_decay: f32,
    /// Learning rate handed to the actor optimizer.
    pub actor_learning_rate: f64,
    /// Learning rate handed to the critic optimizer.
    pub critic_learning_rate: f64,
    /// Standardize advantages before the actor update.
    /// The segment's stored advantages are left untouched.
    pub normalize_advantages: bool,
    /// Observation normalizer settings. `None` disables the normalizer.
    pub observation_normalization: Option<ObsNormalizationConfig>,
    /// Return normalizer settings. `None` disables the normalizer.
    pub return_normalization: Option<ReturnNormalizationConfig>,
}

impl Default for A2CConfig {
    fn default() -> Self {
        Self {
            segment_size: 4096,
            batch_iterations: 80,
            batch_size: None,
            discount_factor: 0.98,
            trace_decay: 0.97,
            actor_learning_rate: 3e-4,
            critic_learning_rate: 1e-3,
            normalize_advantages: true,
            observation_normalization: Some(ObsNormalizationConfig::default()),
            return_normalization: None,
        }
    }
}

impl A2CConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segment_size(mut self, segment_size: usize) -> Self {
        self.segment_size = segment_size;
        self
    }

    pub fn with_batch_iterations(mut self, batch_iterations: usize) -> Self {
        self.batch_iterations = batch_iterations;
        self
    }

    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_discount_factor(mut self, discount_factor: f32) -> Self {
        self.discount_factor = discount_factor;
        self
    }

    pub fn with_trace_decay(mut self, trace_decay: f32) -> Self {
        self.trace_decay = trace_decay;
        self
    }

    pub fn with_actor_learning_rate(mut self, lr: f64) -> Self {
        self.actor_learning_rate = lr;
        self
    }

    pub fn with_critic_learning_rate(mut self, lr: f64) -> Self {
        self.critic_learning_rate = lr;
        self
    }

    pub fn with_normalize_advantages(mut self, normalize: bool) -> Self {
        self.normalize_advantages = normalize;
        self
    }

    pub fn with_observation_normalization(
        mut self,
        config: Option<ObsNormalizationConfig>,
    ) -> Self {
        self.observation_normalization = config;
        self
    }

    pub fn with_return_normalization(mut self, config: Option<ReturnNormalizationConfig>) -> Self {
        self.return_normalization = config;
        self
    }

    /// Validate all configuration parameters.
    ///
    /// # Validation Rules
    /// - `segment_size` and `batch_iterations` must be > 0
    /// - `batch_size`, when set, must be > 0
    /// - `discount_factor` and `trace_decay` must be in [0.0, 1.0]
    /// - learning rates must be finite and positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_size == 0 {
            return Err(ConfigError::InvalidCount {
                field: "segment_size",
                value: 0,
            });
        }
        if self.batch_iterations == 0 {
            return Err(ConfigError::InvalidCount {
                field: "batch_iterations",
                value: 0,
            });
        }
        if let Some(batch_size) = self.batch_size {
            if batch_size == 0 {
                return Err(ConfigError::InvalidCount {
                    field: "batch_size",
                    value: 0,
                });
            }
        }

        check_unit_range("discount_factor", self.discount_factor)?;
        check_unit_range("trace_decay", self.trace_decay)?;
        check_learning_rate("actor_learning_rate", self.actor_learning_rate)?;
        check_learning_rate("critic_learning_rate", self.critic_learning_rate)?;

        Ok(())
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }
}

fn check_unit_range(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: value as f64,
            min: 0.0,
            max: 1.0,
        })
    }
}

fn check_learning_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: f64::MIN_POSITIVE,
            max: f64::MAX,
        })
    }
}

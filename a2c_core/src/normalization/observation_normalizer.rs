//! Observation normalization using running mean and standard deviation.
//!
//! Different observation components often live on very different scales;
//! normalizing them keeps every input contributing to the gradient.
//!
//! # Usage
//!
//! ```ignore
//! let mut normalizer = ObservationNormalizer::with_config(4, ObsNormalizationConfig::default());
//!
//! normalizer.record(&observations)?;   // every environment step
//! normalizer.update()?;                // once per learning pass
//! let input = normalizer.normalize_tensor(obs_tensor);
//! ```

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::algorithms::tensor_ops::rows_to_tensor;
use crate::core::RunningMeanStd;
use crate::error::{A2CError, Result};

/// Configuration for observation normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsNormalizationConfig {
    /// Clip normalized observations to this range.
    pub clip_range: Option<(f32, f32)>,
    /// Floor on the standard deviation.
    pub epsilon: f64,
    /// Fold recorded observations into the statistics on `update`.
    /// With `false` the statistics stay frozen.
    pub update_stats: bool,
}

impl Default for ObsNormalizationConfig {
    fn default() -> Self {
        Self {
            clip_range: Some((-10.0, 10.0)),
            epsilon: 1e-8,
            update_stats: true,
        }
    }
}

impl ObsNormalizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clip_range(mut self, range: Option<(f32, f32)>) -> Self {
        self.clip_range = range;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_update_stats(mut self, update: bool) -> Self {
        self.update_stats = update;
        self
    }
}

/// Observation normalizer with deferred statistics updates.
#[derive(Debug, Clone)]
pub struct ObservationNormalizer {
    stats: RunningMeanStd,
    /// Raw observations recorded since the last `update`, row-major.
    pending: Vec<f32>,
    config: ObsNormalizationConfig,
}

impl ObservationNormalizer {
    pub fn new(obs_dim: usize) -> Self {
        Self::with_config(obs_dim, ObsNormalizationConfig::default())
    }

    pub fn with_config(obs_dim: usize, config: ObsNormalizationConfig) -> Self {
        Self {
            stats: RunningMeanStd::with_epsilon(obs_dim, config.epsilon),
            pending: Vec::new(),
            config,
        }
    }

    pub fn obs_dim(&self) -> usize {
        self.stats.dim()
    }

    /// Observations folded into the statistics so far.
    pub fn count(&self) -> f64 {
        self.stats.count()
    }

    /// Observations recorded but not yet folded in.
    pub fn pending(&self) -> usize {
        if self.obs_dim() == 0 {
            0
        } else {
            self.pending.len() / self.obs_dim()
        }
    }

    /// Buffer a flat batch of raw observations for the next `update`.
    pub fn record(&mut self, batch: &[f32]) -> Result<()> {
        let dim = self.obs_dim();
        if dim > 0 && batch.len() % dim != 0 {
            return Err(A2CError::shape(
                "recorded observations",
                batch.len() - batch.len() % dim,
                batch.len(),
            ));
        }
        self.pending.extend_from_slice(batch);
        Ok(())
    }

    /// Fold the recorded observations into the statistics and clear them.
    pub fn update(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if self.config.update_stats {
            self.stats.update_batch(&pending)?;
        }
        Ok(())
    }

    /// Normalize a flat batch without touching the statistics.
    pub fn normalize(&self, batch: &[f32]) -> Vec<f32> {
        match self.config.clip_range {
            Some(range) => self.stats.normalize_and_clip(batch, range),
            None => self.stats.normalize(batch),
        }
    }

    /// Normalize a `[batch_size, obs_dim]` tensor.
    pub fn normalize_tensor<B: Backend>(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = obs.device();

        let mean: Vec<f32> = self.stats.mean().iter().map(|&x| x as f32).collect();
        let std: Vec<f32> = self.stats.std_vec().iter().map(|&x| x as f32).collect();
        let mean = rows_to_tensor::<B>(&mean, mean.len(), &device);
        let std = rows_to_tensor::<B>(&std, std.len(), &device);

        let normalized = (obs - mean) / std;
        match self.config.clip_range {
            Some((low, high)) => normalized.clamp(low, high),
            None => normalized,
        }
    }

    pub fn stats(&self) -> &RunningMeanStd {
        &self.stats
    }

    pub fn config(&self) -> &ObsNormalizationConfig {
        &self.config
    }

    /// Toggle statistics updates, e.g. off for evaluation.
    ///
    /// While frozen, `update` discards what was recorded.
    pub fn set_training(&mut self, training: bool) {
        self.config.update_stats = training;
    }
}

//! Return-scale normalization for the critic.
//!
//! Tracks the running standard deviation of per-environment discounted
//! returns `G_t = r_t + γ G_{t-1}` (reset at episode starts). The critic then
//! works in units of that scale: its raw outputs are multiplied back by the
//! scale before advantage computation, and its regression targets are divided
//! by it. Values are only rescaled, never shifted, so the sign of a return and
//! the zero of the value function are preserved.

use serde::{Deserialize, Serialize};

use crate::core::RunningScalarStats;
use crate::error::{ensure_len, Result};

/// Configuration for return normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnNormalizationConfig {
    /// Floor on the return scale.
    pub epsilon: f64,
    /// Clip normalized targets to this range.
    pub clip_range: Option<(f32, f32)>,
    pub update_stats: bool,
}

impl Default for ReturnNormalizationConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-8,
            clip_range: None,
            update_stats: true,
        }
    }
}

impl ReturnNormalizationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_clip_range(mut self, range: Option<(f32, f32)>) -> Self {
        self.clip_range = range;
        self
    }

    pub fn with_update_stats(mut self, update: bool) -> Self {
        self.update_stats = update;
        self
    }
}

/// Running scale of discounted returns with deferred updates.
#[derive(Debug, Clone)]
pub struct ReturnNormalizer {
    stats: RunningScalarStats,
    discount_factor: f32,
    /// Discounted return per environment, carried across flushes.
    running: Vec<f32>,
    /// `(rewards, resets)` recorded since the last update, one entry per step.
    pending: Vec<(Vec<f32>, Vec<bool>)>,
    config: ReturnNormalizationConfig,
}

impl ReturnNormalizer {
    pub fn new(discount_factor: f32, config: ReturnNormalizationConfig) -> Self {
        Self {
            stats: RunningScalarStats::with_epsilon(config.epsilon),
            discount_factor,
            running: Vec::new(),
            pending: Vec::new(),
            config,
        }
    }

    /// Buffer one step of rewards; `resets[i]` marks the start of a new episode.
    pub fn record(&mut self, rewards: &[f32], resets: &[bool]) -> Result<()> {
        ensure_len("recorded resets", rewards.len(), resets.len())?;
        if let Some((first, _)) = self.pending.first() {
            ensure_len("recorded rewards", first.len(), rewards.len())?;
        } else if !self.running.is_empty() {
            ensure_len("recorded rewards", self.running.len(), rewards.len())?;
        }
        self.pending.push((rewards.to_vec(), resets.to_vec()));
        Ok(())
    }

    /// Fold the recorded steps into the return statistics.
    pub fn update(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if !self.config.update_stats {
            return Ok(());
        }

        for (rewards, resets) in pending {
            if self.running.len() != rewards.len() {
                self.running = vec![0.0; rewards.len()];
            }
            for (env, (&reward, &reset)) in rewards.iter().zip(&resets).enumerate() {
                let carried = if reset { 0.0 } else { self.running[env] };
                self.running[env] = reward + self.discount_factor * carried;
            }
            self.stats.update_batch(&self.running);
        }
        Ok(())
    }

    /// Current return scale.
    pub fn scale(&self) -> f32 {
        self.stats.std().max(self.config.epsilon) as f32
    }

    /// Map a raw return target into critic units.
    pub fn normalize(&self, values: &[f32]) -> Vec<f32> {
        let scale = self.scale();
        values
            .iter()
            .map(|&v| {
                let v = v / scale;
                match self.config.clip_range {
                    Some((low, high)) => v.clamp(low, high),
                    None => v,
                }
            })
            .collect()
    }

    /// Map critic outputs back to raw return units.
    pub fn denormalize(&self, values: &[f32]) -> Vec<f32> {
        let scale = self.scale();
        values.iter().map(|&v| v * scale).collect()
    }

    pub fn stats(&self) -> &RunningScalarStats {
        &self.stats
    }

    pub fn config(&self) -> &ReturnNormalizationConfig {
        &self.config
    }

    /// Toggle statistics updates, e.g. off for evaluation.
    pub fn set_training(&mut self, training: bool) {
        self.config.update_stats = training;
    }
}

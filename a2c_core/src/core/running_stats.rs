//! Running statistics using Welford's online algorithm.
//!
//! Backs both normalizers. Statistics are folded in whole batches: a batch is
//! summarized on its own and then merged with the parallel form of Welford's
//! update, so one flush costs a single pass over the recorded values.
//!
//! # Example
//! ```ignore
//! use a2c_core::core::RunningMeanStd;
//!
//! let mut stats = RunningMeanStd::new(2);
//! stats.update_batch(&[1.0, 2.0, 3.0, 4.0])?;
//! let normalized = stats.normalize(&[2.0, 3.0]);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ensure_len, Result};

/// Running mean and standard deviation per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningMeanStd {
    mean: Vec<f64>,
    /// Sum of squared deviations per dimension; variance = var_sum / count.
    var_sum: Vec<f64>,
    count: f64,
    epsilon: f64,
}

impl RunningMeanStd {
    /// Create statistics for `dim`-dimensional vectors.
    pub fn new(dim: usize) -> Self {
        Self::with_epsilon(dim, 1e-8)
    }

    /// Create with a custom epsilon floor on the standard deviation.
    pub fn with_epsilon(dim: usize, epsilon: f64) -> Self {
        Self {
            mean: vec![0.0; dim],
            var_sum: vec![0.0; dim],
            count: 0.0,
            epsilon,
        }
    }

    /// Fold a single vector into the statistics.
    pub fn update(&mut self, obs: &[f32]) -> Result<()> {
        ensure_len("running stats sample", self.dim(), obs.len())?;

        self.count += 1.0;
        for (i, &x) in obs.iter().enumerate() {
            let x = x as f64;
            let delta = x - self.mean[i];
            self.mean[i] += delta / self.count;
            self.var_sum[i] += delta * (x - self.mean[i]);
        }
        Ok(())
    }

    /// Fold a flat batch `[v0, v1, ...]` of `dim`-sized vectors.
    ///
    /// An empty batch leaves the statistics unchanged.
    pub fn update_batch(&mut self, batch: &[f32]) -> Result<()> {
        let dim = self.dim();
        if dim == 0 || batch.is_empty() {
            return Ok(());
        }
        if batch.len() % dim != 0 {
            return Err(crate::error::A2CError::shape(
                "running stats batch",
                (batch.len() / dim + 1) * dim,
                batch.len(),
            ));
        }

        let mut summary = RunningMeanStd::with_epsilon(dim, self.epsilon);
        for obs in batch.chunks_exact(dim) {
            summary.update(obs)?;
        }
        self.merge(&summary);
        Ok(())
    }

    /// Normalize a vector to zero mean and unit variance.
    pub fn normalize(&self, obs: &[f32]) -> Vec<f32> {
        let dim = self.dim();
        obs.iter()
            .enumerate()
            .map(|(i, &x)| ((x as f64 - self.mean[i % dim]) / self.std(i % dim)) as f32)
            .collect()
    }

    /// Normalize and clamp each component into `clip_range`.
    pub fn normalize_and_clip(&self, obs: &[f32], clip_range: (f32, f32)) -> Vec<f32> {
        self.normalize(obs)
            .into_iter()
            .map(|x| x.clamp(clip_range.0, clip_range.1))
            .collect()
    }

    #[inline]
    fn std(&self, i: usize) -> f64 {
        if self.count < 2.0 {
            1.0
        } else {
            (self.var_sum[i] / self.count).sqrt().max(self.epsilon)
        }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Population variance per dimension. Reads 1.0 until two samples are seen.
    pub fn variance(&self) -> Vec<f64> {
        if self.count < 2.0 {
            vec![1.0; self.dim()]
        } else {
            self.var_sum.iter().map(|&v| v / self.count).collect()
        }
    }

    pub fn std_vec(&self) -> Vec<f64> {
        (0..self.dim()).map(|i| self.std(i)).collect()
    }

    pub fn count(&self) -> f64 {
        self.count
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Merge another set of statistics (parallel Welford).
    ///
    /// Dimensions must match; a mismatched `other` is ignored.
    pub fn merge(&mut self, other: &RunningMeanStd) {
        if other.count == 0.0 || other.dim() != self.dim() {
            return;
        }
        if self.count == 0.0 {
            self.mean.copy_from_slice(&other.mean);
            self.var_sum.copy_from_slice(&other.var_sum);
            self.count = other.count;
            return;
        }

        let total = self.count + other.count;
        for i in 0..self.dim() {
            let delta = other.mean[i] - self.mean[i];
            self.mean[i] += delta * other.count / total;
            // M2 = M2_a + M2_b + delta^2 * n_a * n_b / n
            self.var_sum[i] += other.var_sum[i] + delta * delta * self.count * other.count / total;
        }
        self.count = total;
    }

}

/// Running statistics for a scalar stream, e.g. discounted returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningScalarStats {
    mean: f64,
    var_sum: f64,
    count: f64,
    epsilon: f64,
}

impl RunningScalarStats {
    pub fn new() -> Self {
        Self::with_epsilon(1e-8)
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            mean: 0.0,
            var_sum: 0.0,
            count: 0.0,
            epsilon,
        }
    }

    pub fn update(&mut self, x: f32) {
        self.count += 1.0;
        let x = x as f64;
        let delta = x - self.mean;
        self.mean += delta / self.count;
        self.var_sum += delta * (x - self.mean);
    }

    pub fn update_batch(&mut self, values: &[f32]) {
        for &x in values {
            self.update(x);
        }
    }

    /// Standard deviation, floored at epsilon. Reads 1.0 until two samples are seen.
    pub fn std(&self) -> f64 {
        if self.count < 2.0 {
            1.0
        } else {
            (self.var_sum / self.count).sqrt().max(self.epsilon)
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn count(&self) -> f64 {
        self.count
    }

}

impl Default for RunningScalarStats {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-timestep transition records.
//!
//! A [`TransitionStep`] carries one timestep for every parallel environment,
//! row-major: `observations` holds `n_envs` rows of `obs_dim` floats, `rewards`
//! holds one value per environment, and so on. The segment copies it into its
//! arena; nothing is retained by reference.

use crate::error::{ensure_len, A2CError, Result};

/// One timestep of `n_envs` environments, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct TransitionStep<'a> {
    /// Observations the actions were chosen from.
    pub observations: &'a [f32],
    pub actions: &'a [f32],
    /// Observations after the environment step. Pre-reset on episode ends.
    pub next_observations: &'a [f32],
    pub rewards: &'a [f32],
    /// True where this transition is the first of a new episode.
    pub resets: &'a [bool],
    /// True where the next observation is a genuine terminal state.
    pub terminations: &'a [bool],
    /// Summed log-probability of each action under the behavior policy.
    pub log_probs: &'a [f32],
}

/// Row widths of a transition, fixed per segment by the first store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepShape {
    pub n_envs: usize,
    pub obs_dim: usize,
    pub act_dim: usize,
}

impl<'a> TransitionStep<'a> {
    /// Number of environments, taken from the reward column.
    pub fn n_envs(&self) -> usize {
        self.rewards.len()
    }

    /// Infer the shape of this step and check every column against it.
    pub fn shape(&self) -> Result<StepShape> {
        let n_envs = self.n_envs();
        if n_envs == 0 {
            return Err(A2CError::shape("rewards", 1, 0));
        }
        if self.observations.len() % n_envs != 0 {
            return Err(A2CError::shape(
                "observations",
                (self.observations.len() / n_envs + 1) * n_envs,
                self.observations.len(),
            ));
        }
        if self.actions.len() % n_envs != 0 {
            return Err(A2CError::shape(
                "actions",
                (self.actions.len() / n_envs + 1) * n_envs,
                self.actions.len(),
            ));
        }
        let shape = StepShape {
            n_envs,
            obs_dim: self.observations.len() / n_envs,
            act_dim: self.actions.len() / n_envs,
        };
        self.check(&shape)?;
        Ok(shape)
    }

    /// Check every column against an already known shape.
    pub fn check(&self, shape: &StepShape) -> Result<()> {
        let n = shape.n_envs;
        ensure_len("observations", n * shape.obs_dim, self.observations.len())?;
        ensure_len("actions", n * shape.act_dim, self.actions.len())?;
        ensure_len("next_observations", n * shape.obs_dim, self.next_observations.len())?;
        ensure_len("rewards", n, self.rewards.len())?;
        ensure_len("resets", n, self.resets.len())?;
        ensure_len("terminations", n, self.terminations.len())?;
        ensure_len("log_probs", n, self.log_probs.len())
    }
}

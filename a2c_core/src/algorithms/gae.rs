//! Decayed, bootstrapped advantage estimation over a segment.
//!
//! For every environment, walking backward from the last timestep:
//!
//! ```text
//! δ_t = r_t + γ (1 - term_t) V'(t) - V(t)
//! A_t = δ_t + γ λ (1 - reset_{t+1}) A_{t+1},   A_N = 0
//! R_t = A_t + V(t)
//! ```
//!
//! `V'(t)` is the critic's value of the stored next observation of step t, so
//! the bootstrap never reads across an episode boundary. A termination only
//! removes the bootstrap of its own step. A reset on step t+1 marks the start
//! of a new episode and cuts the trace flowing back into step t.
//!
//! ## References
//!
//! - Schulman et al., "High-Dimensional Continuous Control Using
//!   Generalized Advantage Estimation" (2016)

use crate::error::{ensure_len, A2CError, Result};

/// Inputs of one advantage computation, interleaved step-major
/// (`index = t * n_envs + env`).
#[derive(Debug, Clone, Copy)]
pub struct AdvantageInputs<'a> {
    pub rewards: &'a [f32],
    pub values: &'a [f32],
    pub next_values: &'a [f32],
    pub resets: &'a [bool],
    pub terminations: &'a [bool],
    pub n_envs: usize,
}

/// Compute advantages and return targets for an interleaved segment.
///
/// # Returns
///
/// `(advantages, returns)`, both laid out like the inputs.
///
/// # Errors
///
/// `ShapeMismatch` when a column length differs from `rewards.len()` or is not
/// a multiple of `n_envs`.
pub fn compute_advantages(
    inputs: AdvantageInputs<'_>,
    gamma: f32,
    lambda: f32,
) -> Result<(Vec<f32>, Vec<f32>)> {
    let AdvantageInputs {
        rewards,
        values,
        next_values,
        resets,
        terminations,
        n_envs,
    } = inputs;

    let total = rewards.len();
    ensure_len("values", total, values.len())?;
    ensure_len("next_values", total, next_values.len())?;
    ensure_len("resets", total, resets.len())?;
    ensure_len("terminations", total, terminations.len())?;
    if n_envs == 0 {
        return Err(A2CError::shape("n_envs", 1, 0));
    }
    if total % n_envs != 0 {
        return Err(A2CError::shape("rewards", total - total % n_envs, total));
    }

    let steps = total / n_envs;
    let mut advantages = vec![0.0f32; total];
    let mut returns = vec![0.0f32; total];
    // A_{t+1} per environment; A_N = 0.
    let mut trace = vec![0.0f32; n_envs];

    for t in (0..steps).rev() {
        for env in 0..n_envs {
            let i = t * n_envs + env;

            let not_terminal = if terminations[i] { 0.0 } else { 1.0 };
            let delta = rewards[i] + gamma * not_terminal * next_values[i] - values[i];

            let continues = t + 1 < steps && !resets[i + n_envs];
            let carried = if continues { gamma * lambda * trace[env] } else { 0.0 };

            let advantage = delta + carried;
            trace[env] = advantage;
            advantages[i] = advantage;
            returns[i] = advantage + values[i];
        }
    }

    Ok((advantages, returns))
}

/// Standardize advantages to zero mean and unit variance.
///
/// # Edge Cases
///
/// - Empty slice: no-op
/// - Single element: set to 0.0
/// - Constant values: all set to 0.0 (epsilon keeps the division finite)
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.is_empty() {
        return;
    }
    if advantages.len() == 1 {
        advantages[0] = 0.0;
        return;
    }

    let n = advantages.len() as f32;
    let mean = advantages.iter().sum::<f32>() / n;
    let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n;
    let std = (variance + 1e-8).sqrt();

    for a in advantages.iter_mut() {
        *a = (*a - mean) / std;
    }
}

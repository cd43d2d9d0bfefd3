//! Loss functions for the actor and critic updates.

use burn::tensor::{backend::Backend, Tensor};

/// Vanilla policy gradient loss (tensor computation for gradient).
///
/// L(θ) = -E[log π_θ(a|s) · A]
///
/// # Arguments
///
/// * `log_probs` - Current policy log probs, summed over action dims: [batch_size]
/// * `advantages` - Advantage estimates: [batch_size]
pub fn policy_gradient_loss<B: Backend>(
    log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
) -> Tensor<B, 1> {
    (log_probs * advantages).mean().neg()
}

/// Squared-error value loss: E[(V(s) - R)²].
pub fn value_loss<B: Backend>(values: Tensor<B, 1>, returns: Tensor<B, 1>) -> Tensor<B, 1> {
    (values - returns).powf_scalar(2.0).mean()
}

/// Approximate KL divergence between behavior and current policy:
/// E[log π_old(a|s) - log π(a|s)].
pub fn approx_kl<B: Backend>(old_log_probs: Tensor<B, 1>, log_probs: Tensor<B, 1>) -> Tensor<B, 1> {
    (old_log_probs - log_probs).mean()
}

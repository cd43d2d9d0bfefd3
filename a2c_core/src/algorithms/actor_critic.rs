//! Actor and critic model traits.
//!
//! Both traits work with any `B: Backend`, so the same model type serves the
//! autodiff backend during updates and the inner backend after
//! [`AutodiffModule::valid`](burn::module::AutodiffModule::valid) during
//! action selection and value estimation.
//!
//! # Usage Pattern
//!
//! ```ignore
//! // Update: forward pass on the autodiff backend builds a graph.
//! let distribution = actor.forward(observations);
//! let loss = policy_gradient_loss(sum_last(distribution.log_prob(actions)), advantages);
//!
//! // Inference: inner backend, no graph.
//! let distribution = actor.valid().forward(observations);
//! ```

use burn::module::Module;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::distributions::PolicyDistribution;

/// Policy network: observations to an action distribution.
pub trait ActorModel<B: Backend>: Module<B> {
    type Distribution: PolicyDistribution<B>;

    /// `observations`: [batch, obs_dim]
    fn forward(&self, observations: Tensor<B, 2>) -> Self::Distribution;
}

/// Value network: observations to state values.
pub trait CriticModel<B: Backend>: Module<B> {
    /// `observations`: [batch, obs_dim] to values [batch]
    fn forward(&self, observations: Tensor<B, 2>) -> Tensor<B, 1>;
}

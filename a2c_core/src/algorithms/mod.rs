//! Algorithm components for the A2C agent.
//!
//! - `gae`: decayed, bootstrapped advantage estimation over a segment
//! - `distributions`: Gaussian and categorical policies, sampling strategies
//! - `policy_loss`: policy-gradient and value-regression losses
//! - `actor_critic`: model traits for the actor and the critic
//! - `tensor_ops`: host/tensor conversions

pub mod actor_critic;
pub mod distributions;
pub mod gae;
pub mod policy_loss;
pub mod tensor_ops;

#[cfg(test)]
mod tests;

pub use actor_critic::{ActorModel, CriticModel};
pub use distributions::{
    sum_last, ActionSampler, Categorical, JointSample, JointSampling, Normal, PolicyDistribution,
    SeparateSampling,
};
pub use gae::{compute_advantages, normalize_advantages, AdvantageInputs};
pub use policy_loss::{approx_kl, policy_gradient_loss, value_loss};

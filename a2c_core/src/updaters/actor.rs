//! Policy-gradient actor update.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;

use super::Diagnostics;
use crate::algorithms::actor_critic::ActorModel;
use crate::algorithms::distributions::{sum_last, PolicyDistribution};
use crate::algorithms::policy_loss::{approx_kl, policy_gradient_loss};
use crate::algorithms::tensor_ops::to_scalar;
use crate::config::A2CConfig;
use crate::error::{A2CError, Result};

/// Full-segment inputs of one actor update.
#[derive(Debug, Clone)]
pub struct ActorBatch<B: Backend> {
    /// [batch, obs_dim], already normalized
    pub observations: Tensor<B, 2>,
    /// [batch, act_dim]
    pub actions: Tensor<B, 2>,
    /// [batch]
    pub advantages: Tensor<B, 1>,
    /// Behavior log-probabilities recorded at step time: [batch]
    pub log_probs: Tensor<B, 1>,
}

/// Actor update rule.
pub trait ActorUpdate<B: AutodiffBackend, M> {
    /// Bind to `model` and (re)build the optimizer.
    fn initialize(&mut self, model: &M);

    /// One optimizer step on `batch`.
    ///
    /// # Errors
    /// `UpdaterNotInitialized` before `initialize`.
    fn update(&mut self, model: M, batch: ActorBatch<B>) -> Result<(M, Diagnostics)>;
}

/// Vanilla policy gradient: minimizes `-mean(log π(a|s) · A) - c · mean(H)`.
///
/// The entropy weight `c` is 0 unless set with
/// [`with_entropy_coefficient`](Self::with_entropy_coefficient).
///
/// Diagnostics: `loss` (including the entropy term), `kl` (approximate,
/// behavior minus current), `entropy` (mean per sample) and `std` when the
/// distribution has a scale.
pub struct StochasticPolicyGradient<O, F> {
    learning_rate: f64,
    entropy_coefficient: f32,
    factory: F,
    optimizer: Option<O>,
}

impl<O, F> StochasticPolicyGradient<O, F> {
    pub fn new(learning_rate: f64, factory: F) -> Self {
        Self {
            learning_rate,
            entropy_coefficient: 0.0,
            factory,
            optimizer: None,
        }
    }

    /// Weight of the entropy bonus subtracted from the loss.
    pub fn with_entropy_coefficient(mut self, coefficient: f32) -> Self {
        self.entropy_coefficient = coefficient;
        self
    }

    pub fn entropy_coefficient(&self) -> f32 {
        self.entropy_coefficient
    }

    /// Use `actor_learning_rate` from the configuration.
    pub fn from_config(config: &A2CConfig, factory: F) -> Self {
        Self::new(config.actor_learning_rate, factory)
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn is_initialized(&self) -> bool {
        self.optimizer.is_some()
    }
}

impl<B, M, O, F> ActorUpdate<B, M> for StochasticPolicyGradient<O, F>
where
    B: AutodiffBackend,
    M: ActorModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
    F: Fn(&M) -> O,
{
    fn initialize(&mut self, model: &M) {
        self.optimizer = Some((self.factory)(model));
    }

    fn update(&mut self, model: M, batch: ActorBatch<B>) -> Result<(M, Diagnostics)> {
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or(A2CError::UpdaterNotInitialized("actor"))?;

        let distribution = model.forward(batch.observations);
        let log_probs = sum_last(distribution.log_prob(batch.actions));
        let entropy = sum_last(distribution.entropy()).mean();
        let mut loss = policy_gradient_loss(log_probs.clone(), batch.advantages);
        if self.entropy_coefficient != 0.0 {
            loss = loss - entropy.clone().mul_scalar(self.entropy_coefficient);
        }

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert("loss".into(), to_scalar(loss.clone().detach()));
        diagnostics.insert(
            "kl".into(),
            to_scalar(approx_kl(batch.log_probs, log_probs.detach())),
        );
        diagnostics.insert("entropy".into(), to_scalar(entropy.detach()));
        if let Some(scale) = distribution.scale() {
            diagnostics.insert("std".into(), to_scalar(scale.mean().detach()));
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        let model = optimizer.step(self.learning_rate, model, grads);

        Ok((model, diagnostics))
    }
}

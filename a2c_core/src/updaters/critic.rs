//! Value regression critic update.

use burn::module::AutodiffModule;
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;

use super::Diagnostics;
use crate::algorithms::actor_critic::CriticModel;
use crate::algorithms::policy_loss::value_loss;
use crate::algorithms::tensor_ops::to_scalar;
use crate::config::A2CConfig;
use crate::error::{A2CError, Result};

/// Critic update rule, called once per mini-batch.
pub trait CriticUpdate<B: AutodiffBackend, M> {
    /// Bind to `model` and (re)build the optimizer.
    fn initialize(&mut self, model: &M);

    /// One optimizer step regressing `model(observations)` toward `returns`.
    ///
    /// # Errors
    /// `UpdaterNotInitialized` before `initialize`.
    fn update(
        &mut self,
        model: M,
        observations: Tensor<B, 2>,
        returns: Tensor<B, 1>,
    ) -> Result<(M, Diagnostics)>;
}

/// Squared-error regression of V(s) onto return targets.
///
/// Diagnostics: `loss` and `v` (mean predicted value).
pub struct VRegression<O, F> {
    learning_rate: f64,
    factory: F,
    optimizer: Option<O>,
}

impl<O, F> VRegression<O, F> {
    pub fn new(learning_rate: f64, factory: F) -> Self {
        Self {
            learning_rate,
            factory,
            optimizer: None,
        }
    }

    /// Use `critic_learning_rate` from the configuration.
    pub fn from_config(config: &A2CConfig, factory: F) -> Self {
        Self::new(config.critic_learning_rate, factory)
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn is_initialized(&self) -> bool {
        self.optimizer.is_some()
    }
}

impl<B, M, O, F> CriticUpdate<B, M> for VRegression<O, F>
where
    B: AutodiffBackend,
    M: CriticModel<B> + AutodiffModule<B>,
    O: Optimizer<M, B>,
    F: Fn(&M) -> O,
{
    fn initialize(&mut self, model: &M) {
        self.optimizer = Some((self.factory)(model));
    }

    fn update(
        &mut self,
        model: M,
        observations: Tensor<B, 2>,
        returns: Tensor<B, 1>,
    ) -> Result<(M, Diagnostics)> {
        let optimizer = self
            .optimizer
            .as_mut()
            .ok_or(A2CError::UpdaterNotInitialized("critic"))?;

        let values = model.forward(observations);
        let loss = value_loss(values.clone(), returns);

        let mut diagnostics = Diagnostics::new();
        diagnostics.insert("loss".into(), to_scalar(loss.clone().detach()));
        diagnostics.insert("v".into(), to_scalar(values.detach().mean()));

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        let model = optimizer.step(self.learning_rate, model, grads);

        Ok((model, diagnostics))
    }
}

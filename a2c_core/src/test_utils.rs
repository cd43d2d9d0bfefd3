//! Small deterministic models shared by the unit tests.

use burn::backend::{Autodiff, NdArray};
use burn::module::{Module, Param};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::algorithms::actor_critic::{ActorModel, CriticModel};
use crate::algorithms::distributions::{Categorical, Normal};
use crate::core::Space;

pub type TestBackend = NdArray<f32>;
pub type TestAutodiffBackend = Autodiff<TestBackend>;

fn constant_linear<B: Backend>(
    d_in: usize,
    d_out: usize,
    value: f64,
    device: &B::Device,
) -> Linear<B> {
    LinearConfig::new(d_in, d_out)
        .with_initializer(Initializer::Constant { value })
        .init(device)
}

/// Gaussian policy: `loc = W·obs + b`, state-independent `log_std`.
#[derive(Module, Debug)]
pub struct GaussianActor<B: Backend> {
    pub loc: Linear<B>,
    pub log_std: Param<Tensor<B, 1>>,
}

impl<B: Backend> GaussianActor<B> {
    pub fn new(obs_dim: usize, act_dim: usize, device: &B::Device) -> Self {
        Self {
            loc: constant_linear(obs_dim, act_dim, 0.1, device),
            log_std: Param::from_tensor(Tensor::zeros([act_dim], device)),
        }
    }
}

impl<B: Backend> ActorModel<B> for GaussianActor<B> {
    type Distribution = Normal<B>;

    fn forward(&self, observations: Tensor<B, 2>) -> Normal<B> {
        let loc = self.loc.forward(observations);
        let scale = loc.ones_like() * self.log_std.val().exp().unsqueeze::<2>();
        Normal::new(loc, scale)
    }
}

/// Categorical policy over `n` actions with linear logits.
#[derive(Module, Debug)]
pub struct CategoricalActor<B: Backend> {
    pub logits: Linear<B>,
}

impl<B: Backend> CategoricalActor<B> {
    pub fn new(obs_dim: usize, n_actions: usize, device: &B::Device) -> Self {
        Self {
            logits: constant_linear(obs_dim, n_actions, 0.0, device),
        }
    }
}

impl<B: Backend> ActorModel<B> for CategoricalActor<B> {
    type Distribution = Categorical<B>;

    fn forward(&self, observations: Tensor<B, 2>) -> Categorical<B> {
        Categorical::new(self.logits.forward(observations))
    }
}

/// Linear value function.
#[derive(Module, Debug)]
pub struct LinearCritic<B: Backend> {
    pub value: Linear<B>,
}

impl<B: Backend> LinearCritic<B> {
    pub fn new(obs_dim: usize, device: &B::Device) -> Self {
        Self {
            value: constant_linear(obs_dim, 1, 0.5, device),
        }
    }
}

impl<B: Backend> CriticModel<B> for LinearCritic<B> {
    fn forward(&self, observations: Tensor<B, 2>) -> Tensor<B, 1> {
        self.value.forward(observations).flatten(0, 1)
    }
}

/// Model factory for a Gaussian actor and linear critic.
pub fn gaussian_models<B: Backend>(
    observation_space: &Space,
    action_space: &Space,
    device: &B::Device,
) -> (GaussianActor<B>, LinearCritic<B>) {
    let obs_dim = observation_space.flat_dim();
    (
        GaussianActor::new(obs_dim, action_space.flat_dim(), device),
        LinearCritic::new(obs_dim, device),
    )
}

/// Model factory for a categorical actor and linear critic.
pub fn categorical_models<B: Backend>(
    observation_space: &Space,
    action_space: &Space,
    device: &B::Device,
) -> (CategoricalActor<B>, LinearCritic<B>) {
    let obs_dim = observation_space.flat_dim();
    let n_actions = match action_space {
        Space::Discrete { n } => *n,
        other => other.flat_dim(),
    };
    (
        CategoricalActor::new(obs_dim, n_actions, device),
        LinearCritic::new(obs_dim, device),
    )
}

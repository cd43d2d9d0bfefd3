//! Policy distributions and the two sampling strategies built on them.
//!
//! # Traits
//!
//! - [`PolicyDistribution`]: `sample`, per-dimension `log_prob`, `entropy`
//! - [`JointSample`]: distributions that produce the log-probability while
//!   sampling, without a second evaluation pass
//!
//! # Sampling strategies
//!
//! The agent picks one at construction through its `S: ActionSampler` type
//! parameter:
//!
//! - [`SeparateSampling`]: `sample` followed by `log_prob` of the sample
//! - [`JointSampling`]: `sample_with_log_prob`
//!
//! All randomness comes from an explicit `StdRng`, so a seeded agent samples
//! reproducibly.
//!
//! # Shapes
//!
//! Actions are `[batch, act_dim]` floats. Categorical actions are a single
//! column holding the category index. `log_prob` and `entropy` keep the action
//! axis; [`sum_last`] reduces it.

use std::marker::PhantomData;

use burn::tensor::activation::{log_softmax, softmax};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use super::tensor_ops::{rows_to_tensor, to_vec};

/// ln(2π) / 2
const HALF_LOG_2PI: f32 = 0.918_938_5;

/// Action distribution produced by an actor forward pass.
pub trait PolicyDistribution<B: Backend>: Clone {
    /// Draw one action per row: `[batch, act_dim]`.
    fn sample(&self, rng: &mut StdRng) -> Tensor<B, 2>;

    /// Per-dimension log-probability of `actions`: `[batch, act_dim]`.
    fn log_prob(&self, actions: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Per-dimension entropy: `[batch, act_dim]`.
    fn entropy(&self) -> Tensor<B, 2>;

    /// Scale parameter, for distributions that have one.
    fn scale(&self) -> Option<Tensor<B, 2>> {
        None
    }
}

/// Distributions that can return the log-probability of their own sample.
pub trait JointSample<B: Backend>: PolicyDistribution<B> {
    /// `(actions [batch, act_dim], log_probs [batch, act_dim])`
    fn sample_with_log_prob(&self, rng: &mut StdRng) -> (Tensor<B, 2>, Tensor<B, 2>);
}

/// Sum a `[batch, n]` tensor over its last axis into `[batch]`.
pub fn sum_last<B: Backend>(tensor: Tensor<B, 2>) -> Tensor<B, 1> {
    tensor.sum_dim(1).flatten(0, 1)
}

fn standard_normal_noise<B: Backend>(
    rng: &mut StdRng,
    dims: [usize; 2],
    device: &B::Device,
) -> Tensor<B, 2> {
    let noise: Vec<f32> = (0..dims[0] * dims[1])
        .map(|_| rng.sample::<f32, _>(StandardNormal))
        .collect();
    rows_to_tensor(&noise, dims[1], device)
}

// ============================================================================
// Diagonal Gaussian
// ============================================================================

/// Diagonal Gaussian with per-dimension `loc` and `scale`.
#[derive(Debug, Clone)]
pub struct Normal<B: Backend> {
    /// Mean: [batch, act_dim]
    pub loc: Tensor<B, 2>,
    /// Standard deviation: [batch, act_dim]
    pub scale: Tensor<B, 2>,
}

impl<B: Backend> Normal<B> {
    pub fn new(loc: Tensor<B, 2>, scale: Tensor<B, 2>) -> Self {
        Self { loc, scale }
    }

    fn noise(&self, rng: &mut StdRng) -> Tensor<B, 2> {
        standard_normal_noise(rng, self.loc.dims(), &self.loc.device())
    }

    /// log N(x; μ, σ) = -((x - μ)/σ)² / 2 - log σ - log(2π) / 2
    fn log_density(z: Tensor<B, 2>, scale: Tensor<B, 2>) -> Tensor<B, 2> {
        z.powf_scalar(2.0).mul_scalar(-0.5) - scale.log() - HALF_LOG_2PI
    }
}

impl<B: Backend> PolicyDistribution<B> for Normal<B> {
    fn sample(&self, rng: &mut StdRng) -> Tensor<B, 2> {
        let noise = self.noise(rng);
        self.loc.clone() + self.scale.clone() * noise
    }

    fn log_prob(&self, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        let z = (actions - self.loc.clone()) / self.scale.clone();
        Self::log_density(z, self.scale.clone())
    }

    /// H = 1/2 + log(2π)/2 + log σ
    fn entropy(&self) -> Tensor<B, 2> {
        self.scale.clone().log() + (0.5 + HALF_LOG_2PI)
    }

    fn scale(&self) -> Option<Tensor<B, 2>> {
        Some(self.scale.clone())
    }
}

impl<B: Backend> JointSample<B> for Normal<B> {
    fn sample_with_log_prob(&self, rng: &mut StdRng) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let noise = self.noise(rng);
        let actions = self.loc.clone() + self.scale.clone() * noise.clone();
        // (a - μ)/σ is the noise itself.
        let log_probs = Self::log_density(noise, self.scale.clone());
        (actions, log_probs)
    }
}

// ============================================================================
// Categorical
// ============================================================================

/// Categorical distribution over `n` actions, parameterized by logits.
#[derive(Debug, Clone)]
pub struct Categorical<B: Backend> {
    /// Unnormalized log-probabilities: [batch, n]
    pub logits: Tensor<B, 2>,
}

impl<B: Backend> Categorical<B> {
    pub fn new(logits: Tensor<B, 2>) -> Self {
        Self { logits }
    }

    pub fn n_actions(&self) -> usize {
        self.logits.dims()[1]
    }

    pub fn probs(&self) -> Tensor<B, 2> {
        softmax(self.logits.clone(), 1)
    }
}

impl<B: Backend> PolicyDistribution<B> for Categorical<B> {
    /// Inverse-CDF sampling per row. Returns the index as a float column.
    fn sample(&self, rng: &mut StdRng) -> Tensor<B, 2> {
        let [batch, n] = self.logits.dims();
        let probs = to_vec(self.probs());

        let actions: Vec<f32> = probs
            .chunks_exact(n.max(1))
            .take(batch)
            .map(|row| {
                let u: f32 = rng.gen();
                let mut cumsum = 0.0;
                // Falls back to the last action when rounding leaves the sum below u.
                let mut selected = n.saturating_sub(1);
                for (a, &p) in row.iter().enumerate() {
                    cumsum += p;
                    if u < cumsum {
                        selected = a;
                        break;
                    }
                }
                selected as f32
            })
            .collect();

        rows_to_tensor(&actions, 1, &self.logits.device())
    }

    fn log_prob(&self, actions: Tensor<B, 2>) -> Tensor<B, 2> {
        log_softmax(self.logits.clone(), 1).gather(1, actions.int())
    }

    /// H = -Σ p log p, as a single column.
    fn entropy(&self) -> Tensor<B, 2> {
        let log_probs = log_softmax(self.logits.clone(), 1);
        (log_probs.clone().exp() * log_probs).sum_dim(1).neg()
    }
}

// ============================================================================
// Sampling strategies
// ============================================================================

/// How the agent turns a distribution into actions and behavior log-probabilities.
pub trait ActionSampler<B: Backend, D: PolicyDistribution<B>> {
    /// `(actions [batch, act_dim], log_probs [batch])`
    fn sample_with_log_prob(distribution: &D, rng: &mut StdRng) -> (Tensor<B, 2>, Tensor<B, 1>);

    /// Actions only, for evaluation.
    fn sample(distribution: &D, rng: &mut StdRng) -> Tensor<B, 2> {
        distribution.sample(rng)
    }
}

/// Sample, then evaluate the log-probability of the sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeparateSampling;

/// Use the distribution's joint sample-and-score path.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointSampling;

impl<B: Backend, D: PolicyDistribution<B>> ActionSampler<B, D> for SeparateSampling {
    fn sample_with_log_prob(distribution: &D, rng: &mut StdRng) -> (Tensor<B, 2>, Tensor<B, 1>) {
        let actions = distribution.sample(rng);
        let log_probs = sum_last(distribution.log_prob(actions.clone()));
        (actions, log_probs)
    }
}

impl<B: Backend, D: JointSample<B>> ActionSampler<B, D> for JointSampling {
    fn sample_with_log_prob(distribution: &D, rng: &mut StdRng) -> (Tensor<B, 2>, Tensor<B, 1>) {
        let (actions, log_probs) = distribution.sample_with_log_prob(rng);
        (actions, sum_last(log_probs))
    }
}

/// Marker carrying a sampler choice without storing a value.
pub(crate) type SamplerMarker<S> = PhantomData<fn() -> S>;

//! Parameter update rules for the actor and the critic.
//!
//! An updater is bound to its model by `initialize`, which builds the
//! optimizer through a stored factory closure. `update` takes the model by
//! value, runs one optimizer step and hands the new model back with a map of
//! scalar diagnostics.

pub mod actor;
pub mod critic;

use std::collections::BTreeMap;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, Optimizer};
use burn::tensor::backend::AutodiffBackend;

pub use actor::{ActorBatch, ActorUpdate, StochasticPolicyGradient};
pub use critic::{CriticUpdate, VRegression};

/// Scalar diagnostics keyed by name (`loss`, `kl`, ...).
pub type Diagnostics = BTreeMap<String, f32>;

/// Optimizer factory building Adam with epsilon 1e-5.
///
/// ```ignore
/// let actor_updater = StochasticPolicyGradient::from_config(&config, adam::<B, Actor<B>>);
/// ```
pub fn adam<B, M>(_model: &M) -> impl Optimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    AdamConfig::new().with_epsilon(1e-5).init()
}

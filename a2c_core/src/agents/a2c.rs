//! Advantage Actor-Critic agent (aka vanilla policy gradient).
//!
//! The agent alternates between online action selection and periodic batched
//! learning:
//!
//! ```text
//! step(obs) ──▶ actions            (inference model, sampled, cached)
//! update(next_obs, rewards, ...)   (stores the cached step)
//!     └── segment full? ──▶ learning pass
//!           1. critic values of observations / next observations
//!           2. advantages and return targets
//!           3. one actor update on the whole segment
//!           4. one critic update per mini-batch
//!           5. normalizer flush
//!           6. segment finished
//! ```
//!
//! # Type Parameters
//!
//! - `B`: autodiff backend used for updates; inference runs on `B::InnerBackend`
//! - `A`, `C`: actor and critic modules
//! - `AU`, `CU`: actor and critic update rules
//! - `S`: [`ActionSampler`] strategy ([`SeparateSampling`] by default)
//!
//! # Usage
//!
//! ```ignore
//! let config = A2CConfig::new().with_segment_size(2048);
//! let mut agent: A2C<B, Actor<B>, Critic<B>, _, _> = A2C::new(
//!     config.clone(),
//!     |obs_space, act_space, device| build_models(obs_space, act_space, device),
//!     StochasticPolicyGradient::from_config(&config, adam),
//!     VRegression::from_config(&config, adam),
//!     device,
//! )?;
//! agent.initialize(observation_space, action_space, Some(0))?;
//!
//! loop {
//!     let actions = agent.step(&observations)?;
//!     let outcome = env.step(&actions);
//!     agent.update(&outcome.observations, &outcome.rewards, &outcome.resets, &outcome.terminations)?;
//! }
//! ```

use std::marker::PhantomData;

use burn::module::AutodiffModule;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::algorithms::actor_critic::{ActorModel, CriticModel};
use crate::algorithms::distributions::{ActionSampler, SamplerMarker, SeparateSampling};
use crate::algorithms::gae::normalize_advantages;
use crate::algorithms::tensor_ops::{rows_to_tensor, to_tensor1, to_vec};
use crate::buffers::{Field, Segment, SegmentConfig};
use crate::config::A2CConfig;
use crate::core::{Space, TransitionStep};
use crate::error::{ensure_len, A2CError, Result};
use crate::metrics::MetricsStore;
use crate::normalization::{ObservationNormalizer, ReturnNormalizer};
use crate::updaters::{ActorBatch, ActorUpdate, CriticUpdate, Diagnostics};

/// Builds the actor and critic once the spaces are known.
pub type ModelBuilder<B, A, C> =
    Box<dyn Fn(&Space, &Space, &<B as Backend>::Device) -> (A, C)>;

/// Inference-side actor distribution for an autodiff actor `A`.
pub type InferenceDistribution<B, A> = <<A as AutodiffModule<B>>::InnerModule as ActorModel<
    <B as AutodiffBackend>::InnerBackend,
>>::Distribution;

/// Data cached by `step` for the following `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct LastStep {
    pub observations: Vec<f32>,
    pub actions: Vec<f32>,
    pub log_probs: Vec<f32>,
}

/// State that only exists after `initialize`.
struct Ready<A, C> {
    actor: A,
    critic: C,
    observation_space: Space,
    action_space: Space,
    /// Training-time action sampling.
    rng: StdRng,
    /// Evaluation sampling, independent of `rng`.
    test_rng: StdRng,
    observation_normalizer: Option<ObservationNormalizer>,
    return_normalizer: Option<ReturnNormalizer>,
}

/// Advantage Actor-Critic agent.
pub struct A2C<B, A, C, AU, CU, S = SeparateSampling>
where
    B: AutodiffBackend,
{
    config: A2CConfig,
    device: B::Device,
    model_builder: ModelBuilder<B, A, C>,
    actor_updater: AU,
    critic_updater: CU,
    segment: Segment,
    ready: Option<Ready<A, C>>,
    last_step: Option<LastStep>,
    metrics: MetricsStore,
    learning_passes: usize,
    _sampler: SamplerMarker<S>,
}

impl<B, A, C, AU, CU, S> A2C<B, A, C, AU, CU, S>
where
    B: AutodiffBackend,
    A: ActorModel<B> + AutodiffModule<B>,
    A::InnerModule: ActorModel<B::InnerBackend>,
    C: CriticModel<B> + AutodiffModule<B>,
    C::InnerModule: CriticModel<B::InnerBackend>,
    AU: ActorUpdate<B, A>,
    CU: CriticUpdate<B, C>,
    S: ActionSampler<B::InnerBackend, InferenceDistribution<B, A>>,
{
    /// Create an uninitialized agent.
    ///
    /// # Errors
    /// `Config` when the configuration fails validation.
    pub fn new<F>(
        config: A2CConfig,
        model_builder: F,
        actor_updater: AU,
        critic_updater: CU,
        device: B::Device,
    ) -> Result<Self>
    where
        F: Fn(&Space, &Space, &B::Device) -> (A, C) + 'static,
    {
        config.validate()?;
        Ok(Self {
            segment: Segment::new(SegmentConfig::from(&config)),
            config,
            device,
            model_builder: Box::new(model_builder),
            actor_updater,
            critic_updater,
            ready: None,
            last_step: None,
            metrics: MetricsStore::new(),
            learning_passes: 0,
            _sampler: PhantomData,
        })
    }

    /// Build the models, bind the updaters, seed every RNG and create the
    /// configured normalizers.
    ///
    /// With `seed = None` all RNGs are seeded from the operating system.
    ///
    /// # Errors
    /// `AlreadyInitialized` on a second call.
    pub fn initialize(
        &mut self,
        observation_space: Space,
        action_space: Space,
        seed: Option<u64>,
    ) -> Result<()> {
        if self.ready.is_some() {
            return Err(A2CError::AlreadyInitialized);
        }

        let (actor, critic) = (self.model_builder)(&observation_space, &action_space, &self.device);

        self.segment.initialize(seed);
        self.actor_updater.initialize(&actor);
        self.critic_updater.initialize(&critic);

        let (rng, test_rng) = match seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };

        let obs_dim = observation_space.flat_dim();
        let observation_normalizer = self
            .config
            .observation_normalization
            .clone()
            .map(|config| ObservationNormalizer::with_config(obs_dim, config));
        let return_normalizer = self
            .config
            .return_normalization
            .clone()
            .map(|config| ReturnNormalizer::new(self.config.discount_factor, config));

        log::debug!(
            "A2C initialized: obs_dim={}, act_dim={}, segment_size={}, seed={:?}",
            obs_dim,
            action_space.flat_dim(),
            self.config.segment_size,
            seed
        );

        self.ready = Some(Ready {
            actor,
            critic,
            observation_space,
            action_space,
            rng,
            test_rng,
            observation_normalizer,
            return_normalizer,
        });
        Ok(())
    }

    /// Sample actions for a batch of observations and cache the step for `update`.
    ///
    /// `observations` holds one row of `obs_dim` floats per environment. The
    /// returned actions hold one row of `act_dim` floats per environment.
    pub fn step(&mut self, observations: &[f32]) -> Result<Vec<f32>> {
        let ready = self.ready.as_mut().ok_or(A2CError::NotInitialized)?;
        let rows = check_rows(&ready.observation_space, observations)?;

        let inputs = normalized_rows::<B::InnerBackend>(
            ready.observation_normalizer.as_ref(),
            observations,
            ready.observation_space.flat_dim(),
            &self.device,
        );
        let distribution = ready.actor.valid().forward(inputs);
        let (actions, log_probs) = S::sample_with_log_prob(&distribution, &mut ready.rng);

        let actions = to_vec(actions);
        let log_probs = to_vec(log_probs);
        ensure_len("sampled actions", rows * ready.action_space.flat_dim(), actions.len())?;
        ensure_len("sampled log_probs", rows, log_probs.len())?;

        self.last_step = Some(LastStep {
            observations: observations.to_vec(),
            actions: actions.clone(),
            log_probs,
        });
        Ok(actions)
    }

    /// Sample actions for evaluation.
    ///
    /// Nothing is cached and the training RNG is left untouched.
    pub fn test_step(&mut self, observations: &[f32]) -> Result<Vec<f32>> {
        let ready = self.ready.as_mut().ok_or(A2CError::NotInitialized)?;
        let rows = check_rows(&ready.observation_space, observations)?;

        let inputs = normalized_rows::<B::InnerBackend>(
            ready.observation_normalizer.as_ref(),
            observations,
            ready.observation_space.flat_dim(),
            &self.device,
        );
        let distribution = ready.actor.valid().forward(inputs);
        let actions = to_vec(S::sample(&distribution, &mut ready.test_rng));
        ensure_len("sampled actions", rows * ready.action_space.flat_dim(), actions.len())?;
        Ok(actions)
    }

    /// Store the outcome of the cached step and learn when the segment is full.
    ///
    /// `observations` are the observations that followed the cached step,
    /// before any environment reset. `resets[i]` marks environment `i` as
    /// starting a new episode, `terminations[i]` marks a true terminal state.
    ///
    /// Returns `true` when a learning pass ran.
    pub fn update(
        &mut self,
        observations: &[f32],
        rewards: &[f32],
        resets: &[bool],
        terminations: &[bool],
    ) -> Result<bool> {
        let ready = self.ready.as_mut().ok_or(A2CError::NotInitialized)?;
        let last = self.last_step.as_ref().ok_or(A2CError::UpdateWithoutStep)?;

        self.segment.store(TransitionStep {
            observations: &last.observations,
            actions: &last.actions,
            next_observations: observations,
            rewards,
            resets,
            terminations,
            log_probs: &last.log_probs,
        })?;

        if let Some(normalizer) = ready.observation_normalizer.as_mut() {
            normalizer.record(&last.observations)?;
        }
        if let Some(normalizer) = ready.return_normalizer.as_mut() {
            normalizer.record(rewards, resets)?;
        }
        self.last_step = None;

        if self.segment.ready() {
            self.learn()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// One learning pass over the full segment.
    fn learn(&mut self) -> Result<()> {
        let ready = self.ready.as_mut().ok_or(A2CError::NotInitialized)?;
        let device = &self.device;
        let obs_dim = ready.observation_space.flat_dim();

        // Values without gradient tracking, in raw return units.
        let (values, next_values) = {
            let batch = self
                .segment
                .get_full(&[Field::Observations, Field::NextObservations])?;
            let critic = ready.critic.valid();
            let evaluate = |field: Field| -> Result<Vec<f32>> {
                let inputs = normalized_rows::<B::InnerBackend>(
                    ready.observation_normalizer.as_ref(),
                    batch.floats(field)?,
                    obs_dim,
                    device,
                );
                let values = to_vec(critic.forward(inputs));
                Ok(match ready.return_normalizer.as_ref() {
                    Some(normalizer) => normalizer.denormalize(&values),
                    None => values,
                })
            };
            (evaluate(Field::Observations)?, evaluate(Field::NextObservations)?)
        };
        self.segment.compute_returns(&values, &next_values)?;

        // One actor step on the whole segment.
        let actor_diagnostics = {
            let batch = self.segment.get_full(&[
                Field::Observations,
                Field::Actions,
                Field::Advantages,
                Field::LogProbs,
            ])?;
            let mut advantages = batch.floats(Field::Advantages)?.to_vec();
            if self.config.normalize_advantages {
                normalize_advantages(&mut advantages);
            }

            let actor_batch = ActorBatch {
                observations: normalized_rows::<B>(
                    ready.observation_normalizer.as_ref(),
                    batch.floats(Field::Observations)?,
                    obs_dim,
                    device,
                ),
                actions: rows_to_tensor::<B>(
                    batch.floats(Field::Actions)?,
                    batch.width(Field::Actions)?,
                    device,
                ),
                advantages: to_tensor1::<B>(&advantages, device),
                log_probs: to_tensor1::<B>(batch.floats(Field::LogProbs)?, device),
            };
            let (actor, diagnostics) = self.actor_updater.update(ready.actor.clone(), actor_batch)?;
            ready.actor = actor;
            diagnostics
        };
        if actor_diagnostics.get("loss").is_some_and(|loss| !loss.is_finite()) {
            log::warn!("A2C pass {}: non-finite actor loss", self.learning_passes + 1);
        }
        self.metrics.store_prefixed("actor", &actor_diagnostics);

        // Critic steps on shuffled mini-batches.
        let mut critic_diagnostics: Vec<Diagnostics> =
            Vec::with_capacity(self.config.batch_iterations);
        for batch in self.segment.get(&[Field::Observations, Field::Returns])? {
            let returns = batch.floats(Field::Returns)?;
            let targets = match ready.return_normalizer.as_ref() {
                Some(normalizer) => normalizer.normalize(returns),
                None => returns.to_vec(),
            };
            let observations = normalized_rows::<B>(
                ready.observation_normalizer.as_ref(),
                batch.floats(Field::Observations)?,
                obs_dim,
                device,
            );

            let (critic, diagnostics) = self.critic_updater.update(
                ready.critic.clone(),
                observations,
                to_tensor1::<B>(&targets, device),
            )?;
            ready.critic = critic;
            self.metrics.store_prefixed("critic", &diagnostics);
            critic_diagnostics.push(diagnostics);
        }

        if let Some(normalizer) = ready.observation_normalizer.as_mut() {
            normalizer.update()?;
        }
        if let Some(normalizer) = ready.return_normalizer.as_mut() {
            normalizer.update()?;
        }

        self.segment.finish();
        self.learning_passes += 1;

        log::debug!(
            "A2C pass {}: transitions={}, actor={:?}, critic_updates={}, critic/loss={:.4}",
            self.learning_passes,
            values.len(),
            actor_diagnostics,
            critic_diagnostics.len(),
            mean_of(&critic_diagnostics, "loss"),
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.is_some()
    }

    pub fn config(&self) -> &A2CConfig {
        &self.config
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Step data waiting for the next `update`.
    pub fn last_step(&self) -> Option<&LastStep> {
        self.last_step.as_ref()
    }

    pub fn metrics(&self) -> &MetricsStore {
        &self.metrics
    }

    /// Every learning pass appends `1 + batch_iterations` entries per
    /// diagnostic key and nothing is discarded here, so long runs should
    /// `drain()` the store periodically.
    pub fn metrics_mut(&mut self) -> &mut MetricsStore {
        &mut self.metrics
    }

    /// Completed learning passes.
    pub fn learning_passes(&self) -> usize {
        self.learning_passes
    }

    pub fn actor(&self) -> Option<&A> {
        self.ready.as_ref().map(|r| &r.actor)
    }

    pub fn critic(&self) -> Option<&C> {
        self.ready.as_ref().map(|r| &r.critic)
    }

    pub fn actor_updater(&self) -> &AU {
        &self.actor_updater
    }

    pub fn critic_updater(&self) -> &CU {
        &self.critic_updater
    }

    pub fn observation_normalizer(&self) -> Option<&ObservationNormalizer> {
        self.ready.as_ref().and_then(|r| r.observation_normalizer.as_ref())
    }

    pub fn return_normalizer(&self) -> Option<&ReturnNormalizer> {
        self.ready.as_ref().and_then(|r| r.return_normalizer.as_ref())
    }

    /// Freeze (`false`) or resume (`true`) normalizer statistics, e.g. around
    /// evaluation rollouts. Frozen normalizers still transform inputs but
    /// discard what they record at the next flush.
    ///
    /// # Errors
    /// `NotInitialized` before `initialize`.
    pub fn set_normalizer_training(&mut self, training: bool) -> Result<()> {
        let ready = self.ready.as_mut().ok_or(A2CError::NotInitialized)?;
        if let Some(normalizer) = ready.observation_normalizer.as_mut() {
            normalizer.set_training(training);
        }
        if let Some(normalizer) = ready.return_normalizer.as_mut() {
            normalizer.set_training(training);
        }
        Ok(())
    }
}

/// Number of rows in a flat observation batch.
fn check_rows(space: &Space, observations: &[f32]) -> Result<usize> {
    let dim = space.flat_dim();
    if dim == 0 || observations.is_empty() || observations.len() % dim != 0 {
        return Err(A2CError::shape(
            "observations",
            (observations.len() / dim.max(1)).max(1) * dim,
            observations.len(),
        ));
    }
    Ok(observations.len() / dim)
}

/// Rows as a `[batch, width]` tensor, normalized when a normalizer is set.
fn normalized_rows<BK: Backend>(
    normalizer: Option<&ObservationNormalizer>,
    data: &[f32],
    width: usize,
    device: &BK::Device,
) -> Tensor<BK, 2> {
    let tensor = rows_to_tensor::<BK>(data, width, device);
    match normalizer {
        Some(normalizer) => normalizer.normalize_tensor(tensor),
        None => tensor,
    }
}

fn mean_of(diagnostics: &[Diagnostics], key: &str) -> f32 {
    let values: Vec<f32> = diagnostics.iter().filter_map(|d| d.get(key).copied()).collect();
    if values.is_empty() {
        f32::NAN
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

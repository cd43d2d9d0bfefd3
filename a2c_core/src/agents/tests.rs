//! Agent-level tests: call sequencing, the learning pass, sampling and
//! normalizer wiring.

use burn::tensor::backend::AutodiffBackend;

use super::*;
use crate::algorithms::distributions::{ActionSampler, JointSampling, Normal, SeparateSampling};
use crate::algorithms::gae::{compute_advantages, AdvantageInputs};
use crate::algorithms::tensor_ops::to_vec;
use crate::buffers::Phase;
use crate::config::{A2CConfig, ReturnNormalizationConfig};
use crate::core::Space;
use crate::error::{A2CError, Result};
use crate::test_utils::{
    categorical_models, gaussian_models, CategoricalActor, GaussianActor, LinearCritic,
    TestAutodiffBackend, TestBackend,
};
use crate::updaters::{adam, ActorBatch, ActorUpdate, CriticUpdate, Diagnostics};
use crate::updaters::{StochasticPolicyGradient, VRegression};

type TB = TestAutodiffBackend;

// =============================================================================
// MOCK UPDATERS
// =============================================================================

/// Records every actor batch and leaves the model untouched.
#[derive(Debug, Default)]
struct RecordingActor {
    initialized: usize,
    advantages: Vec<Vec<f32>>,
    log_probs: Vec<Vec<f32>>,
}

impl<B: AutodiffBackend, M> ActorUpdate<B, M> for RecordingActor {
    fn initialize(&mut self, _model: &M) {
        self.initialized += 1;
    }

    fn update(&mut self, model: M, batch: ActorBatch<B>) -> Result<(M, Diagnostics)> {
        self.advantages.push(to_vec(batch.advantages));
        self.log_probs.push(to_vec(batch.log_probs));
        let mut diagnostics = Diagnostics::new();
        diagnostics.insert("loss".into(), 0.25);
        Ok((model, diagnostics))
    }
}

/// Records every critic target batch and leaves the model untouched.
#[derive(Debug, Default)]
struct RecordingCritic {
    initialized: usize,
    returns: Vec<Vec<f32>>,
}

impl<B: AutodiffBackend, M> CriticUpdate<B, M> for RecordingCritic {
    fn initialize(&mut self, _model: &M) {
        self.initialized += 1;
    }

    fn update(
        &mut self,
        model: M,
        _observations: burn::tensor::Tensor<B, 2>,
        returns: burn::tensor::Tensor<B, 1>,
    ) -> Result<(M, Diagnostics)> {
        self.returns.push(to_vec(returns));
        let mut diagnostics = Diagnostics::new();
        diagnostics.insert("loss".into(), 1.0);
        Ok((model, diagnostics))
    }
}

type RecordingAgent<S = SeparateSampling> =
    A2C<TB, GaussianActor<TB>, LinearCritic<TB>, RecordingActor, RecordingCritic, S>;

// =============================================================================
// HELPERS
// =============================================================================

fn small_config() -> A2CConfig {
    A2CConfig::new()
        .with_segment_size(4)
        .with_batch_iterations(3)
        .with_discount_factor(0.99)
        .with_trace_decay(0.95)
        .with_observation_normalization(None)
}

fn recording_agent<S>(config: A2CConfig) -> RecordingAgent<S>
where
    S: ActionSampler<TestBackend, Normal<TestBackend>>,
{
    A2C::new(
        config,
        gaussian_models::<TB>,
        RecordingActor::default(),
        RecordingCritic::default(),
        Default::default(),
    )
    .unwrap()
}

fn scalar_agent(config: A2CConfig, seed: u64) -> RecordingAgent {
    let mut agent = recording_agent(config);
    agent
        .initialize(Space::boxed(1), Space::boxed(1), Some(seed))
        .unwrap();
    agent
}

/// Drive one environment through `rewards`, observation `t` at step `t`.
/// Returns whether the last update triggered learning.
fn run_episode<S>(agent: &mut RecordingAgent<S>, rewards: &[f32]) -> bool
where
    S: ActionSampler<TestBackend, Normal<TestBackend>>,
{
    let mut learned = false;
    for (t, &reward) in rewards.iter().enumerate() {
        agent.step(&[t as f32]).unwrap();
        learned = agent
            .update(&[t as f32 + 1.0], &[reward], &[false], &[false])
            .unwrap();
    }
    learned
}

fn sorted(mut values: Vec<f32>) -> Vec<f32> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    values
}

fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < tolerance, "{:?} != {:?}", actual, expected);
    }
}

/// Advantages and returns for `run_episode` with the initial linear critic,
/// V(s) = 0.5 s + 0.5.
fn expected_targets(rewards: &[f32], gamma: f32, lambda: f32) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    let values: Vec<f32> = (0..n).map(|t| 0.5 * t as f32 + 0.5).collect();
    let next_values: Vec<f32> = (0..n).map(|t| 0.5 * (t + 1) as f32 + 0.5).collect();
    let flags = vec![false; n];
    compute_advantages(
        AdvantageInputs {
            rewards,
            values: &values,
            next_values: &next_values,
            resets: &flags,
            terminations: &flags,
            n_envs: 1,
        },
        gamma,
        lambda,
    )
    .unwrap()
}

// =============================================================================
// SEQUENCING
// =============================================================================

#[test]
fn test_calls_before_initialize_fail() {
    let mut agent: RecordingAgent = recording_agent(small_config());
    assert!(!agent.is_initialized());
    assert!(matches!(agent.step(&[0.0]), Err(A2CError::NotInitialized)));
    assert!(matches!(agent.test_step(&[0.0]), Err(A2CError::NotInitialized)));
    assert!(matches!(
        agent.update(&[0.0], &[1.0], &[false], &[false]),
        Err(A2CError::NotInitialized)
    ));
}

#[test]
fn test_initialize_twice_fails() {
    let mut agent = scalar_agent(small_config(), 0);
    let err = agent
        .initialize(Space::boxed(1), Space::boxed(1), Some(0))
        .unwrap_err();
    assert!(matches!(err, A2CError::AlreadyInitialized));
}

#[test]
fn test_initialize_binds_updaters() {
    let agent = scalar_agent(small_config(), 0);
    assert_eq!(agent.actor_updater().initialized, 1);
    assert_eq!(agent.critic_updater().initialized, 1);
    assert!(agent.actor().is_some());
    assert!(agent.critic().is_some());
}

#[test]
fn test_update_requires_cached_step() {
    let mut agent = scalar_agent(small_config(), 0);
    assert!(matches!(
        agent.update(&[1.0], &[1.0], &[false], &[false]),
        Err(A2CError::UpdateWithoutStep)
    ));

    agent.step(&[0.0]).unwrap();
    assert!(agent.last_step().is_some());
    agent.update(&[1.0], &[1.0], &[false], &[false]).unwrap();
    assert!(agent.last_step().is_none());
    assert!(matches!(
        agent.update(&[2.0], &[1.0], &[false], &[false]),
        Err(A2CError::UpdateWithoutStep)
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let result: Result<RecordingAgent> = A2C::new(
        small_config().with_segment_size(0),
        gaussian_models::<TB>,
        RecordingActor::default(),
        RecordingCritic::default(),
        Default::default(),
    );
    assert!(matches!(result, Err(A2CError::Config(_))));
}

#[test]
fn test_observation_width_checked() {
    let mut agent = recording_agent::<SeparateSampling>(small_config());
    agent
        .initialize(Space::boxed(2), Space::boxed(1), Some(0))
        .unwrap();
    assert!(matches!(
        agent.step(&[1.0, 2.0, 3.0]),
        Err(A2CError::ShapeMismatch { .. })
    ));
    assert!(matches!(agent.step(&[]), Err(A2CError::ShapeMismatch { .. })));
    assert!(agent.last_step().is_none());
}

// =============================================================================
// LEARNING PASS
// =============================================================================

#[test]
fn test_learning_pass_runs_when_segment_fills() {
    let mut agent = scalar_agent(small_config(), 3);
    let rewards = [1.0, 0.0, 0.0, 1.0];

    for (t, &reward) in rewards.iter().enumerate() {
        agent.step(&[t as f32]).unwrap();
        let learned = agent
            .update(&[t as f32 + 1.0], &[reward], &[false], &[false])
            .unwrap();
        assert_eq!(learned, t == 3, "learning at step {}", t);
    }

    assert_eq!(agent.learning_passes(), 1);
    assert_eq!(agent.actor_updater().advantages.len(), 1);
    assert_eq!(agent.critic_updater().returns.len(), 3);
    assert!(!agent.segment().ready());
    assert_eq!(agent.segment().phase(), Phase::Filling);
    assert!(agent.segment().is_empty());
}

#[test]
fn test_critic_receives_return_targets() {
    let mut agent = scalar_agent(small_config(), 3);
    let rewards = [1.0, 0.0, 0.0, 1.0];
    run_episode(&mut agent, &rewards);

    let (_, returns) = expected_targets(&rewards, 0.99, 0.95);
    let expected = sorted(returns);
    for batch in &agent.critic_updater().returns {
        assert!(batch.iter().all(|r| r.is_finite()));
        // Each mini-batch is a permutation of the whole segment.
        assert_close(&sorted(batch.clone()), &expected, 1e-4);
    }
}

#[test]
fn test_actor_receives_normalized_advantages() {
    let mut agent = scalar_agent(small_config(), 3);
    run_episode(&mut agent, &[1.0, 0.0, 0.0, 1.0]);

    let advantages = &agent.actor_updater().advantages[0];
    assert_eq!(advantages.len(), 4);
    let mean = advantages.iter().sum::<f32>() / 4.0;
    let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / 4.0;
    assert!(mean.abs() < 1e-4);
    assert!((variance.sqrt() - 1.0).abs() < 1e-3);
}

#[test]
fn test_raw_advantages_in_storage_order() {
    let config = small_config().with_normalize_advantages(false);
    let mut agent = scalar_agent(config, 3);
    let rewards = [1.0, 0.0, 0.0, 1.0];
    run_episode(&mut agent, &rewards);

    let (advantages, _) = expected_targets(&rewards, 0.99, 0.95);
    assert_close(&agent.actor_updater().advantages[0], &advantages, 1e-4);
}

#[test]
fn test_behavior_log_probs_reach_actor() {
    let mut agent = scalar_agent(small_config(), 5);
    let mut cached = Vec::new();
    for t in 0..4 {
        agent.step(&[t as f32]).unwrap();
        cached.extend(agent.last_step().unwrap().log_probs.clone());
        agent
            .update(&[t as f32 + 1.0], &[0.0], &[false], &[false])
            .unwrap();
    }
    assert_close(&agent.actor_updater().log_probs[0], &cached, 1e-6);
}

#[test]
fn test_metrics_recorded_per_update() {
    let mut agent = scalar_agent(small_config(), 1);
    run_episode(&mut agent, &[1.0, 0.0, 0.0, 1.0]);
    run_episode(&mut agent, &[0.0, 1.0, 0.0, 1.0]);

    assert_eq!(agent.learning_passes(), 2);
    assert_eq!(agent.metrics().count("actor/loss"), 2);
    assert_eq!(agent.metrics().count("critic/loss"), 6);
    assert_eq!(agent.metrics().mean("critic/loss"), Some(1.0));
}

#[test]
fn test_vectorized_environments() {
    let mut agent = scalar_agent(small_config(), 2);
    for t in 0..4 {
        let actions = agent.step(&[t as f32, -(t as f32)]).unwrap();
        assert_eq!(actions.len(), 2);
        agent
            .update(
                &[t as f32 + 1.0, -(t as f32) - 1.0],
                &[1.0, 0.0],
                &[false, t == 2],
                &[false, t == 1],
            )
            .unwrap();
    }
    assert_eq!(agent.learning_passes(), 1);
    assert_eq!(agent.actor_updater().advantages[0].len(), 8);
    assert_eq!(agent.critic_updater().returns[0].len(), 8);
}

#[test]
fn test_mini_batch_size_respected() {
    let config = small_config().with_batch_size(Some(3)).with_batch_iterations(5);
    let mut agent = scalar_agent(config, 2);
    run_episode(&mut agent, &[1.0, 2.0, 3.0, 4.0]);

    let returns = &agent.critic_updater().returns;
    assert_eq!(returns.len(), 5);
    assert!(returns.iter().all(|batch| batch.len() == 3));
}

// =============================================================================
// SAMPLING
// =============================================================================

#[test]
fn test_same_seed_same_actions() {
    let mut a = scalar_agent(small_config(), 11);
    let mut b = scalar_agent(small_config(), 11);
    for t in 0..3 {
        let obs = [t as f32];
        assert_eq!(a.step(&obs).unwrap(), b.step(&obs).unwrap());
        a.update(&[1.0], &[0.0], &[false], &[false]).unwrap();
        b.update(&[1.0], &[0.0], &[false], &[false]).unwrap();
    }
}

#[test]
fn test_different_seed_different_actions() {
    let mut a = scalar_agent(small_config(), 1);
    let mut b = scalar_agent(small_config(), 2);
    assert_ne!(a.step(&[0.0]).unwrap(), b.step(&[0.0]).unwrap());
}

#[test]
fn test_test_step_does_not_disturb_training() {
    let mut a = scalar_agent(small_config(), 9);
    let mut b = scalar_agent(small_config(), 9);

    let evaluation = b.test_step(&[0.5]).unwrap();
    assert_eq!(evaluation.len(), 1);
    assert!(b.last_step().is_none());

    assert_eq!(a.step(&[0.5]).unwrap(), b.step(&[0.5]).unwrap());
}

#[test]
fn test_joint_sampling_matches_separate() {
    let mut separate: RecordingAgent<SeparateSampling> = recording_agent(small_config());
    let mut joint: RecordingAgent<JointSampling> = recording_agent(small_config());
    separate
        .initialize(Space::boxed(2), Space::boxed(3), Some(4))
        .unwrap();
    joint
        .initialize(Space::boxed(2), Space::boxed(3), Some(4))
        .unwrap();

    let obs = [0.5, -1.0, 2.0, 0.0];
    let actions = separate.step(&obs).unwrap();
    assert_eq!(actions.len(), 6);
    assert_close(&joint.step(&obs).unwrap(), &actions, 1e-6);

    let separate_lp = &separate.last_step().unwrap().log_probs;
    let joint_lp = &joint.last_step().unwrap().log_probs;
    assert_eq!(separate_lp.len(), 2);
    assert_close(joint_lp, separate_lp, 1e-4);
}

#[test]
fn test_categorical_actions() {
    let config = small_config();
    type CategoricalAgent =
        A2C<TB, CategoricalActor<TB>, LinearCritic<TB>, RecordingActor, RecordingCritic>;
    let mut agent: CategoricalAgent = A2C::new(
        config,
        categorical_models::<TB>,
        RecordingActor::default(),
        RecordingCritic::default(),
        Default::default(),
    )
    .unwrap();
    agent
        .initialize(Space::boxed(2), Space::discrete(3), Some(0))
        .unwrap();

    for t in 0..4 {
        let actions = agent.step(&[t as f32, 1.0, 0.0, t as f32]).unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|&a| a == 0.0 || a == 1.0 || a == 2.0));
        // Zero logits: uniform over three actions.
        for &lp in &agent.last_step().unwrap().log_probs {
            assert!((lp - (1.0f32 / 3.0).ln()).abs() < 1e-5);
        }
        agent
            .update(&[0.0, 0.0, 0.0, 0.0], &[1.0, 1.0], &[false, false], &[false, false])
            .unwrap();
    }
    assert_eq!(agent.learning_passes(), 1);
}

// =============================================================================
// NORMALIZERS
// =============================================================================

#[test]
fn test_observation_normalizer_flushed_per_pass() {
    let config = small_config().with_observation_normalization(Some(Default::default()));
    let mut agent = scalar_agent(config, 0);

    for t in 0..3 {
        agent.step(&[t as f32]).unwrap();
        agent
            .update(&[t as f32 + 1.0], &[0.0], &[false], &[false])
            .unwrap();
    }
    let normalizer = agent.observation_normalizer().unwrap();
    assert_eq!(normalizer.pending(), 3);
    assert_eq!(normalizer.count(), 0.0);

    agent.step(&[3.0]).unwrap();
    agent.update(&[4.0], &[0.0], &[false], &[false]).unwrap();
    let normalizer = agent.observation_normalizer().unwrap();
    assert_eq!(normalizer.pending(), 0);
    assert_eq!(normalizer.count(), 4.0);
    assert!((normalizer.stats().mean()[0] - 1.5).abs() < 1e-9);
}

#[test]
fn test_return_normalizer_scales_targets() {
    let config = small_config().with_return_normalization(Some(ReturnNormalizationConfig::new()));
    let mut agent = scalar_agent(config, 0);
    assert!(agent.return_normalizer().is_some());

    let rewards = [1.0, 0.0, 0.0, 1.0];
    run_episode(&mut agent, &rewards);
    let normalizer = agent.return_normalizer().unwrap();
    assert_eq!(normalizer.stats().count(), 4.0);

    // Targets of the first pass use the scale before the flush (1.0).
    let (_, returns) = expected_targets(&rewards, 0.99, 0.95);
    assert_close(
        &sorted(agent.critic_updater().returns[0].clone()),
        &sorted(returns),
        1e-4,
    );
}

#[test]
fn test_frozen_normalizers_keep_statistics() {
    let config = small_config()
        .with_observation_normalization(Some(Default::default()))
        .with_return_normalization(Some(ReturnNormalizationConfig::new()));
    let mut agent = scalar_agent(config, 0);

    agent.set_normalizer_training(false).unwrap();
    assert!(run_episode(&mut agent, &[1.0, 0.0, 0.0, 1.0]));
    let observations = agent.observation_normalizer().unwrap();
    assert_eq!(observations.count(), 0.0);
    assert_eq!(observations.pending(), 0);
    assert_eq!(agent.return_normalizer().unwrap().stats().count(), 0.0);

    agent.set_normalizer_training(true).unwrap();
    assert!(run_episode(&mut agent, &[1.0, 0.0, 0.0, 1.0]));
    assert_eq!(agent.observation_normalizer().unwrap().count(), 4.0);
    assert_eq!(agent.return_normalizer().unwrap().stats().count(), 4.0);
}

#[test]
fn test_normalizer_training_requires_initialize() {
    let mut agent: RecordingAgent = recording_agent(small_config());
    assert!(matches!(
        agent.set_normalizer_training(false),
        Err(A2CError::NotInitialized)
    ));
}

// =============================================================================
// REAL UPDATERS
// =============================================================================

#[test]
fn test_gradient_updaters_change_parameters() {
    let config = small_config();
    let mut agent = A2C::<TB, GaussianActor<TB>, LinearCritic<TB>, _, _>::new(
        config.clone(),
        gaussian_models::<TB>,
        StochasticPolicyGradient::from_config(&config, adam::<TB, GaussianActor<TB>>),
        VRegression::from_config(&config, adam::<TB, LinearCritic<TB>>),
        Default::default(),
    )
    .unwrap();
    agent
        .initialize(Space::boxed(1), Space::boxed(1), Some(0))
        .unwrap();

    let actor_before = to_vec(agent.actor().unwrap().loc.weight.val());
    let critic_before = to_vec(agent.critic().unwrap().value.weight.val());

    for (t, &reward) in [1.0, 0.0, 0.0, 1.0].iter().enumerate() {
        agent.step(&[t as f32]).unwrap();
        agent
            .update(&[t as f32 + 1.0], &[reward], &[false], &[false])
            .unwrap();
    }

    let actor_after = to_vec(agent.actor().unwrap().loc.weight.val());
    let critic_after = to_vec(agent.critic().unwrap().value.weight.val());
    assert_ne!(actor_before, actor_after);
    assert_ne!(critic_before, critic_after);

    let metrics = agent.metrics();
    assert_eq!(metrics.count("actor/loss"), 1);
    assert_eq!(metrics.count("critic/loss"), 3);
    assert!(metrics.last("actor/std").is_some());
    assert!(metrics.mean("critic/loss").unwrap().is_finite());
}

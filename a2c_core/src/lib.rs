//! # a2c_core: On-Policy Advantage Actor-Critic
//!
//! Training core for a single-process A2C agent (aka vanilla policy
//! gradient) acting in vectorized environments.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              A2C                                 │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  step(obs)                update(next_obs, rewards, flags)       │
//! │     │                         │                                  │
//! │     ▼                         ▼                                  │
//! │  ┌──────────────┐      ┌──────────────┐    ┌──────────────────┐  │
//! │  │ Actor.valid()│      │   Segment    │    │   Normalizers    │  │
//! │  │ + sampler    │─────▶│ (fixed-size) │    │ (obs / returns)  │  │
//! │  └──────────────┘      └──────┬───────┘    └──────────────────┘  │
//! │                               │ full                             │
//! │                               ▼                                  │
//! │              advantages ──▶ actor update (whole segment)         │
//! │              returns    ──▶ critic updates (mini-batches)        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use a2c_core::{adam, A2CConfig, Space, StochasticPolicyGradient, VRegression, A2C};
//!
//! let config = A2CConfig::new()
//!     .with_segment_size(2048)
//!     .with_batch_iterations(80)
//!     .with_discount_factor(0.99);
//!
//! let mut agent: A2C<B, Actor<B>, Critic<B>, _, _> = A2C::new(
//!     config.clone(),
//!     build_models,
//!     StochasticPolicyGradient::from_config(&config, adam),
//!     VRegression::from_config(&config, adam),
//!     device,
//! )?;
//! agent.initialize(Space::boxed(obs_dim), Space::boxed(act_dim), Some(0))?;
//! ```

pub mod agents;
pub mod algorithms;
pub mod buffers;
pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod normalization;
pub mod updaters;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types
pub use agents::{LastStep, A2C};
pub use config::{A2CConfig, ConfigError};
pub use core::{RunningMeanStd, RunningScalarStats, Space, StepShape, TransitionStep};
pub use error::{A2CError, Result};

pub use buffers::{Batch, Field, MiniBatches, Phase, Segment, SegmentConfig};

pub use algorithms::{
    compute_advantages, normalize_advantages, ActionSampler, ActorModel, AdvantageInputs,
    Categorical, CriticModel, JointSample, JointSampling, Normal, PolicyDistribution,
    SeparateSampling,
};

pub use normalization::{
    ObsNormalizationConfig, ObservationNormalizer, ReturnNormalizationConfig, ReturnNormalizer,
};

pub use updaters::{
    adam, ActorBatch, ActorUpdate, CriticUpdate, Diagnostics, StochasticPolicyGradient,
    VRegression,
};

pub use metrics::{MetricSummary, MetricsStore};

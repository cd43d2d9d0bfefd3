//! Input normalization kept consistent with consumed data.
//!
//! - [`ObservationNormalizer`]: running mean/std per observation component
//! - [`ReturnNormalizer`]: running scale of discounted returns, used to put
//!   critic outputs and regression targets in unit scale
//!
//! Both follow the same protocol: `record` buffers raw values as they arrive,
//! `update` folds everything recorded since the last flush into the running
//! statistics, and the transform in between only reads them. The agent flushes
//! once per learning pass, after the updates of that pass.
//!
//! ```ignore
//! let config = A2CConfig::new()
//!     .with_observation_normalization(Some(ObsNormalizationConfig::new().with_clip_range(Some((-5.0, 5.0)))))
//!     .with_return_normalization(Some(ReturnNormalizationConfig::default()));
//! ```

mod observation_normalizer;
mod return_normalizer;

pub use observation_normalizer::{ObsNormalizationConfig, ObservationNormalizer};
pub use return_normalizer::{ReturnNormalizationConfig, ReturnNormalizer};

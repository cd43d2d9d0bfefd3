//! Error types for the A2C training core.
//!
//! Every variant here is a contract violation: the caller sequenced
//! operations incorrectly or handed over data of the wrong shape. None of
//! them is transient, so nothing in the crate retries.

use thiserror::Error;

use crate::buffers::Field;
use crate::config::ConfigError;

/// Result type for A2C operations.
pub type Result<T> = std::result::Result<T, A2CError>;

/// Errors raised by the segment, the updaters and the agent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum A2CError {
    /// An agent operation was called before `initialize`.
    #[error("agent used before initialize()")]
    NotInitialized,

    /// `initialize` was called twice on the same agent.
    #[error("agent is already initialized")]
    AlreadyInitialized,

    /// `update` was called without a cached `step`.
    #[error("update() called without a preceding step()")]
    UpdateWithoutStep,

    /// `store` was called on a full segment that was not consumed yet.
    #[error("segment is full ({capacity} steps); it must be consumed before storing more")]
    SegmentFull { capacity: usize },

    /// An operation that needs a full segment ran on a partial one.
    #[error("segment is not full: {stored}/{capacity} steps stored")]
    NotReady { stored: usize, capacity: usize },

    /// Advantages or returns were read outside the window in which they are valid.
    #[error("{field} read before compute_returns() ran for the current segment")]
    StaleReturns { field: Field },

    /// A batch was asked for a field it does not carry.
    #[error("field {field} was not requested for this batch")]
    MissingField { field: Field },

    /// A flag field was read as floats or the reverse.
    #[error("field {field} does not hold {expected} data")]
    FieldKind { field: Field, expected: &'static str },

    /// Input data does not have the expected length.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An updater was asked to step before it was bound to a model.
    #[error("{0} updater used before initialize()")]
    UpdaterNotInitialized(&'static str),

    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl A2CError {
    /// Shorthand for a length check that failed.
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        A2CError::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }
}

/// Fail with [`A2CError::ShapeMismatch`] unless `actual == expected`.
pub(crate) fn ensure_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(A2CError::shape(what, expected, actual))
    }
}

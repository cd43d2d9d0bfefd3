//! Observation and action space descriptors.

use serde::{Deserialize, Serialize};

/// Shape of an observation or action space.
///
/// Batched data is always flat: one row of [`Space::flat_dim`] floats per
/// environment. Discrete spaces store the chosen index as a single float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Space {
    /// Continuous box with the given shape.
    Box { shape: Vec<usize> },
    /// `n` discrete choices.
    Discrete { n: usize },
}

impl Space {
    /// Flat continuous box of `dim` components.
    pub fn boxed(dim: usize) -> Self {
        Space::Box { shape: vec![dim] }
    }

    pub fn discrete(n: usize) -> Self {
        Space::Discrete { n }
    }

    /// Floats per row when a value of this space is flattened.
    pub fn flat_dim(&self) -> usize {
        match self {
            Space::Box { shape } => shape.iter().product(),
            Space::Discrete { .. } => 1,
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Space::Discrete { .. })
    }
}

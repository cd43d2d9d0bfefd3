//! Agents driving the collect / learn cycle.

pub mod a2c;

pub use a2c::{InferenceDistribution, LastStep, ModelBuilder, A2C};

#[cfg(test)]
mod tests;

//! Tests for the algorithms module.
//!
//! - `gae_tests`: advantage recursion fixtures and properties
//! - `distribution_tests`: sampling, log-probabilities and sampling strategies

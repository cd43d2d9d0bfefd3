//! Trajectory storage for on-policy learning.
//!
//! - `Segment`: fixed-length rollout consumed once per learning pass, with
//!   advantage computation and shuffled mini-batch views

pub mod segment;

pub use segment::{Batch, Column, Field, MiniBatches, OwnedBatch, Phase, Segment, SegmentConfig};

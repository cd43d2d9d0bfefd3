//! Diagnostics collected across learning passes.
//!
//! - [`MetricsStore`]: accumulating key/value store with per-key summaries

pub mod store;

pub use store::{MetricSummary, MetricsStore};

//! Key/value store for learning-pass diagnostics.
//!
//! Values accumulate under string keys (`actor/loss`, `critic/v`, ...) until
//! the caller drains them, typically once per logging interval.

use std::collections::BTreeMap;
use std::fmt;

/// Summary of the values stored under one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    pub count: usize,
}

impl MetricSummary {
    fn from_values(values: &[f32]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let (min, max) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(Self {
            mean: values.iter().sum::<f32>() / values.len() as f32,
            min,
            max,
            count: values.len(),
        })
    }
}

/// Accumulating metrics store.
#[derive(Debug, Clone, Default)]
pub struct MetricsStore {
    values: BTreeMap<String, Vec<f32>>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value under `key`.
    pub fn store(&mut self, key: impl Into<String>, value: f32) {
        self.values.entry(key.into()).or_default().push(value);
    }

    /// Append every entry of `diagnostics` under `prefix/<name>`.
    pub fn store_prefixed<'a>(
        &mut self,
        prefix: &str,
        diagnostics: impl IntoIterator<Item = (&'a String, &'a f32)>,
    ) {
        for (name, &value) in diagnostics {
            self.store(format!("{}/{}", prefix, name), value);
        }
    }

    /// Mean of the values under `key`, `None` when nothing was stored.
    pub fn mean(&self, key: &str) -> Option<f32> {
        self.summary(key).map(|s| s.mean)
    }

    /// Most recent value under `key`.
    pub fn last(&self, key: &str) -> Option<f32> {
        self.values.get(key).and_then(|v| v.last().copied())
    }

    pub fn count(&self, key: &str) -> usize {
        self.values.get(key).map_or(0, Vec::len)
    }

    pub fn summary(&self, key: &str) -> Option<MetricSummary> {
        self.values.get(key).and_then(|v| MetricSummary::from_values(v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Summarize every key and clear the store.
    pub fn drain(&mut self) -> BTreeMap<String, MetricSummary> {
        std::mem::take(&mut self.values)
            .into_iter()
            .filter_map(|(k, v)| MetricSummary::from_values(&v).map(|s| (k, s)))
            .collect()
    }
}

/// `key=mean` pairs, one line, sorted by key.
impl fmt::Display for MetricsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for key in self.values.keys() {
            if let Some(summary) = self.summary(key) {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{}={:.4}", key, summary.mean)?;
                first = false;
            }
        }
        Ok(())
    }
}

//! Metric catalog: identifiers, names, and aggregation strategies
//!
//! The engine itself is metric-agnostic; callers describe the metrics they
//! ingest by registering them here. Ids are dense small integers starting at
//! 0 so per-metric data can live in plain arrays instead of hash maps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dense metric identifier, assigned in registration order starting at 0
pub type MetricId = u16;

/// How samples of a metric are reduced within one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationStrategy {
    /// Keep the value with the newest sample timestamp
    Latest,

    /// Keep the maximum value
    Max,

    /// Running mean of all values
    Avg,

    /// Sum of all values
    Sum,
}

/// Descriptor of a registered metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricInfo {
    id: MetricId,
    name: String,
    strategy: AggregationStrategy,
}

impl MetricInfo {
    /// The dense metric id
    pub fn id(&self) -> MetricId {
        self.id
    }

    /// Human-readable metric name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The window reduction strategy
    pub fn strategy(&self) -> AggregationStrategy {
        self.strategy
    }
}

/// Catalog of all metrics known to the engine
///
/// Lookups by id are O(1). The registry is built once at startup and shared
/// immutably afterwards.
///
/// # Example
///
/// ```rust
/// use loadwatch::metrics::{AggregationStrategy, MetricRegistry};
///
/// let mut registry = MetricRegistry::new();
/// let cpu = registry.register("cpu", AggregationStrategy::Avg).unwrap();
/// let disk = registry.register("disk", AggregationStrategy::Latest).unwrap();
/// assert_eq!(cpu, 0);
/// assert_eq!(disk, 1);
/// assert_eq!(registry.info(cpu).unwrap().name(), "cpu");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricRegistry {
    metrics: Vec<MetricInfo>,
    ids_by_name: HashMap<String, MetricId>,
}

impl MetricRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric and return its dense id
    ///
    /// Fails if the name is already registered or the id space (u16) is
    /// exhausted.
    pub fn register(&mut self, name: &str, strategy: AggregationStrategy) -> Result<MetricId> {
        if self.ids_by_name.contains_key(name) {
            return Err(Error::InvalidArgument(format!(
                "Metric '{}' is already registered",
                name
            )));
        }
        if self.metrics.len() > usize::from(MetricId::MAX) {
            return Err(Error::InvalidArgument(
                "Metric id space exhausted".to_string(),
            ));
        }
        let id = self.metrics.len() as MetricId;
        self.metrics.push(MetricInfo {
            id,
            name: name.to_string(),
            strategy,
        });
        self.ids_by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// All registered metrics in id order
    pub fn all(&self) -> &[MetricInfo] {
        &self.metrics
    }

    /// Descriptor for a metric id
    pub fn info(&self, id: MetricId) -> Option<&MetricInfo> {
        self.metrics.get(usize::from(id))
    }

    /// Look up a metric id by name
    pub fn metric_id(&self, name: &str) -> Option<MetricId> {
        self.ids_by_name.get(name).copied()
    }

    /// Number of registered metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether no metrics are registered
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_dense_ids() {
        let mut registry = MetricRegistry::new();
        assert_eq!(registry.register("a", AggregationStrategy::Avg).unwrap(), 0);
        assert_eq!(registry.register("b", AggregationStrategy::Max).unwrap(), 1);
        assert_eq!(registry.register("c", AggregationStrategy::Sum).unwrap(), 2);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.metric_id("b"), Some(1));
        assert_eq!(registry.info(2).unwrap().strategy(), AggregationStrategy::Sum);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = MetricRegistry::new();
        registry.register("a", AggregationStrategy::Avg).unwrap();
        assert!(registry.register("a", AggregationStrategy::Max).is_err());
    }

    #[test]
    fn test_unknown_lookups() {
        let registry = MetricRegistry::new();
        assert!(registry.info(0).is_none());
        assert!(registry.metric_id("missing").is_none());
        assert!(registry.is_empty());
    }
}

//! Core data types used throughout the aggregation engine
//!
//! This module defines the fundamental data structures shared across the
//! system:
//!
//! # Key Types
//!
//! - **`Entity`**: trait for the identities samples are attributed to
//!   (partitions, brokers, ...), each carrying a group tag
//! - **`Sample`**: a single timestamped set of per-metric values for an entity
//! - **`SampleValidator`**: pluggable acceptance check applied on ingestion
//! - **`WindowIndex`**: integer identifier of a fixed-width time window
//!
//! # Example
//!
//! ```rust
//! use loadwatch::types::Sample;
//! use std::collections::HashMap;
//!
//! let mut values = HashMap::new();
//! values.insert(0, 42.5);
//! let sample = Sample::new("partition-7", 1_700_000_000_000, values);
//! assert_eq!(sample.time_ms, 1_700_000_000_000);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::metrics::{MetricId, MetricRegistry};

/// Identifier of a fixed-width time window
///
/// A window with index `w` covers the absolute interval
/// `[w * window_ms, (w + 1) * window_ms)`.
pub type WindowIndex = i64;

/// An identity that metric samples are attributed to
///
/// Entities are opaque to the engine apart from equality, hashing, and their
/// group tag. The group partitions entities into equivalence classes used by
/// the group-granularity completeness rules (e.g., partitions of the same
/// topic, brokers of the same rack).
///
/// Equality and `group()` must be stable for the lifetime of the entity.
pub trait Entity: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Group tag type shared by entities of the same equivalence class
    type Group: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// The group this entity belongs to
    fn group(&self) -> Self::Group;
}

/// A single metric sample produced for one entity
///
/// Carries one value per metric id. Samples are unordered within a window;
/// aggregation is order-independent except for `Latest`, which is resolved by
/// the sample timestamp.
#[derive(Debug, Clone)]
pub struct Sample<E> {
    /// The entity this sample is attributed to
    pub entity: E,

    /// Sample time as Unix milliseconds
    pub time_ms: i64,

    /// Metric values keyed by metric id
    pub values: HashMap<MetricId, f64>,

    /// Opaque producer tag (e.g., the reporting broker id); validators may
    /// inspect it, the engine itself does not
    pub origin: Option<u64>,
}

impl<E> Sample<E> {
    /// Create a sample without an origin tag
    pub fn new(entity: E, time_ms: i64, values: HashMap<MetricId, f64>) -> Self {
        Self {
            entity,
            time_ms,
            values,
            origin: None,
        }
    }

    /// Attach an opaque origin tag
    pub fn with_origin(mut self, origin: u64) -> Self {
        self.origin = Some(origin);
        self
    }
}

/// Acceptance check applied to every sample before ingestion
///
/// Implementations decide whether a sample is trustworthy enough to enter the
/// store (e.g., it came from the current partition leader, it carries all
/// expected metrics). Rejected samples are discarded without any state
/// change.
pub trait SampleValidator<E>: Send + Sync {
    /// Whether the sample should be accepted
    fn is_valid(&self, sample: &Sample<E>) -> bool;
}

/// Default validator: accept a sample iff it carries a value for every
/// registered metric
pub struct CompleteSampleValidator {
    num_metrics: usize,
}

impl CompleteSampleValidator {
    /// Create a validator for the given metric catalog
    pub fn new(registry: &MetricRegistry) -> Self {
        Self {
            num_metrics: registry.len(),
        }
    }
}

impl<E> SampleValidator<E> for CompleteSampleValidator {
    fn is_valid(&self, sample: &Sample<E>) -> bool {
        sample.values.len() == self.num_metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AggregationStrategy;

    fn test_registry() -> MetricRegistry {
        let mut registry = MetricRegistry::new();
        registry.register("cpu", AggregationStrategy::Avg).unwrap();
        registry
            .register("disk", AggregationStrategy::Latest)
            .unwrap();
        registry
    }

    #[test]
    fn test_complete_sample_validator() {
        let registry = test_registry();
        let validator = CompleteSampleValidator::new(&registry);

        let mut values = HashMap::new();
        values.insert(0, 1.0);
        let partial = Sample::new("e1", 1000, values.clone());
        assert!(!SampleValidator::<&str>::is_valid(&validator, &partial));

        values.insert(1, 2.0);
        let complete = Sample::new("e1", 1000, values);
        assert!(SampleValidator::<&str>::is_valid(&validator, &complete));
    }

    #[test]
    fn test_sample_origin() {
        let sample = Sample::new("e1", 1000, HashMap::new()).with_origin(42);
        assert_eq!(sample.origin, Some(42));
    }
}

//! Aggregation result types
//!
//! Results carry one value vector per metric across the selected windows,
//! ordered most-recent first, with extrapolated positions tagged.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::aggregation::extrapolation::Extrapolation;
use crate::metrics::MetricId;
use crate::types::Entity;

/// Dense per-metric value vectors across the selected windows
///
/// Indexed by metric id on the first axis and window position on the second,
/// allocated once per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricValues {
    values: Vec<Vec<f64>>,
}

impl MetricValues {
    pub(crate) fn new(num_metrics: usize, num_windows: usize) -> Self {
        Self {
            values: vec![vec![0.0; num_windows]; num_metrics],
        }
    }

    pub(crate) fn set(&mut self, metric_id: MetricId, position: usize, value: f64) {
        self.values[usize::from(metric_id)][position] = value;
    }

    /// Values for one metric, one slot per selected window
    pub fn values_for(&self, metric_id: MetricId) -> &[f64] {
        &self.values[usize::from(metric_id)]
    }

    /// Number of windows each vector covers
    pub fn num_windows(&self) -> usize {
        self.values.first().map(|v| v.len()).unwrap_or(0)
    }
}

/// Per-entity aggregation output: window axis, values, and extrapolations
#[derive(Debug, Clone)]
pub struct ValuesAndExtrapolations {
    /// Window start timestamps in milliseconds, most recent first
    windows: Vec<i64>,

    /// Value vectors per metric, aligned with `windows`
    metric_values: MetricValues,

    /// Extrapolation applied per window position; positions absent from the
    /// map were fully sampled
    extrapolations: BTreeMap<usize, Extrapolation>,
}

impl ValuesAndExtrapolations {
    pub(crate) fn new(windows: Vec<i64>, metric_values: MetricValues) -> Self {
        Self {
            windows,
            metric_values,
            extrapolations: BTreeMap::new(),
        }
    }

    pub(crate) fn record_extrapolation(&mut self, position: usize, extrapolation: Extrapolation) {
        self.extrapolations.insert(position, extrapolation);
    }

    /// Window start timestamps in milliseconds, most recent first
    pub fn windows(&self) -> &[i64] {
        &self.windows
    }

    /// The per-metric value vectors
    pub fn metric_values(&self) -> &MetricValues {
        &self.metric_values
    }

    /// Extrapolations by window position
    pub fn extrapolations(&self) -> &BTreeMap<usize, Extrapolation> {
        &self.extrapolations
    }
}

/// Output of an aggregation query
#[derive(Debug, Clone)]
pub struct AggregationResult<E: Entity> {
    generation: u64,
    values_and_extrapolations: HashMap<E, ValuesAndExtrapolations>,
    invalid_entities: HashSet<E>,
}

impl<E: Entity> AggregationResult<E> {
    pub(crate) fn new(
        generation: u64,
        values_and_extrapolations: HashMap<E, ValuesAndExtrapolations>,
        invalid_entities: HashSet<E>,
    ) -> Self {
        Self {
            generation,
            values_and_extrapolations,
            invalid_entities,
        }
    }

    /// Generation the result was computed at; the result is stale once the
    /// aggregator's generation moves past it
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Per-entity values and extrapolations
    pub fn values_and_extrapolations(&self) -> &HashMap<E, ValuesAndExtrapolations> {
        &self.values_and_extrapolations
    }

    /// Entities that failed validity under the query options
    pub fn invalid_entities(&self) -> &HashSet<E> {
        &self.invalid_entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_values_layout() {
        let mut values = MetricValues::new(2, 3);
        values.set(0, 0, 1.0);
        values.set(1, 2, 9.0);
        assert_eq!(values.values_for(0), &[1.0, 0.0, 0.0]);
        assert_eq!(values.values_for(1), &[0.0, 0.0, 9.0]);
        assert_eq!(values.num_windows(), 3);
    }

    #[test]
    fn test_extrapolation_positions() {
        let mut vae =
            ValuesAndExtrapolations::new(vec![3000, 2000, 1000], MetricValues::new(1, 3));
        vae.record_extrapolation(1, Extrapolation::AvgAdjacent);
        assert_eq!(vae.windows(), &[3000, 2000, 1000]);
        assert_eq!(
            vae.extrapolations().get(&1),
            Some(&Extrapolation::AvgAdjacent)
        );
        assert!(vae.extrapolations().get(&0).is_none());
    }
}

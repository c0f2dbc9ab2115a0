//! Per-(entity, window) sample accumulation
//!
//! A `WindowAccumulator` keeps one running reduction per registered metric
//! and a sample counter. Mutation happens inside a short critical section;
//! reads of the counter are lock-free. `snapshot` seals the current
//! reductions into a plain `WindowValues` keyed by dense metric id.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::metrics::{AggregationStrategy, MetricRegistry};
use crate::types::Sample;

/// Running reduction of one metric within one window
///
/// Tracks enough state to finalize any of the supported strategies.
#[derive(Debug, Clone, Copy)]
struct ReductionState {
    /// Number of values observed for this metric
    count: u64,

    /// Sum of values (for avg, sum)
    sum: f64,

    /// Maximum value
    max: f64,

    /// Timestamp of the newest value
    latest_ts: i64,

    /// Newest value by timestamp
    latest: f64,
}

impl ReductionState {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            max: f64::NEG_INFINITY,
            latest_ts: i64::MIN,
            latest: 0.0,
        }
    }

    /// Fold one value into the reduction
    fn add(&mut self, time_ms: i64, value: f64) {
        self.count += 1;
        self.sum += value;
        if value > self.max {
            self.max = value;
        }
        if time_ms >= self.latest_ts {
            self.latest_ts = time_ms;
            self.latest = value;
        }
    }

    /// Finalize the reduction for the given strategy
    ///
    /// A metric that never received a value finalizes to 0.0.
    fn finalize(&self, strategy: AggregationStrategy) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        match strategy {
            AggregationStrategy::Latest => self.latest,
            AggregationStrategy::Max => self.max,
            AggregationStrategy::Avg => self.sum / self.count as f64,
            AggregationStrategy::Sum => self.sum,
        }
    }
}

/// Accumulated metric state for one entity within one window
#[derive(Debug)]
pub struct WindowAccumulator {
    /// One reduction slot per registered metric, indexed by metric id
    reductions: Mutex<Vec<ReductionState>>,

    /// Total samples folded into this accumulator
    num_samples: AtomicU64,
}

impl WindowAccumulator {
    /// Create an empty accumulator for a catalog of `num_metrics` metrics
    pub fn new(num_metrics: usize) -> Self {
        Self {
            reductions: Mutex::new(vec![ReductionState::new(); num_metrics]),
            num_samples: AtomicU64::new(0),
        }
    }

    /// Fold a sample into the reductions
    ///
    /// Values with out-of-range metric ids are ignored.
    pub fn add_sample<E>(&self, sample: &Sample<E>) {
        let mut reductions = self.reductions.lock();
        for (&metric_id, &value) in &sample.values {
            if let Some(state) = reductions.get_mut(usize::from(metric_id)) {
                state.add(sample.time_ms, value);
            }
        }
        self.num_samples.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of samples folded in so far
    pub fn num_samples(&self) -> u64 {
        self.num_samples.load(Ordering::SeqCst)
    }

    /// Whether at least `min_samples` samples were folded in
    pub fn has_enough_samples(&self, min_samples: u64) -> bool {
        self.num_samples() >= min_samples
    }

    /// Seal the current reductions into a plain value vector
    pub fn snapshot(&self, registry: &MetricRegistry) -> WindowValues {
        let reductions = self.reductions.lock();
        let values = registry
            .all()
            .iter()
            .map(|info| {
                reductions
                    .get(usize::from(info.id()))
                    .map(|state| state.finalize(info.strategy()))
                    .unwrap_or(0.0)
            })
            .collect();
        WindowValues { values }
    }
}

/// Sealed per-metric values of one (entity, window) cell
///
/// Values are stored in a dense vector indexed by metric id.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowValues {
    values: Vec<f64>,
}

impl WindowValues {
    /// All-zero values for a catalog of `num_metrics` metrics
    pub fn zeros(num_metrics: usize) -> Self {
        Self {
            values: vec![0.0; num_metrics],
        }
    }

    /// Value for a metric id (0.0 for unknown ids)
    pub fn get(&self, metric_id: u16) -> f64 {
        self.values.get(usize::from(metric_id)).copied().unwrap_or(0.0)
    }

    /// Dense value slice indexed by metric id
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Element-wise arithmetic mean of two value vectors
    pub fn mean_of(a: &WindowValues, b: &WindowValues) -> WindowValues {
        let values = a
            .values
            .iter()
            .zip(&b.values)
            .map(|(x, y)| (x + y) / 2.0)
            .collect();
        WindowValues { values }
    }
}

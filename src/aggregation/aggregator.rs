//! The sample aggregator: ingestion, window lifecycle, and the query paths
//!
//! `SampleAggregator` accepts samples from many producer threads, buckets
//! them into fixed-width windows, retains a bounded sliding history, and
//! serves aggregation and completeness queries concurrently.
//!
//! # Concurrency model
//!
//! - Window creation, rollover, and eviction are serialized by a coarse
//!   structural lock, so readers observe a consistent active window and
//!   generation.
//! - Per-accumulator updates take a short internal critical section.
//! - Queries register as in-progress collections; while any collection is in
//!   flight, eviction is suppressed so the window set cannot shrink mid-read.
//! - A monotonic generation counter is bumped by every mutation that can
//!   change an aggregate (rollover, back-insertion, clear). Cached results
//!   are discarded on any generation mismatch.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::aggregation::accumulator::WindowValues;
use crate::aggregation::completeness::{analyze, AggregationOptions, Completeness};
use crate::aggregation::extrapolation::{resolve_cell, Extrapolation};
use crate::aggregation::result::{AggregationResult, MetricValues, ValuesAndExtrapolations};
use crate::aggregation::state::{AggregatorState, AggregatorStateSnapshot};
use crate::aggregation::store::{RawStore, WindowMap};
use crate::aggregation::window::{resolve_range, window_index, window_start_ms};
use crate::config::AggregatorConfig;
use crate::error::{Error, Result};
use crate::metrics::MetricRegistry;
use crate::types::{CompleteSampleValidator, Entity, Sample, SampleValidator, WindowIndex};

/// Sentinel for "no sample accepted yet"
const NO_ACTIVE_WINDOW: i64 = i64::MIN;

// ============================================================================
// Statistics
// ============================================================================

/// Statistics for aggregator operations
#[derive(Debug, Default)]
pub struct AggregatorStats {
    /// Samples accepted into the store
    samples_accepted: AtomicU64,

    /// Samples rejected by validation or staleness
    samples_rejected: AtomicU64,

    /// Window rollovers
    windows_rolled: AtomicU64,

    /// Windows evicted from the store
    windows_evicted: AtomicU64,

    /// Aggregations computed (cache misses)
    aggregations_computed: AtomicU64,

    /// Aggregations served from the cache
    aggregation_cache_hits: AtomicU64,

    /// Completeness analyses served from the cache
    completeness_cache_hits: AtomicU64,
}

impl AggregatorStats {
    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> AggregatorStatsSnapshot {
        AggregatorStatsSnapshot {
            samples_accepted: self.samples_accepted.load(Ordering::Relaxed),
            samples_rejected: self.samples_rejected.load(Ordering::Relaxed),
            windows_rolled: self.windows_rolled.load(Ordering::Relaxed),
            windows_evicted: self.windows_evicted.load(Ordering::Relaxed),
            aggregations_computed: self.aggregations_computed.load(Ordering::Relaxed),
            aggregation_cache_hits: self.aggregation_cache_hits.load(Ordering::Relaxed),
            completeness_cache_hits: self.completeness_cache_hits.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of aggregator statistics
#[derive(Debug, Clone)]
pub struct AggregatorStatsSnapshot {
    /// Samples accepted into the store
    pub samples_accepted: u64,
    /// Samples rejected by validation or staleness
    pub samples_rejected: u64,
    /// Window rollovers
    pub windows_rolled: u64,
    /// Windows evicted from the store
    pub windows_evicted: u64,
    /// Aggregations computed (cache misses)
    pub aggregations_computed: u64,
    /// Aggregations served from the cache
    pub aggregation_cache_hits: u64,
    /// Completeness analyses served from the cache
    pub completeness_cache_hits: u64,
}

// ============================================================================
// Internal plumbing
// ============================================================================

/// Single-slot aggregation cache. A cached result is reusable only while the
/// generation is unchanged, for the same options, and for queries spanning
/// the full retained range.
struct CachedAggregation<E: Entity> {
    options: AggregationOptions<E>,
    generation: u64,
    result: Arc<AggregationResult<E>>,
}

/// RAII registration of an in-flight collection; suppresses eviction while
/// alive and is released on every exit path
struct CollectionGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for CollectionGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Sample Aggregator
// ============================================================================

/// Windowed, multi-entity metric sample aggregator
///
/// # Example
///
/// ```rust
/// use loadwatch::aggregation::SampleAggregator;
/// use loadwatch::config::AggregatorConfig;
/// use loadwatch::metrics::{AggregationStrategy, MetricRegistry};
/// use loadwatch::types::{Entity, Sample};
/// use std::collections::HashMap;
/// use std::sync::Arc;
///
/// #[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// struct Partition(u32);
///
/// impl Entity for Partition {
///     type Group = u32;
///     fn group(&self) -> u32 { self.0 / 16 }
/// }
///
/// let mut registry = MetricRegistry::new();
/// let cpu = registry.register("cpu", AggregationStrategy::Avg).unwrap();
///
/// let config = AggregatorConfig {
///     num_windows: 4,
///     window_ms: 1000,
///     min_samples_per_window: 1,
///     ..AggregatorConfig::default()
/// };
/// let aggregator = SampleAggregator::new(config, Arc::new(registry)).unwrap();
///
/// let mut values = HashMap::new();
/// values.insert(cpu, 0.75);
/// assert!(aggregator.add(Sample::new(Partition(3), 5_000, values)));
/// assert_eq!(aggregator.earliest_window(), Some(5_000));
/// ```
pub struct SampleAggregator<E: Entity> {
    config: AggregatorConfig,
    registry: Arc<MetricRegistry>,
    validator: Box<dyn SampleValidator<E>>,

    store: RawStore<E>,
    state: Mutex<AggregatorState<E>>,

    /// Serializes rollover, eviction, back-insert invalidation, and clear
    structural: Mutex<()>,

    active_window: AtomicI64,
    generation: AtomicU64,

    /// While positive, eviction is suppressed
    collections_in_progress: AtomicUsize,

    cached: Mutex<Option<CachedAggregation<E>>>,
    stats: AggregatorStats,
}

impl<E: Entity> SampleAggregator<E> {
    /// Create an aggregator with the default validator (a sample must carry a
    /// value for every registered metric)
    pub fn new(config: AggregatorConfig, registry: Arc<MetricRegistry>) -> Result<Self> {
        let validator = Box::new(CompleteSampleValidator::new(&registry));
        Self::with_validator(config, registry, validator)
    }

    /// Create an aggregator with a caller-supplied validator
    pub fn with_validator(
        config: AggregatorConfig,
        registry: Arc<MetricRegistry>,
        validator: Box<dyn SampleValidator<E>>,
    ) -> Result<Self> {
        config.validate()?;
        let completeness_cache_size = config.completeness_cache_size;
        Ok(Self {
            config,
            registry,
            validator,
            store: RawStore::new(),
            state: Mutex::new(AggregatorState::new(completeness_cache_size)),
            structural: Mutex::new(()),
            active_window: AtomicI64::new(NO_ACTIVE_WINDOW),
            generation: AtomicU64::new(0),
            collections_in_progress: AtomicUsize::new(0),
            cached: Mutex::new(None),
            stats: AggregatorStats::default(),
        })
    }

    /// Add a sample. Thread safe.
    ///
    /// Returns `false` when the sample fails validation or maps to a window
    /// older than the earliest retained one; nothing changes in either case.
    /// A sample for a window newer than the active one rolls the active
    /// window forward; a sample for a settled window back-inserts and
    /// invalidates cached results.
    pub fn add(&self, sample: Sample<E>) -> bool {
        if !self.validator.is_valid(&sample) {
            trace!(entity = ?sample.entity, time_ms = sample.time_ms, "Sample rejected by validator");
            self.stats.samples_rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let window = window_index(sample.time_ms, self.config.window_ms);
        if let Some(earliest) = self.store.first_index() {
            if window < earliest {
                debug!(
                    window,
                    earliest, "Sample rejected: window already evicted"
                );
                self.stats.samples_rejected.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        }

        let bucket = match self.store.get(window) {
            Some(bucket) => bucket,
            None => {
                // First sample of this window; creation, rollover, and
                // eviction are serialized by the structural lock.
                let _lock = self.structural.lock();
                // Re-check staleness under the lock: the window may have been
                // evicted since the unlocked check, and must not come back.
                if let Some(earliest) = self.store.first_index() {
                    if window < earliest {
                        debug!(window, earliest, "Sample rejected: window already evicted");
                        self.stats.samples_rejected.fetch_add(1, Ordering::Relaxed);
                        return false;
                    }
                }
                let (bucket, created) =
                    self.store.get_or_create(window, self.generation.load(Ordering::SeqCst));
                let previous_active = self.active_window.load(Ordering::SeqCst);
                if created && window > previous_active {
                    self.active_window.store(window, Ordering::SeqCst);
                    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                    bucket.touched(generation);
                    // The settling window's final contents are now visible to
                    // coverage and donor lookups; restamp it so dependent
                    // window states recompute.
                    if previous_active != NO_ACTIVE_WINDOW {
                        if let Some(settled) = self.store.get(previous_active) {
                            settled.touched(generation);
                        }
                    }
                    self.stats.windows_rolled.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        window,
                        num_windows = self.store.len(),
                        "Rolled over to new active window"
                    );
                    while self.collections_in_progress.load(Ordering::SeqCst) == 0
                        && self.store.len() > self.config.num_windows_to_keep()
                    {
                        match self.store.evict_oldest() {
                            Some(evicted) => {
                                self.state
                                    .lock()
                                    .remove_window(evicted, self.config.num_windows as i64);
                                self.stats.windows_evicted.fetch_add(1, Ordering::Relaxed);
                                debug!(
                                    window = evicted,
                                    num_windows = self.store.len(),
                                    "Evicted oldest window"
                                );
                            }
                            None => break,
                        }
                    }
                }
                bucket
            }
        };

        let accumulator = bucket.accumulator_for(&sample.entity, self.registry.len());
        accumulator.add_sample(&sample);

        if window != self.active_window.load(Ordering::SeqCst) {
            // Back-insertion into a settled window: cached aggregates are no
            // longer trustworthy.
            let _lock = self.structural.lock();
            *self.cached.lock() = None;
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            bucket.touched(generation);
            trace!(window, generation, "Back-inserted sample into settled window");
        } else {
            bucket.touched(self.generation.load(Ordering::SeqCst));
        }

        self.stats.samples_accepted.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Aggregate the retained samples in `[from_ms, to_ms]` under the given
    /// options
    ///
    /// The result covers exactly `options.num_windows` windows, most recent
    /// first, chosen from the valid windows of the range; the active window
    /// never participates. Fails with `NotEnoughValidWindows` when fewer
    /// valid windows exist.
    pub fn aggregate(
        &self,
        from_ms: i64,
        to_ms: i64,
        options: &AggregationOptions<E>,
    ) -> Result<Arc<AggregationResult<E>>> {
        if options.num_windows == 0 {
            return Err(Error::InvalidArgument(
                "num_windows must be positive".to_string(),
            ));
        }
        if from_ms > to_ms {
            return Err(Error::InvalidArgument(format!(
                "Invalid range: from {} > to {}",
                from_ms, to_ms
            )));
        }

        let _guard = self.begin_collection();
        let generation = self.generation.load(Ordering::SeqCst);

        {
            let cached = self.cached.lock();
            if let Some(entry) = cached.as_ref() {
                if entry.generation == generation
                    && entry.options == *options
                    && self.covers_retained_range(from_ms, to_ms)
                {
                    debug!("Returning aggregation result from cache");
                    self.stats.aggregation_cache_hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(entry.result.clone());
                }
            }
        }

        debug!(from_ms, to_ms, "Computing aggregation");
        let completeness = self.completeness_at(from_ms, to_ms, options, generation);

        let valid: Vec<WindowIndex> = completeness.valid_window_indexes().iter().copied().collect();
        if valid.len() < options.num_windows {
            return Err(Error::NotEnoughValidWindows {
                num_valid: valid.len(),
                required: options.num_windows,
            });
        }
        // The most recent num_windows valid windows, most recent first
        let selected: Vec<WindowIndex> = valid[valid.len() - options.num_windows..]
            .iter()
            .rev()
            .copied()
            .collect();
        let window_starts: Vec<i64> = selected
            .iter()
            .map(|&index| window_start_ms(index, self.config.window_ms))
            .collect();

        let windows = self.store.read();
        let interested = self.resolve_interested(&windows, options);
        let included: Vec<E> = if options.include_invalid_entities {
            interested.iter().cloned().collect()
        } else {
            completeness.valid_entities().iter().cloned().collect()
        };

        let mut values_by_entity = HashMap::with_capacity(included.len());
        for entity in included {
            let mut metric_values = MetricValues::new(self.registry.len(), selected.len());
            let mut extrapolations: Vec<(usize, Extrapolation)> = Vec::new();
            for (position, &index) in selected.iter().enumerate() {
                let cell = resolve_cell(
                    &windows,
                    &self.registry,
                    &self.config,
                    &entity,
                    index,
                    options.include_invalid_entities,
                )
                .ok_or_else(|| {
                    Error::Inconsistency(format!(
                        "No value resolvable for entity {:?} in window {}",
                        entity, index
                    ))
                })?;
                for info in self.registry.all() {
                    metric_values.set(info.id(), position, cell.values.get(info.id()));
                }
                if let Some(kind) = cell.extrapolation {
                    extrapolations.push((position, kind));
                }
            }
            let mut entry = ValuesAndExtrapolations::new(window_starts.clone(), metric_values);
            for (position, kind) in extrapolations {
                entry.record_extrapolation(position, kind);
            }
            values_by_entity.insert(entity, entry);
        }

        let invalid_entities: HashSet<E> = interested
            .iter()
            .filter(|entity| !completeness.valid_entities().contains(*entity))
            .cloned()
            .collect();
        drop(windows);

        let result = Arc::new(AggregationResult::new(
            generation,
            values_by_entity,
            invalid_entities,
        ));
        self.stats.aggregations_computed.fetch_add(1, Ordering::Relaxed);

        // Only full-range results are worth caching: those are the ones the
        // monitor polls repeatedly.
        if self.covers_retained_range(from_ms, to_ms)
            && generation == self.generation.load(Ordering::SeqCst)
        {
            let _lock = self.structural.lock();
            *self.cached.lock() = Some(CachedAggregation {
                options: options.clone(),
                generation,
                result: result.clone(),
            });
        }

        Ok(result)
    }

    /// Analyze data completeness over `[from_ms, to_ms]` under the given
    /// options
    ///
    /// Never fails: an empty or out-of-range query yields empty sets. The
    /// active window is never a candidate.
    pub fn completeness(
        &self,
        from_ms: i64,
        to_ms: i64,
        options: &AggregationOptions<E>,
    ) -> Arc<Completeness<E>> {
        let _guard = self.begin_collection();
        let generation = self.generation.load(Ordering::SeqCst);
        self.completeness_at(from_ms, to_ms, options, generation)
    }

    /// Completeness with the collection gate already held
    fn completeness_at(
        &self,
        from_ms: i64,
        to_ms: i64,
        options: &AggregationOptions<E>,
        generation: u64,
    ) -> Arc<Completeness<E>> {
        let mut state = self.state.lock();
        // Only full-range analyses are cached; a narrower range must not
        // alias a full-range result under the same options.
        let cacheable = self.covers_retained_range(from_ms, to_ms);
        if cacheable {
            if let Some(cached) = state.cached_completeness(options, generation) {
                debug!("Returning completeness from cache");
                self.stats.completeness_cache_hits.fetch_add(1, Ordering::Relaxed);
                return cached;
            }
        }

        let windows = self.store.read();
        let active = self.active();
        state.refresh(&windows, active, &self.config, generation);

        let range: Vec<WindowIndex> = match (windows.keys().next().copied(), active) {
            (Some(earliest), Some(active)) => {
                match resolve_range(from_ms, to_ms, self.config.window_ms, earliest, active) {
                    Some((from, to)) => windows.range(from..=to).map(|(&index, _)| index).collect(),
                    None => Vec::new(),
                }
            }
            _ => Vec::new(),
        };

        let interested = self.resolve_interested(&windows, options);
        let coverage = state.coverage();
        drop(windows);

        let completeness = Arc::new(analyze(
            &range,
            &coverage,
            &interested,
            options,
            generation,
        ));
        if cacheable {
            state.cache_completeness(options.clone(), generation, completeness.clone());
        }
        completeness
    }

    /// Current mutation generation; monotone non-decreasing
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start of the earliest retained window in milliseconds
    pub fn earliest_window(&self) -> Option<i64> {
        self.store
            .first_index()
            .map(|index| window_start_ms(index, self.config.window_ms))
    }

    /// Start timestamps of all retained windows, ascending
    pub fn all_windows(&self) -> Vec<i64> {
        self.store
            .indexes()
            .into_iter()
            .map(|index| window_start_ms(index, self.config.window_ms))
            .collect()
    }

    /// Start timestamps of the retained windows excluding the active one,
    /// ascending
    pub fn available_windows(&self) -> Vec<i64> {
        let active = self.active();
        self.store
            .indexes()
            .into_iter()
            .filter(|index| Some(*index) != active)
            .map(|index| window_start_ms(index, self.config.window_ms))
            .collect()
    }

    /// Number of retained windows excluding the active one
    pub fn num_available_windows(&self) -> usize {
        self.available_windows().len()
    }

    /// Total samples across the retained store
    pub fn num_samples(&self) -> u64 {
        self.store.num_samples()
    }

    /// Point-in-time sealed values of every retained window per entity
    ///
    /// Best-effort consistent: concurrent writers may land between window
    /// reads.
    pub fn window_values(&self) -> BTreeMap<i64, HashMap<E, WindowValues>> {
        let windows = self.store.read();
        windows
            .iter()
            .map(|(&index, bucket)| {
                let sealed = bucket
                    .entries()
                    .into_iter()
                    .map(|(entity, accumulator)| (entity, accumulator.snapshot(&self.registry)))
                    .collect();
                (window_start_ms(index, self.config.window_ms), sealed)
            })
            .collect()
    }

    /// Read-only snapshot of per-window generation and entity coverage
    ///
    /// Stale coverage is recomputed before the snapshot is taken.
    pub fn aggregator_state(&self) -> AggregatorStateSnapshot<E> {
        let mut state = self.state.lock();
        let windows = self.store.read();
        state.refresh(
            &windows,
            self.active(),
            &self.config,
            self.generation.load(Ordering::SeqCst),
        );
        state.snapshot()
    }

    /// Operation statistics
    pub fn stats(&self) -> AggregatorStatsSnapshot {
        self.stats.snapshot()
    }

    /// The configuration the aggregator runs with
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Drop all samples and bookkeeping
    ///
    /// Blocks until in-flight collections drain; the generation still moves
    /// forward so stale cached results cannot be mistaken for current ones.
    pub fn clear(&self) {
        let _lock = self.structural.lock();
        while self.collections_in_progress.load(Ordering::SeqCst) > 0 {
            std::thread::sleep(Duration::from_millis(10));
        }
        self.store.clear();
        self.state.lock().clear();
        *self.cached.lock() = None;
        self.active_window.store(NO_ACTIVE_WINDOW, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!("Cleared aggregator");
    }

    /// The active window index, if any sample was accepted since the last
    /// clear
    fn active(&self) -> Option<WindowIndex> {
        match self.active_window.load(Ordering::SeqCst) {
            NO_ACTIVE_WINDOW => None,
            index => Some(index),
        }
    }

    /// Register an in-flight collection. Serialized with rollover so the
    /// gate and eviction cannot interleave.
    fn begin_collection(&self) -> CollectionGuard<'_> {
        let _lock = self.structural.lock();
        self.collections_in_progress.fetch_add(1, Ordering::SeqCst);
        CollectionGuard {
            counter: &self.collections_in_progress,
        }
    }

    /// Whether the query range spans every retained window
    fn covers_retained_range(&self, from_ms: i64, to_ms: i64) -> bool {
        match (self.store.first_index(), self.active()) {
            (Some(earliest), Some(active)) => {
                window_index(from_ms, self.config.window_ms) <= earliest
                    && window_index(to_ms, self.config.window_ms) >= active
            }
            _ => false,
        }
    }

    /// The entity scope of a query: the interested set, or every observed
    /// entity when the set is empty
    fn resolve_interested(
        &self,
        windows: &WindowMap<E>,
        options: &AggregationOptions<E>,
    ) -> HashSet<E> {
        if !options.interested_entities.is_empty() {
            return options.interested_entities.clone();
        }
        let mut universe = HashSet::new();
        for bucket in windows.values() {
            universe.extend(bucket.entities());
        }
        universe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::AggregationStrategy;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct TestEntity(u32);

    impl Entity for TestEntity {
        type Group = u32;

        fn group(&self) -> u32 {
            0
        }
    }

    fn test_registry() -> Arc<MetricRegistry> {
        let mut registry = MetricRegistry::new();
        registry.register("cpu", AggregationStrategy::Avg).unwrap();
        Arc::new(registry)
    }

    fn test_aggregator(min_samples: u64) -> SampleAggregator<TestEntity> {
        let config = AggregatorConfig {
            num_windows: 4,
            window_ms: 1000,
            min_samples_per_window: min_samples,
            ..AggregatorConfig::default()
        };
        SampleAggregator::new(config, test_registry()).unwrap()
    }

    fn cpu_sample(entity: u32, time_ms: i64, value: f64) -> Sample<TestEntity> {
        let mut values = HashMap::new();
        values.insert(0, value);
        Sample::new(TestEntity(entity), time_ms, values)
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AggregatorConfig {
            num_windows: 0,
            ..AggregatorConfig::default()
        };
        assert!(SampleAggregator::<TestEntity>::new(config, test_registry()).is_err());
    }

    #[test]
    fn test_incomplete_sample_rejected() {
        let aggregator = test_aggregator(1);
        assert!(!aggregator.add(Sample::new(TestEntity(1), 1000, HashMap::new())));
        assert_eq!(aggregator.num_samples(), 0);
        assert_eq!(aggregator.stats().samples_rejected, 1);
    }

    #[test]
    fn test_generation_bumps_on_rollover_and_back_insert() {
        let aggregator = test_aggregator(1);
        assert_eq!(aggregator.generation(), 0);
        assert!(aggregator.add(cpu_sample(1, 1000, 1.0)));
        assert_eq!(aggregator.generation(), 1);
        // Another sample for the active window does not bump
        assert!(aggregator.add(cpu_sample(1, 1500, 2.0)));
        assert_eq!(aggregator.generation(), 1);
        // Rollover bumps
        assert!(aggregator.add(cpu_sample(1, 2000, 3.0)));
        assert_eq!(aggregator.generation(), 2);
        // Back-insertion into the settled window bumps
        assert!(aggregator.add(cpu_sample(1, 1700, 4.0)));
        assert_eq!(aggregator.generation(), 3);
    }

    #[test]
    fn test_stale_sample_rejected_after_eviction() {
        let aggregator = test_aggregator(1);
        // Fill enough windows to evict window 1 (capacity is 5)
        for window in 1..=6 {
            assert!(aggregator.add(cpu_sample(1, window * 1000, 1.0)));
        }
        assert_eq!(aggregator.earliest_window(), Some(2000));
        assert!(!aggregator.add(cpu_sample(1, 1500, 9.0)));
    }

    #[test]
    fn test_clear_resets_everything() {
        let aggregator = test_aggregator(1);
        for window in 1..=3 {
            aggregator.add(cpu_sample(1, window * 1000, 1.0));
        }
        let generation_before = aggregator.generation();
        aggregator.clear();
        assert_eq!(aggregator.earliest_window(), None);
        assert!(aggregator.all_windows().is_empty());
        assert_eq!(aggregator.num_samples(), 0);
        assert!(aggregator.generation() > generation_before);
    }

    #[test]
    fn test_aggregate_argument_validation() {
        let aggregator = test_aggregator(1);
        let options = AggregationOptions::new(
            0.0,
            0.0,
            0,
            HashSet::new(),
            crate::aggregation::Granularity::Entity,
            true,
        );
        assert!(matches!(
            aggregator.aggregate(0, 1000, &options),
            Err(Error::InvalidArgument(_))
        ));
        let options = AggregationOptions::new(
            0.0,
            0.0,
            1,
            HashSet::new(),
            crate::aggregation::Granularity::Entity,
            true,
        );
        assert!(matches!(
            aggregator.aggregate(5000, 1000, &options),
            Err(Error::InvalidArgument(_))
        ));
    }
}

//! Aggregator bookkeeping: per-window coverage and cached completeness
//!
//! Coverage (which entities are present in which window) is derived data and
//! is recomputed lazily: every window bucket records the generation of its
//! last mutation, and a window's coverage is stale once any window it depends
//! on (itself, its neighbors, its previous-period donor) mutated after the
//! coverage was computed.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::aggregation::completeness::{AggregationOptions, Completeness};
use crate::aggregation::extrapolation::is_present;
use crate::aggregation::store::WindowMap;
use crate::config::AggregatorConfig;
use crate::types::{Entity, WindowIndex};

/// Derived per-window bookkeeping
#[derive(Debug, Clone)]
pub struct WindowState<E: Entity> {
    generation: u64,
    present_entities: HashSet<E>,
}

impl<E: Entity> WindowState<E> {
    /// Generation at which this window's coverage was computed
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Entities present in this window (extrapolation-aware)
    pub fn present_entities(&self) -> &HashSet<E> {
        &self.present_entities
    }
}

/// Read-only snapshot of the aggregator's derived state
#[derive(Debug, Clone)]
pub struct AggregatorStateSnapshot<E: Entity> {
    window_states: BTreeMap<WindowIndex, WindowState<E>>,
}

impl<E: Entity> AggregatorStateSnapshot<E> {
    /// Per-window state, ordered by window index
    pub fn window_states(&self) -> &BTreeMap<WindowIndex, WindowState<E>> {
        &self.window_states
    }
}

struct CachedCompleteness<E: Entity> {
    options: AggregationOptions<E>,
    generation: u64,
    completeness: Arc<Completeness<E>>,
}

/// Mutable bookkeeping owned by the aggregator, guarded by a single mutex
pub(crate) struct AggregatorState<E: Entity> {
    window_states: BTreeMap<WindowIndex, WindowState<E>>,
    completeness_cache: VecDeque<CachedCompleteness<E>>,
    completeness_cache_size: usize,
}

impl<E: Entity> AggregatorState<E> {
    pub(crate) fn new(completeness_cache_size: usize) -> Self {
        Self {
            window_states: BTreeMap::new(),
            completeness_cache: VecDeque::new(),
            completeness_cache_size,
        }
    }

    /// Recompute stale window coverage against the current store contents
    ///
    /// The active window never carries coverage; entries for evicted windows
    /// are dropped.
    pub(crate) fn refresh(
        &mut self,
        windows: &WindowMap<E>,
        active: Option<WindowIndex>,
        config: &AggregatorConfig,
        current_generation: u64,
    ) {
        self.window_states
            .retain(|index, _| windows.contains_key(index) && Some(*index) != active);

        let mut universe: HashSet<E> = HashSet::new();
        for bucket in windows.values() {
            universe.extend(bucket.entities());
        }

        let period = config.num_windows as i64;
        for &index in windows.keys() {
            if Some(index) == active {
                continue;
            }
            let deps_generation = [index - 1, index, index + 1, index - period]
                .iter()
                .filter_map(|dep| windows.get(dep))
                .map(|bucket| bucket.mutation_generation())
                .max()
                .unwrap_or(0);
            let stale = self
                .window_states
                .get(&index)
                .map(|state| state.generation < deps_generation)
                .unwrap_or(true);
            if stale {
                let present_entities = universe
                    .iter()
                    .filter(|entity| is_present(windows, config, entity, index))
                    .cloned()
                    .collect();
                self.window_states.insert(
                    index,
                    WindowState {
                        generation: current_generation,
                        present_entities,
                    },
                );
            }
        }
    }

    /// Present-entity sets for completeness analysis
    pub(crate) fn coverage(&self) -> BTreeMap<WindowIndex, HashSet<E>> {
        self.window_states
            .iter()
            .map(|(index, state)| (*index, state.present_entities.clone()))
            .collect()
    }

    /// Drop bookkeeping for an evicted window and invalidate the windows
    /// whose coverage depended on it
    pub(crate) fn remove_window(&mut self, index: WindowIndex, period: i64) {
        self.window_states.remove(&index);
        self.window_states.remove(&(index + 1));
        self.window_states.remove(&(index + period));
    }

    /// Cached completeness for the options, if still current
    pub(crate) fn cached_completeness(
        &self,
        options: &AggregationOptions<E>,
        generation: u64,
    ) -> Option<Arc<Completeness<E>>> {
        self.completeness_cache
            .iter()
            .find(|entry| entry.generation == generation && entry.options == *options)
            .map(|entry| entry.completeness.clone())
    }

    /// Remember a completeness result, bounded by the configured cache size
    pub(crate) fn cache_completeness(
        &mut self,
        options: AggregationOptions<E>,
        generation: u64,
        completeness: Arc<Completeness<E>>,
    ) {
        self.completeness_cache
            .retain(|entry| entry.options != options);
        self.completeness_cache.push_back(CachedCompleteness {
            options,
            generation,
            completeness,
        });
        while self.completeness_cache.len() > self.completeness_cache_size {
            self.completeness_cache.pop_front();
        }
    }

    /// Snapshot the per-window state
    pub(crate) fn snapshot(&self) -> AggregatorStateSnapshot<E> {
        AggregatorStateSnapshot {
            window_states: self.window_states.clone(),
        }
    }

    /// Drop all bookkeeping
    pub(crate) fn clear(&mut self) {
        self.window_states.clear();
        self.completeness_cache.clear();
    }
}

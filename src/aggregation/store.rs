//! Raw sample store: window index → (entity → accumulator)
//!
//! The outer map is ordered by window index behind a `RwLock`; each window
//! holds a concurrent entity map. Window creation and eviction are serialized
//! by the aggregator's structural lock, so readers holding the read guard
//! observe a consistent window set.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::aggregation::accumulator::WindowAccumulator;
use crate::types::{Entity, WindowIndex};

/// All accumulated data of a single window
#[derive(Debug)]
pub(crate) struct WindowBucket<E: Entity> {
    /// Per-entity accumulators
    entities: DashMap<E, Arc<WindowAccumulator>>,

    /// Generation of the last mutation that touched this window. Used by the
    /// aggregator state to detect stale per-window coverage.
    mutation_generation: AtomicU64,
}

impl<E: Entity> WindowBucket<E> {
    fn new(generation: u64) -> Self {
        Self {
            entities: DashMap::new(),
            mutation_generation: AtomicU64::new(generation),
        }
    }

    /// Accumulator for an entity, created on first use
    pub(crate) fn accumulator_for(&self, entity: &E, num_metrics: usize) -> Arc<WindowAccumulator> {
        self.entities
            .entry(entity.clone())
            .or_insert_with(|| Arc::new(WindowAccumulator::new(num_metrics)))
            .value()
            .clone()
    }

    /// Accumulator for an entity, if one exists
    pub(crate) fn get(&self, entity: &E) -> Option<Arc<WindowAccumulator>> {
        self.entities.get(entity).map(|acc| acc.value().clone())
    }

    /// Entities with at least one sample in this window
    pub(crate) fn entities(&self) -> Vec<E> {
        self.entities.iter().map(|e| e.key().clone()).collect()
    }

    /// Iterate (entity, accumulator) pairs
    pub(crate) fn entries(&self) -> Vec<(E, Arc<WindowAccumulator>)> {
        self.entities
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Record a mutation at the given generation
    pub(crate) fn touched(&self, generation: u64) {
        self.mutation_generation.store(generation, Ordering::SeqCst);
    }

    /// Generation of the last mutation
    pub(crate) fn mutation_generation(&self) -> u64 {
        self.mutation_generation.load(Ordering::SeqCst)
    }

    /// Total samples across all entities of this window
    pub(crate) fn num_samples(&self) -> u64 {
        self.entities.iter().map(|e| e.value().num_samples()).sum()
    }
}

/// Ordered mapping of retained windows
#[derive(Debug)]
pub(crate) struct RawStore<E: Entity> {
    windows: RwLock<BTreeMap<WindowIndex, Arc<WindowBucket<E>>>>,
}

pub(crate) type WindowMap<E> = BTreeMap<WindowIndex, Arc<WindowBucket<E>>>;

impl<E: Entity> RawStore<E> {
    pub(crate) fn new() -> Self {
        Self {
            windows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Read guard over the window map
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, WindowMap<E>> {
        self.windows.read()
    }

    /// Bucket for a window, if retained
    pub(crate) fn get(&self, index: WindowIndex) -> Option<Arc<WindowBucket<E>>> {
        self.windows.read().get(&index).cloned()
    }

    /// Bucket for a window, created if absent
    ///
    /// Must only be called while holding the aggregator's structural lock.
    /// Returns the bucket and whether it was newly created.
    pub(crate) fn get_or_create(
        &self,
        index: WindowIndex,
        generation: u64,
    ) -> (Arc<WindowBucket<E>>, bool) {
        if let Some(bucket) = self.windows.read().get(&index) {
            return (bucket.clone(), false);
        }
        let mut windows = self.windows.write();
        match windows.get(&index) {
            Some(bucket) => (bucket.clone(), false),
            None => {
                let bucket = Arc::new(WindowBucket::new(generation));
                windows.insert(index, bucket.clone());
                (bucket, true)
            }
        }
    }

    /// Oldest retained window index
    pub(crate) fn first_index(&self) -> Option<WindowIndex> {
        self.windows.read().keys().next().copied()
    }

    /// Number of retained windows
    pub(crate) fn len(&self) -> usize {
        self.windows.read().len()
    }

    /// All retained window indexes in ascending order
    pub(crate) fn indexes(&self) -> Vec<WindowIndex> {
        self.windows.read().keys().copied().collect()
    }

    /// Remove and return the oldest window
    ///
    /// Must only be called while holding the aggregator's structural lock.
    pub(crate) fn evict_oldest(&self) -> Option<WindowIndex> {
        let mut windows = self.windows.write();
        let oldest = windows.keys().next().copied()?;
        windows.remove(&oldest);
        Some(oldest)
    }

    /// Total samples across all retained windows
    pub(crate) fn num_samples(&self) -> u64 {
        self.windows
            .read()
            .values()
            .map(|bucket| bucket.num_samples())
            .sum()
    }

    /// Drop all windows
    pub(crate) fn clear(&self) {
        self.windows.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Entity;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct TestEntity(u32);

    impl Entity for TestEntity {
        type Group = u32;

        fn group(&self) -> u32 {
            self.0 % 2
        }
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let store: RawStore<TestEntity> = RawStore::new();
        let (bucket, created) = store.get_or_create(5, 1);
        assert!(created);
        let (again, created) = store.get_or_create(5, 2);
        assert!(!created);
        assert!(Arc::ptr_eq(&bucket, &again));
        assert_eq!(bucket.mutation_generation(), 1);
    }

    #[test]
    fn test_ordering_and_eviction() {
        let store: RawStore<TestEntity> = RawStore::new();
        for index in [3, 1, 2] {
            store.get_or_create(index, 0);
        }
        assert_eq!(store.indexes(), vec![1, 2, 3]);
        assert_eq!(store.first_index(), Some(1));
        assert_eq!(store.evict_oldest(), Some(1));
        assert_eq!(store.first_index(), Some(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_bucket_entities() {
        let store: RawStore<TestEntity> = RawStore::new();
        let (bucket, _) = store.get_or_create(1, 0);
        bucket.accumulator_for(&TestEntity(7), 2);
        bucket.accumulator_for(&TestEntity(8), 2);
        // Same entity resolves to the same accumulator
        let a = bucket.accumulator_for(&TestEntity(7), 2);
        let b = bucket.get(&TestEntity(7)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(bucket.entities().len(), 2);
        assert!(bucket.get(&TestEntity(9)).is_none());
    }
}

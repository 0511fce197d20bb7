//! Per-controller lookup cache.

use dashmap::DashMap;

use crate::observability::metrics;

/// Concurrent key → value cache owned by one controller instance.
///
/// Unbounded by default. With a capacity, inserting a new key into a full
/// cache evicts an arbitrary existing entry.
#[derive(Debug)]
pub struct ControllerCache<V> {
    controller: String,
    entries: DashMap<String, V>,
    capacity: Option<usize>,
}

impl<V: Clone> ControllerCache<V> {
    pub fn new(controller: &str, capacity: Option<usize>) -> Self {
        Self {
            controller: controller.to_string(),
            entries: DashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let hit = self.entries.get(key).map(|entry| entry.value().clone());
        metrics::record_cache_lookup(&self.controller, hit.is_some());
        if hit.is_some() {
            tracing::debug!(controller = %self.controller, key = %key, "Cache hit");
        }
        hit
    }

    pub fn insert(&self, key: String, value: V) {
        if let Some(capacity) = self.capacity {
            if self.entries.len() >= capacity && !self.entries.contains_key(&key) {
                let victim = self.entries.iter().next().map(|entry| entry.key().clone());
                if let Some(victim) = victim {
                    self.entries.remove(&victim);
                }
            }
        }
        self.entries.insert(key, value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

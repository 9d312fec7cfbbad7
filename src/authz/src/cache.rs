//! Shared policy cache for one authorization context

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

use crate::types::{Policy, ResourceId};

/// Resource-keyed policy cache
///
/// Provides:
/// - Thread-safe concurrent reads and writes (DashMap shard locks)
/// - First-writer-wins stores: a cached policy is never replaced
/// - Hit/miss statistics
///
/// Entries live as long as the cache; there is no TTL or eviction.
#[derive(Debug, Default)]
pub struct PolicyCache {
    entries: DashMap<ResourceId, Arc<Policy>>,

    /// Cache statistics
    stats: DashMap<&'static str, usize>,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached policy for a resource
    pub fn lookup(&self, resource: &str) -> Option<Arc<Policy>> {
        // Clone out so the shard guard is released before returning
        let found = self.entries.get(resource).map(|entry| Arc::clone(entry.value()));

        match found {
            Some(policy) => {
                self.increment_stat("hits");
                Some(policy)
            }
            None => {
                self.increment_stat("misses");
                None
            }
        }
    }

    /// Store a policy, keeping any entry already present for the resource.
    ///
    /// Returns the policy that is cached after the call.
    pub fn store(&self, resource: impl Into<ResourceId>, policy: Arc<Policy>) -> Arc<Policy> {
        match self.entries.entry(resource.into()) {
            Entry::Occupied(existing) => {
                trace!(resource = %existing.key(), "policy already cached, keeping first entry");
                let winner = Arc::clone(existing.get());
                drop(existing);
                self.increment_stat("redundant_stores");
                winner
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&policy));
                self.increment_stat("stores");
                policy
            }
        }
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.entries.contains_key(resource)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            stores: self.get_stat("stores"),
            redundant_stores: self.get_stat("redundant_stores"),
            entries: self.entries.len(),
        }
    }

    fn increment_stat(&self, key: &'static str) {
        *self.stats.entry(key).or_insert(0) += 1;
    }

    fn get_stat(&self, key: &str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub stores: usize,
    /// Stores that lost to an entry already present
    pub redundant_stores: usize,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

//! In-memory LRU cache partitioned by semantic type.

use std::any::Any;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tracing::debug;

use voltmart_core::constants::DEFAULT_CACHE_CAPACITY;
use voltmart_core::traits::Cacheable;
use voltmart_core::types::CacheKey;
use voltmart_core::SyncConfig;

type Slot = Arc<dyn Any + Send + Sync>;

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum entries per partition before LRU eviction
    pub capacity_per_type: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_per_type: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl From<&SyncConfig> for CacheConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            capacity_per_type: config.cache_capacity_per_type,
        }
    }
}

/// Session-wide memo store for domain snapshots.
///
/// Thread-safe; share one instance behind an `Arc`. Writes overwrite and never
/// merge. There is no expiry: callers decide when a hit is too stale and
/// re-fetch.
pub struct TypedCache {
    partitions: DashMap<&'static str, LruCache<String, Slot>>,
    capacity: NonZeroUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl TypedCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            partitions: DashMap::new(),
            capacity: NonZeroUsize::new(config.capacity_per_type).unwrap_or(NonZeroUsize::MIN),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Gets a cached value by entity id.
    ///
    /// Returns `None` when absent, evicted, or stored under a different Rust
    /// type than `T`. Never blocks on I/O.
    pub fn get<T: Cacheable>(&self, id: &str) -> Option<T> {
        let found = self
            .partitions
            .get_mut(T::KIND)
            .and_then(|mut partition| partition.get(id).cloned())
            .and_then(|slot| slot.downcast_ref::<T>().cloned());

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Gets a cached value by composite key.
    ///
    /// A key whose kind is not `T::KIND` is a miss.
    pub fn get_key<T: Cacheable>(&self, key: &CacheKey) -> Option<T> {
        if key.kind() != T::KIND {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.get(key.id())
    }

    /// Gets a cached value by the `Kind:id` string form.
    pub fn get_by_key<T: Cacheable>(&self, raw: &str) -> Option<T> {
        match CacheKey::parse(raw) {
            Ok(key) => self.get_key(&key),
            Err(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Returns true if an entry exists, without touching recency or stats.
    pub fn contains<T: Cacheable>(&self, id: &str) -> bool {
        self.partitions
            .get(T::KIND)
            .map(|partition| partition.contains(id))
            .unwrap_or(false)
    }

    /// Stores a value under an explicit id, replacing any previous entry.
    pub fn set<T: Cacheable>(&self, id: impl Into<String>, value: T) {
        let id = id.into();
        let mut partition = self
            .partitions
            .entry(T::KIND)
            .or_insert_with(|| LruCache::new(self.capacity));

        if let Some((evicted, _)) = partition.push(id.clone(), Arc::new(value)) {
            if evicted != id {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(kind = T::KIND, id = %evicted, "Evicted least recently used entry");
            }
        }
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Stores a value under its own [`Cacheable::cache_id`].
    pub fn insert<T: Cacheable>(&self, value: T) {
        let id = value.cache_id();
        self.set(id, value);
    }

    /// Removes one entry, returning it if it was present.
    pub fn remove<T: Cacheable>(&self, id: &str) -> Option<T> {
        self.partitions
            .get_mut(T::KIND)
            .and_then(|mut partition| partition.pop(id))
            .and_then(|slot| slot.downcast_ref::<T>().cloned())
    }

    /// Drops every entry of type `T`.
    pub fn clear<T: Cacheable>(&self) {
        self.clear_kind(T::KIND);
    }

    /// Drops every entry in the named partition.
    pub fn clear_kind(&self, kind: &str) {
        if let Some(mut partition) = self.partitions.get_mut(kind) {
            debug!(kind, entries = partition.len(), "Clearing cache partition");
            partition.clear();
        }
    }

    /// Drops every entry across all partitions.
    pub fn clear_all(&self) {
        debug!(partitions = self.partitions.len(), "Clearing entire cache");
        self.partitions.clear();
    }

    /// Returns the number of cached entries across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    /// Returns the number of cached entries of type `T`.
    pub fn len_of<T: Cacheable>(&self) -> usize {
        self.partitions.get(T::KIND).map(|p| p.len()).unwrap_or(0)
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut partitions: Vec<(String, usize)> = self
            .partitions
            .iter()
            .map(|p| (p.key().to_string(), p.len()))
            .collect();
        partitions.sort();

        CacheStats {
            total_entries: partitions.iter().map(|(_, n)| n).sum(),
            partitions,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            capacity_per_type: self.capacity.get(),
        }
    }
}

impl Default for TypedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCache")
            .field("entries", &self.len())
            .field("capacity_per_type", &self.capacity)
            .finish()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries across all partitions
    pub total_entries: usize,
    /// Entries per partition, sorted by kind
    pub partitions: Vec<(String, usize)>,
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that returned nothing
    pub misses: u64,
    /// Writes, including overwrites
    pub inserts: u64,
    /// Entries dropped to make room
    pub evictions: u64,
    /// Maximum entries per partition
    pub capacity_per_type: usize,
}

impl CacheStats {
    /// Fraction of lookups that hit, or `None` before the first lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        let total = self.hits + self.misses;
        (total > 0).then(|| self.hits as f64 / total as f64)
    }
}

//! In-memory TTL cache.
//!
//! An entry is *fresh* while its age is below its TTL. A stale entry is still
//! returned by [`TtlCache::get`]; the caller decides whether to refresh it.
//! Entries older than the keep-alive ceiling are treated as absent and are
//! removed by [`TtlCache::sweep`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use repowatch_core::constants::{
    DEFAULT_KEEP_ALIVE_SECONDS, DEFAULT_MAX_ENTRIES, DEFAULT_SWEEP_INTERVAL_SECONDS,
    DEFAULT_TTL_SECONDS,
};

/// Cache entry with TTL.
#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self) -> bool {
        self.inserted_at.elapsed() < self.ttl
    }

    fn outlived(&self, keep_alive: Duration) -> bool {
        self.inserted_at.elapsed() > keep_alive
    }
}

/// Cache configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,
    /// Default TTL, after which an entry is stale
    pub ttl: Duration,
    /// Age after which an entry is evicted outright
    pub keep_alive: Duration,
    /// Period of the background sweep
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECONDS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECONDS),
        }
    }
}

impl CacheConfig {
    /// Sets the TTL and moves the keep-alive ceiling to twice the TTL,
    /// saturating at `Duration::MAX`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self.keep_alive = ttl.saturating_mul(2);
        self
    }

    /// Sets the keep-alive ceiling.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the capacity.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Sets the sweep period.
    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }
}

/// A cached value together with its freshness at read time.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedEntry<V> {
    /// The stored value
    pub value: V,
    /// Time since the value was written
    pub age: Duration,
    /// Whether the value is still within its TTL
    pub fresh: bool,
}

/// In-memory TTL cache.
///
/// Thread-safe; reads take a shared lock and return a snapshot of the latest
/// fully written entry.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    config: CacheConfig,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Gets a cached value, fresh or stale.
    ///
    /// Returns `None` if absent or past the keep-alive ceiling.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Gets a cached value with its age and freshness.
    pub fn get_entry(&self, key: &K) -> Option<CachedEntry<V>> {
        let entries = self.entries.read();
        entries.get(key).and_then(|e| {
            if e.outlived(self.config.keep_alive) {
                None
            } else {
                Some(CachedEntry {
                    value: e.value.clone(),
                    age: e.inserted_at.elapsed(),
                    fresh: e.is_fresh(),
                })
            }
        })
    }

    /// Returns true if `key` holds a value within its TTL.
    pub fn is_fresh(&self, key: &K) -> bool {
        self.get_entry(key).map(|e| e.fresh).unwrap_or(false)
    }

    /// Caches a value with the default TTL.
    pub fn set(&self, key: K, value: V) {
        self.set_with_ttl(key, value, self.config.ttl);
    }

    /// Caches a value with a custom TTL.
    ///
    /// Overwrites unconditionally and resets the entry's insertion time.
    pub fn set_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            let keep_alive = self.config.keep_alive;
            entries.retain(|_, e| !e.outlived(keep_alive));

            // Still at capacity? Remove oldest entry
            if entries.len() >= self.config.max_entries {
                if let Some(oldest_key) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest_key);
                }
            }
        }

        entries.insert(key, CacheEntry {
            value,
            inserted_at: Instant::now(),
            ttl,
        });
    }

    /// Removes one entry. Returns true if it was present.
    pub fn clear(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Removes every entry.
    pub fn clear_all(&self) {
        self.entries.write().clear();
    }

    /// Removes entries past the keep-alive ceiling. Returns how many.
    pub fn sweep(&self) -> usize {
        let keep_alive = self.config.keep_alive;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.outlived(keep_alive));
        before - entries.len()
    }

    /// Returns the number of stored entries, including stale ones.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let fresh = entries.values().filter(|e| e.is_fresh()).count();

        CacheStats {
            total_entries: entries.len(),
            fresh_entries: fresh,
            stale_entries: entries.len() - fresh,
            capacity: self.config.max_entries,
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts the background eviction sweep.
    ///
    /// The task holds a weak reference and exits once the cache is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let cache = Arc::downgrade(self);
        let period = self.config.sweep_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    break;
                };
                let evicted = cache.sweep();
                if evicted > 0 {
                    debug!(evicted, "Swept cache entries past keep-alive");
                }
            }
        })
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    /// Total entries (including stale)
    pub total_entries: usize,
    /// Entries within their TTL
    pub fresh_entries: usize,
    /// Entries past their TTL but not yet evicted
    pub stale_entries: usize,
    /// Maximum capacity
    pub capacity: usize,
}

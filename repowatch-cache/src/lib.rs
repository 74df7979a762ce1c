//! TTL cache for repowatch outcomes.
//!
//! Generic in-memory cache with per-entry freshness, a keep-alive eviction
//! ceiling, and capacity bounds. Staleness is reported, never enforced.

mod cache;

pub use cache::{CacheConfig, CacheStats, CachedEntry, TtlCache};

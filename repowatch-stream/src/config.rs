//! Stream and repository configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use repowatch_cache::CacheConfig;
use repowatch_core::constants::DEFAULT_CHANNEL_CAPACITY;

/// Outcome channel configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Outcomes buffered per subscriber before it starts lagging
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Configuration of a [`Repository`](crate::Repository).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Settings shared by the user and repository caches
    pub cache: CacheConfig,
    /// Settings shared by the user and repository channels
    pub stream: StreamConfig,
}

impl RepositoryConfig {
    /// Sets the cache TTL (the keep-alive ceiling follows at 2x).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = self.cache.with_ttl(ttl);
        self
    }

    /// Sets the outcome channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.stream.channel_capacity = capacity;
        self
    }
}

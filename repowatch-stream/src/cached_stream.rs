//! One cache entry bound to one outcome channel.
//!
//! Writes go to the cache and the channel under a single lock, so a
//! subscriber never observes a value the cache does not hold.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, instrument};

use repowatch_cache::TtlCache;
use repowatch_core::{CacheKey, ForgeError, Outcome};

use crate::channel::{OutcomeChannel, Subscription};
use crate::config::StreamConfig;

/// Cache shared by the streams of one value type.
pub type OutcomeCache<T> = TtlCache<CacheKey, Outcome<T>>;

/// What [`CachedStream::publish_or_refresh`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshDecision {
    /// A fresh cached value was republished; no refresh.
    Cached,
    /// A failed or stale cached value was republished and a refresh started.
    CachedAndRefreshing,
    /// Nothing was cached; a refresh started.
    Refreshing,
}

impl RefreshDecision {
    /// True if the refresh closure was invoked.
    pub fn refreshed(self) -> bool {
        !matches!(self, RefreshDecision::Cached)
    }
}

/// Publish-or-refresh policy for a single logical key.
pub struct CachedStream<T> {
    key: CacheKey,
    cache: Arc<OutcomeCache<T>>,
    channel: OutcomeChannel<T>,
    write_lock: Mutex<()>,
}

impl<T: Clone + Send + Sync + 'static> CachedStream<T> {
    /// Creates a stream over `key` in `cache`.
    pub fn new(key: CacheKey, cache: Arc<OutcomeCache<T>>, config: &StreamConfig) -> Self {
        Self {
            key,
            cache,
            channel: OutcomeChannel::new(config.channel_capacity),
            write_lock: Mutex::new(()),
        }
    }

    /// The key this stream owns.
    pub fn key(&self) -> CacheKey {
        self.key
    }

    /// The backing cache.
    pub fn cache(&self) -> &Arc<OutcomeCache<T>> {
        &self.cache
    }

    /// Subscribes to published outcomes.
    pub fn subscribe(&self) -> Subscription<T> {
        self.channel.subscribe()
    }

    /// The cached outcome, fresh or stale.
    pub fn current(&self) -> Option<Outcome<T>> {
        self.cache.get(&self.key)
    }

    /// Serves the cached outcome, or calls `refresh` when there is none.
    ///
    /// - absent: `refresh` is called, nothing is published
    /// - failure: the failure is republished and `refresh` is called
    /// - stale value: the value is republished and `refresh` is called
    /// - fresh success, progress or empty: republished only
    ///
    /// `refresh` runs after the stream lock is released, so it may write to
    /// this stream.
    #[instrument(skip(self, refresh), fields(key = %self.key))]
    pub fn publish_or_refresh<F: FnOnce()>(&self, refresh: F) -> RefreshDecision {
        let decision = {
            let _guard = self.write_lock.lock();
            match self.cache.get_entry(&self.key) {
                None => RefreshDecision::Refreshing,
                Some(entry) => {
                    let refresh_needed = entry.value.is_failure() || !entry.fresh;
                    self.channel.publish(entry.value);
                    if refresh_needed {
                        RefreshDecision::CachedAndRefreshing
                    } else {
                        RefreshDecision::Cached
                    }
                }
            }
        };

        match decision {
            RefreshDecision::Cached => debug!("Cache hit"),
            RefreshDecision::CachedAndRefreshing => debug!("Serving cached outcome, refreshing"),
            RefreshDecision::Refreshing => debug!("Cache miss, refreshing"),
        }

        if decision.refreshed() {
            refresh();
        }
        decision
    }

    /// Writes `outcome` to the cache and publishes it.
    pub fn new_value(&self, outcome: Outcome<T>) {
        let _guard = self.write_lock.lock();
        self.cache.set(self.key, outcome.clone());
        self.channel.publish(outcome);
    }

    /// Publishes `Progress { loading }`.
    pub fn loading(&self, loading: bool) {
        self.new_value(Outcome::loading(loading));
    }

    /// Publishes `Success`, replacing any cached progress.
    pub fn success(&self, value: T) {
        self.new_value(Outcome::success(value));
    }

    /// Publishes `Failure`, replacing any cached progress or success.
    pub fn failure(&self, error: ForgeError) {
        self.new_value(Outcome::failure(error));
    }

    /// Publishes `Empty`.
    pub fn empty(&self) {
        self.new_value(Outcome::empty());
    }

    /// Closes an open loading state whose fetch will never complete.
    ///
    /// Publishes `Progress(false)` and evicts the cached outcome, so the next
    /// [`publish_or_refresh`](Self::publish_or_refresh) refreshes.
    pub fn abandon(&self) {
        let _guard = self.write_lock.lock();
        self.cache.clear(&self.key);
        self.channel.publish(Outcome::loading(false));
        debug!(key = %self.key, "Abandoned loading state");
    }

    /// Evicts the cached outcome without publishing.
    ///
    /// The next [`publish_or_refresh`](Self::publish_or_refresh) refreshes.
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        if self.cache.clear(&self.key) {
            debug!(key = %self.key, "Cleared cached outcome");
        }
    }
}

//! User and repository streams wired together.
//!
//! Resolving a user is a dependency step: when it succeeds, the repository
//! cache is cleared and the repositories of the canonical login are fetched.
//! A failed lookup leaves previously fetched repositories untouched.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use repowatch_cache::TtlCache;
use repowatch_core::{CacheKey, ForgeApi, Repo, User};

use crate::cached_stream::{CachedStream, RefreshDecision};
use crate::channel::Subscription;
use crate::config::RepositoryConfig;
use crate::coordinator::FetchCoordinator;

/// Composition root for the user and repository outcome streams.
pub struct Repository {
    api: Arc<dyn ForgeApi>,
    user: FetchCoordinator<User>,
    repos: FetchCoordinator<Vec<Repo>>,
}

impl Repository {
    /// Creates a repository with default configuration.
    pub fn new(api: Arc<dyn ForgeApi>) -> Self {
        Self::with_config(api, RepositoryConfig::default())
    }

    /// Creates a repository with custom configuration.
    pub fn with_config(api: Arc<dyn ForgeApi>, config: RepositoryConfig) -> Self {
        let user_stream = CachedStream::new(
            CacheKey::User,
            Arc::new(TtlCache::with_config(config.cache.clone())),
            &config.stream,
        );
        let repos_stream = CachedStream::new(
            CacheKey::Repos,
            Arc::new(TtlCache::with_config(config.cache)),
            &config.stream,
        );

        Self {
            api,
            user: FetchCoordinator::new(Arc::new(user_stream)),
            repos: FetchCoordinator::new(Arc::new(repos_stream)),
        }
    }

    /// Starts background eviction for both caches.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn_sweepers(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.user.stream().cache().spawn_sweeper(),
            self.repos.stream().cache().spawn_sweeper(),
        ]
    }

    /// The user stream.
    pub fn user_stream(&self) -> &Arc<CachedStream<User>> {
        self.user.stream()
    }

    /// The repository stream.
    pub fn repos_stream(&self) -> &Arc<CachedStream<Vec<Repo>>> {
        self.repos.stream()
    }

    /// The user fetch coordinator.
    pub fn user_coordinator(&self) -> &FetchCoordinator<User> {
        &self.user
    }

    /// The repository fetch coordinator.
    pub fn repos_coordinator(&self) -> &FetchCoordinator<Vec<Repo>> {
        &self.repos
    }

    /// Subscribes to user outcomes.
    pub fn subscribe_user(&self) -> Subscription<User> {
        self.user.stream().subscribe()
    }

    /// Subscribes to repository outcomes.
    pub fn subscribe_repos(&self) -> Subscription<Vec<Repo>> {
        self.repos.stream().subscribe()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONTROL SURFACE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serves the cached user, fetching `name` if absent, stale, or failed.
    #[instrument(skip(self))]
    pub fn ping_user(&self, name: &str) -> RefreshDecision {
        self.user.stream().publish_or_refresh(|| {
            self.fetch_user(name);
        })
    }

    /// Serves the cached repositories, fetching those of `name` if absent,
    /// stale, or failed.
    #[instrument(skip(self))]
    pub fn ping_repo(&self, name: &str) -> RefreshDecision {
        self.repos.stream().publish_or_refresh(|| {
            self.fetch_repos(name);
        })
    }

    /// Resolves `name`, then refreshes the repositories of the resolved login.
    ///
    /// On failure the repository stream is left alone unless it is still
    /// showing progress with no fetch of its own running, in which case the
    /// failure is propagated to it. Returns the user fetch generation.
    #[instrument(skip(self))]
    pub fn fetch_user(&self, name: &str) -> u64 {
        let api = Arc::clone(&self.api);
        let repos = self.repos.clone();
        let name = name.to_string();

        let fetch = {
            let api = Arc::clone(&api);
            async move { api.fetch_user(&name).await }
        };

        self.user.trigger(fetch, move |result| match result {
            Ok(user) => {
                info!(login = %user.login, "User resolved, refreshing repositories");
                repos.stream().clear();
                Self::trigger_repos(&repos, &api, user.login.clone());
            }
            Err(error) => {
                let waiting = repos
                    .stream()
                    .current()
                    .map(|outcome| outcome.is_loading())
                    .unwrap_or(false);
                if waiting && !repos.is_fetching() {
                    debug!(%error, "Propagating user failure to waiting repositories");
                    repos.stream().failure(error.clone());
                }
            }
        })
    }

    /// Fetches the repositories of `login`, superseding any fetch in flight.
    ///
    /// Returns the repository fetch generation.
    #[instrument(skip(self))]
    pub fn fetch_repos(&self, login: &str) -> u64 {
        Self::trigger_repos(&self.repos, &self.api, login.to_string())
    }

    fn trigger_repos(
        repos: &FetchCoordinator<Vec<Repo>>,
        api: &Arc<dyn ForgeApi>,
        login: String,
    ) -> u64 {
        let api = Arc::clone(api);
        repos.trigger(async move { api.fetch_repos(&login).await }, |_| {})
    }
}

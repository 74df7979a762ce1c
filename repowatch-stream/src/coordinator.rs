//! Fetch coordination for one cached stream.
//!
//! At most one fetch per key is in flight. Triggering a new fetch supersedes
//! the previous one: its task is aborted and its generation invalidated, so a
//! result that still arrives is dropped without touching the stream.
//!
//! All terminal writes happen while holding the coordinator lock and after a
//! generation check, which keeps the per-key publication order
//! `Progress(true)` then `Success`/`Failure` even across superseded fetches.
//! A fetch that ends without a value (cancelled) closes its progress with
//! `Progress(false)` and evicts the cached entry, so the next ping refetches.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, info, Instrument};

use repowatch_core::error::Result;

use crate::cached_stream::CachedStream;

/// Lifecycle of the coordinator for one key.
///
/// `Succeeded` and `Failed` are idle states that remember how the last fetch
/// ended; nothing is in flight in either, and the next trigger moves to
/// `Fetching` exactly as from `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    /// Nothing fetched yet, or the last fetch was cancelled.
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// Idle; the last fetch published `Success`.
    Succeeded,
    /// Idle; the last fetch published `Failure`.
    Failed,
}

impl FetchState {
    /// True when no fetch is in flight.
    pub fn is_idle(self) -> bool {
        !matches!(self, FetchState::Fetching)
    }
}

/// One in-flight fetch task.
#[derive(Debug)]
pub struct FetchHandle {
    generation: u64,
    task: JoinHandle<()>,
}

impl FetchHandle {
    /// Trigger order of this fetch; later fetches have larger generations.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Check if the task is finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the task. Its completion callbacks never run.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

struct CoordinatorState {
    in_flight: Option<FetchHandle>,
    phase: FetchState,
}

struct CoordinatorInner<T> {
    stream: Arc<CachedStream<T>>,
    state: Mutex<CoordinatorState>,
    generation: AtomicU64,
}

/// Drives fetches for one [`CachedStream`].
///
/// Cheap to clone; clones share the same in-flight slot.
pub struct FetchCoordinator<T> {
    inner: Arc<CoordinatorInner<T>>,
}

impl<T> Clone for FetchCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> FetchCoordinator<T> {
    /// Creates a coordinator publishing into `stream`.
    pub fn new(stream: Arc<CachedStream<T>>) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                stream,
                state: Mutex::new(CoordinatorState {
                    in_flight: None,
                    phase: FetchState::Idle,
                }),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// The stream this coordinator publishes into.
    pub fn stream(&self) -> &Arc<CachedStream<T>> {
        &self.inner.stream
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FetchState {
        self.inner.state.lock().phase
    }

    /// True while a fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    /// Generation of the in-flight fetch, if any.
    pub fn in_flight_generation(&self) -> Option<u64> {
        self.inner
            .state
            .lock()
            .in_flight
            .as_ref()
            .map(FetchHandle::generation)
    }

    /// Starts `fetch`, superseding any fetch already in flight.
    ///
    /// Publishes `Progress(true)` immediately, then `Success` or `Failure`
    /// when `fetch` resolves. `on_complete` runs after that publication and
    /// only if this fetch was not superseded. It runs under the coordinator
    /// lock, so no newer trigger can interleave; it must not call back into
    /// this coordinator. An `Err(ForgeError::Cancelled)` result closes the
    /// progress like [`cancel`](Self::cancel) and skips `on_complete`.
    ///
    /// Must be called from within a Tokio runtime. Returns the generation of
    /// the new fetch.
    pub fn trigger<Fut, C>(&self, fetch: Fut, on_complete: C) -> u64
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
        C: FnOnce(&Result<T>) + Send + 'static,
    {
        let key = self.inner.stream.key();
        let mut state = self.inner.state.lock();

        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
            debug!(%key, superseded = previous.generation, "Superseding in-flight fetch");
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        state.phase = FetchState::Fetching;
        self.inner.stream.loading(true);

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move {
                let result = fetch.await;
                inner.complete(generation, &result, on_complete);
            }
            .instrument(debug_span!("fetch", %key, generation)),
        );

        // The task cannot complete before this slot is filled: `complete`
        // needs the lock held here.
        state.in_flight = Some(FetchHandle { generation, task });
        info!(%key, generation, "Fetch triggered");
        generation
    }

    /// Cancels the in-flight fetch, if any.
    ///
    /// The stream's `Progress(true)` is closed with `Progress(false)` and the
    /// cached entry is evicted, so the next ping refetches.
    /// Returns true if a fetch was cancelled.
    pub fn cancel(&self) -> bool {
        let mut state = self.inner.state.lock();
        match state.in_flight.take() {
            Some(handle) => {
                handle.cancel();
                state.phase = FetchState::Idle;
                self.inner.stream.abandon();
                debug!(key = %self.inner.stream.key(), generation = handle.generation, "Fetch cancelled");
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> CoordinatorInner<T> {
    /// Publishes the result of fetch `generation` if it is still current,
    /// then runs `on_complete` before releasing the lock.
    ///
    /// Returns true if the result was published.
    fn complete<C>(&self, generation: u64, result: &Result<T>, on_complete: C) -> bool
    where
        C: FnOnce(&Result<T>),
    {
        let mut state = self.state.lock();

        let current = state.in_flight.as_ref().map(FetchHandle::generation);
        if current != Some(generation) {
            debug!(generation, ?current, "Dropping result of superseded fetch");
            return false;
        }
        state.in_flight = None;

        match result {
            Ok(value) => {
                self.stream.success(value.clone());
                state.phase = FetchState::Succeeded;
                debug!("Fetch succeeded");
            }
            Err(error) if error.is_cancelled() => {
                self.stream.abandon();
                state.phase = FetchState::Idle;
                debug!("Fetch reported cancellation, progress closed");
                return false;
            }
            Err(error) => {
                self.stream.failure(error.clone());
                state.phase = FetchState::Failed;
                debug!(%error, "Fetch failed");
            }
        }

        on_complete(result);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use repowatch_cache::TtlCache;
    use repowatch_core::{CacheKey, ForgeError, Outcome};
    use tokio::sync::oneshot;

    use crate::channel::Subscription;
    use crate::config::StreamConfig;

    fn coordinator() -> FetchCoordinator<u32> {
        let stream = CachedStream::new(
            CacheKey::Repos,
            Arc::new(TtlCache::new()),
            &StreamConfig::default(),
        );
        FetchCoordinator::new(Arc::new(stream))
    }

    async fn next(sub: &mut Subscription<u32>) -> Outcome<u32> {
        tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("outcome published in time")
            .expect("channel open")
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn test_success_publishes_progress_then_value() {
        let coordinator = coordinator();
        let mut sub = coordinator.stream().subscribe();

        coordinator.trigger(async { Ok(7) }, |_| {});

        assert_eq!(next(&mut sub).await, Outcome::loading(true));
        assert_eq!(next(&mut sub).await, Outcome::success(7));
        assert_eq!(coordinator.stream().current(), Some(Outcome::success(7)));
        assert_eq!(coordinator.state(), FetchState::Succeeded);
        assert!(!coordinator.is_fetching());
    }

    #[tokio::test]
    async fn test_failure_publishes_failure() {
        let coordinator = coordinator();
        let mut sub = coordinator.stream().subscribe();
        let error = ForgeError::Network("reset".into());

        let failing = error.clone();
        coordinator.trigger(async move { Err(failing) }, |_| {});

        assert_eq!(next(&mut sub).await, Outcome::loading(true));
        assert_eq!(next(&mut sub).await, Outcome::failure(error));
        assert_eq!(coordinator.state(), FetchState::Failed);
    }

    #[tokio::test]
    async fn test_superseded_fetch_never_publishes() {
        let coordinator = coordinator();
        let mut sub = coordinator.stream().subscribe();
        let (release_a, gate_a) = oneshot::channel::<()>();
        let (release_b, gate_b) = oneshot::channel::<()>();
        let completions = Arc::new(AtomicUsize::new(0));

        let seen = completions.clone();
        let first = coordinator.trigger(
            async move {
                let _ = gate_a.await;
                Ok(1)
            },
            move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
        );
        let seen = completions.clone();
        let second = coordinator.trigger(
            async move {
                let _ = gate_b.await;
                Ok(2)
            },
            move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert!(second > first);
        assert_eq!(coordinator.in_flight_generation(), Some(second));

        let _ = release_b.send(());
        let _ = release_a.send(());

        assert_eq!(next(&mut sub).await, Outcome::loading(true));
        assert_eq!(next(&mut sub).await, Outcome::loading(true));
        assert_eq!(next(&mut sub).await, Outcome::success(2));
        settle().await;
        assert_eq!(sub.try_recv(), None);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_generation_is_dropped() {
        let coordinator = coordinator();
        let (_release, gate) = oneshot::channel::<()>();
        let current = coordinator.trigger(
            async move {
                let _ = gate.await;
                Ok(1)
            },
            |_| {},
        );

        // A result from an older generation arriving late.
        assert!(!coordinator.inner.complete(current - 1, &Ok(99), |_| {}));
        assert_eq!(coordinator.stream().current(), Some(Outcome::loading(true)));
        assert!(coordinator.is_fetching());
    }

    #[tokio::test]
    async fn test_cancelled_result_is_not_published() {
        let coordinator = coordinator();
        let mut sub = coordinator.stream().subscribe();
        let called = Arc::new(AtomicUsize::new(0));

        let seen = called.clone();
        coordinator.trigger(async { Err(ForgeError::Cancelled) }, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(next(&mut sub).await, Outcome::loading(true));
        assert_eq!(next(&mut sub).await, Outcome::loading(false));
        settle().await;
        assert_eq!(sub.try_recv(), None);
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.state(), FetchState::Idle);
        // Progress does not outlive the fetch.
        assert_eq!(coordinator.stream().current(), None);
    }

    #[tokio::test]
    async fn test_explicit_cancel() {
        let coordinator = coordinator();
        let mut sub = coordinator.stream().subscribe();
        let (release, gate) = oneshot::channel::<()>();

        coordinator.trigger(
            async move {
                let _ = gate.await;
                Ok(1)
            },
            |_| {},
        );
        assert!(coordinator.cancel());
        assert!(!coordinator.cancel());
        let _ = release.send(());

        assert_eq!(next(&mut sub).await, Outcome::loading(true));
        assert_eq!(next(&mut sub).await, Outcome::loading(false));
        settle().await;
        assert_eq!(sub.try_recv(), None);
        assert_eq!(coordinator.state(), FetchState::Idle);
        assert_eq!(coordinator.stream().current(), None);
    }

    #[tokio::test]
    async fn test_terminal_states_are_idle() {
        let coordinator = coordinator();
        assert!(coordinator.state().is_idle());

        let (release, gate) = oneshot::channel::<()>();
        coordinator.trigger(
            async move {
                let _ = gate.await;
                Ok(1)
            },
            |_| {},
        );
        assert!(!coordinator.state().is_idle());

        let _ = release.send(());
        settle().await;
        assert_eq!(coordinator.state(), FetchState::Succeeded);
        assert!(coordinator.state().is_idle());
        assert!(FetchState::Failed.is_idle());
    }

    #[tokio::test]
    async fn test_on_complete_runs_under_coordinator_lock() {
        let coordinator = coordinator();
        let observer = coordinator.clone();
        let (tx, rx) = oneshot::channel();

        coordinator.trigger(async { Ok(5) }, move |_| {
            // A newer trigger would need this lock.
            let _ = tx.send(observer.inner.state.try_lock().is_none());
        });

        let locked = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert!(locked);
    }

    #[tokio::test]
    async fn test_on_complete_sees_result() {
        let coordinator = coordinator();
        let (tx, rx) = oneshot::channel();

        coordinator.trigger(async { Ok(3) }, move |result| {
            let _ = tx.send(result.clone());
        });

        let result = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Ok(3));
    }
}

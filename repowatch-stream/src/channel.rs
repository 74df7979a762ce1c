//! Multi-subscriber outcome channel with replay of the latest value.
//!
//! Every published outcome reaches every live subscriber in publication
//! order. A new subscriber first receives the value current at subscribe
//! time (if any) and then everything published afterwards, with no gap and
//! no duplicate.

use futures::stream::{self, Stream};
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

use repowatch_core::Outcome;

/// Broadcast channel of `Outcome<T>` retaining the last published value.
pub struct OutcomeChannel<T> {
    current: Mutex<Option<Outcome<T>>>,
    sender: broadcast::Sender<Outcome<T>>,
}

impl<T: Clone + Send + 'static> OutcomeChannel<T> {
    /// Creates a channel buffering up to `capacity` outcomes per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            current: Mutex::new(None),
            sender,
        }
    }

    /// Publishes an outcome to every subscriber.
    ///
    /// Publication is never deduplicated. Returns the number of live
    /// subscribers that will receive it.
    pub fn publish(&self, outcome: Outcome<T>) -> usize {
        let mut current = self.current.lock();
        *current = Some(outcome.clone());
        // No receivers is not an error for us
        self.sender.send(outcome).unwrap_or(0)
    }

    /// Subscribes, replaying the current value first.
    pub fn subscribe(&self) -> Subscription<T> {
        // Holding the lock orders this against `publish`.
        let current = self.current.lock();
        Subscription {
            replay: current.clone(),
            receiver: self.sender.subscribe(),
        }
    }

    /// The last published outcome.
    pub fn current(&self) -> Option<Outcome<T>> {
        self.current.lock().clone()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving end of an [`OutcomeChannel`].
pub struct Subscription<T> {
    replay: Option<Outcome<T>>,
    receiver: broadcast::Receiver<Outcome<T>>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    /// Waits for the next outcome. Returns `None` once the channel is gone.
    ///
    /// A subscriber that falls more than the channel capacity behind skips
    /// the overwritten outcomes and continues with the oldest retained one.
    pub async fn recv(&mut self) -> Option<Outcome<T>> {
        if let Some(outcome) = self.replay.take() {
            return Some(outcome);
        }
        loop {
            match self.receiver.recv().await {
                Ok(outcome) => return Some(outcome),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Outcome subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next outcome if one is already available.
    pub fn try_recv(&mut self) -> Option<Outcome<T>> {
        if let Some(outcome) = self.replay.take() {
            return Some(outcome);
        }
        loop {
            match self.receiver.try_recv() {
                Ok(outcome) => return Some(outcome),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Outcome subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Converts the subscription into a `Stream` of outcomes.
    pub fn into_stream(self) -> impl Stream<Item = Outcome<T>> {
        stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|outcome| (outcome, subscription))
        })
    }
}

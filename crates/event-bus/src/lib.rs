use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use wattgrid_core_types::WattError;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

/// Publish/subscribe contract between a state owner and its observers.
///
/// Publishing is synchronous so the publisher can emit while it still holds
/// its own state lock; every subscriber then sees events in exactly the order
/// they were applied. Subscriptions are unbounded, nothing is ever dropped
/// for a live subscriber.
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    /// Returns the number of subscribers the event was delivered to.
    fn publish(&self, event: E) -> Result<usize, WattError>;
    fn subscribe(&self) -> mpsc::UnboundedReceiver<E>;
}

/// In-memory fan-out bus.
pub struct InMemoryBus<E>
where
    E: Event,
{
    subscribers: Mutex<Vec<mpsc::UnboundedSender<E>>>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn subscriber_count(&self) -> usize {
        let mut guard = self.subscribers.lock();
        guard.retain(|tx| !tx.is_closed());
        guard.len()
    }
}

impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    fn publish(&self, event: E) -> Result<usize, WattError> {
        let mut guard = self.subscribers.lock();
        guard.retain(|tx| !tx.is_closed());
        if guard.is_empty() {
            debug!(target = "event-bus", ?event, "no subscribers for event");
            return Ok(0);
        }

        let mut delivered = 0usize;
        for tx in guard.iter() {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        if delivered == 0 {
            return Err(WattError::new("all subscribers dropped during publish"));
        }
        Ok(delivered)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }
}

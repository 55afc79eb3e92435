//! Multicast output channels.
//!
//! Every coordinator output is a [`Channel`]: each subscriber gets its own
//! unbounded queue, so a slow subscriber never loses values and never holds
//! back the others. A channel can optionally replay its latest value to new
//! subscribers (used for the loading flag). Once closed, existing
//! subscriptions end after draining queued values and new subscriptions end
//! immediately.

use std::sync::Mutex;
use std::sync::MutexGuard;

use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;

/// A multicast channel of values.
#[derive(Debug)]
pub struct Channel<T> {
    name: &'static str,
    inner: Mutex<ChannelInner<T>>,
}

#[derive(Debug)]
struct ChannelInner<T> {
    subscribers: Vec<mpsc::UnboundedSender<T>>,
    /// Latest value, tracked only for replaying channels.
    latest: Option<T>,
    replay: bool,
    closed: bool,
}

impl<T: Clone + Send + 'static> Channel<T> {
    /// Creates a channel that only delivers values published after subscribing.
    pub fn new(name: &'static str) -> Self {
        Self::build(name, None, false)
    }

    /// Creates a channel that replays its latest value (starting with `initial`)
    /// to each new subscriber.
    pub fn replaying(name: &'static str, initial: T) -> Self {
        Self::build(name, Some(initial), true)
    }

    fn build(name: &'static str, latest: Option<T>, replay: bool) -> Self {
        Self {
            name,
            inner: Mutex::new(ChannelInner {
                subscribers: Vec::new(),
                latest,
                replay,
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelInner<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publishes a value to all current subscribers.
    ///
    /// Subscribers whose stream was dropped are pruned. Returns `false` if the
    /// channel is closed and the value was dropped.
    pub fn publish(&self, value: T) -> bool {
        let mut guard = self.lock();
        if guard.closed {
            return false;
        }
        if guard.replay {
            guard.latest = Some(value.clone());
        }

        let before = guard.subscribers.len();
        guard
            .subscribers
            .retain(|subscriber| subscriber.unbounded_send(value.clone()).is_ok());
        let pruned = before - guard.subscribers.len();
        if pruned > 0 {
            log::debug!("Pruned {} dropped subscriber(s) of '{}'", pruned, self.name);
        }
        true
    }

    /// Returns the latest value of a replaying channel.
    pub fn latest(&self) -> Option<T> {
        self.lock().latest.clone()
    }

    /// Subscribes to the channel.
    ///
    /// The returned stream ends when the channel is closed.
    pub fn subscribe(&self) -> BoxStream<'static, T> {
        let mut guard = self.lock();
        if guard.closed {
            return futures::stream::empty().boxed();
        }

        let (tx, rx) = mpsc::unbounded();
        if let Some(latest) = guard.latest.clone() {
            let _ = tx.unbounded_send(latest);
        }
        guard.subscribers.push(tx);
        rx.boxed()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Closes the channel.
    ///
    /// Returns `true` if this call closed it, `false` if it was already closed.
    pub fn close(&self) -> bool {
        let mut guard = self.lock();
        if guard.closed {
            return false;
        }
        guard.closed = true;
        guard.subscribers.clear();
        true
    }

    /// Returns `true` if the channel is closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the channel's name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

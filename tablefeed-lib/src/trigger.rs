//! Trigger sources.
//!
//! A coordinator is driven by a stream of [`Stamped`] payloads. This module
//! provides the shapes most callers need: a source that fires once
//! immediately, a handle that fires on demand (e.g. on a form submit), and an
//! adapter for any other payload stream.

use futures::Stream;
use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::BoxStream;

use crate::stamp::Stamped;

/// A trigger that emits a single `None` payload right away, so the first
/// fetch starts as soon as the coordinator is activated.
pub fn immediate<F: Send + 'static>() -> BoxStream<'static, Stamped<Option<F>>> {
    futures::stream::once(async { Stamped::now(None) }).boxed()
}

/// Adapts an arbitrary payload stream.
///
/// Payloads are stamped when the coordinator receives them, not when they
/// were produced. Prefer [`channel`] when page changes may race with the
/// trigger.
pub fn from_stream<F: Send + 'static>(
    payloads: impl Stream<Item = Option<F>> + Send + 'static,
) -> BoxStream<'static, Stamped<Option<F>>> {
    payloads.map(Stamped::now).boxed()
}

/// Sender half of an on-demand trigger.
///
/// Clone-able. Firing after the coordinator is gone is a no-op.
#[derive(Debug)]
pub struct Trigger<F> {
    tx: mpsc::UnboundedSender<Stamped<Option<F>>>,
}

impl<F> Clone for Trigger<F> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<F> Trigger<F> {
    /// Emits a payload.
    pub fn fire(&self, payload: F) {
        let _ = self.tx.unbounded_send(Stamped::now(Some(payload)));
    }

    /// Emits an empty payload.
    pub fn fire_empty(&self) {
        let _ = self.tx.unbounded_send(Stamped::now(None));
    }

    /// Ends the trigger stream. The coordinator keeps its latest payload.
    pub fn close(&self) {
        self.tx.close_channel();
    }
}

/// Creates an on-demand trigger and the stream to hand to the coordinator.
///
/// Payloads are stamped when fired.
pub fn channel<F: Send + 'static>() -> (Trigger<F>, BoxStream<'static, Stamped<Option<F>>>) {
    let (tx, rx) = mpsc::unbounded();
    (Trigger { tx }, rx.boxed())
}

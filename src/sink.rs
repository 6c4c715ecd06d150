//! Single-subscriber delivery.
//!
//! [`SinkSlot`] holds at most one [`EventSink`]. It has no locking of its
//! own; the owning adapter serialises access. [`stream`] builds a sink whose
//! events can be pulled as a [`Stream`].

use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::channel::Channel;

/// Push contract implemented by downstream subscribers.
///
/// Called from the native SDK's thread; implementations must not block.
///
/// Both methods may run while the owning adapter holds its locks, so they must
/// not call back into the [`Bridge`](crate::bridge::Bridge) or its adapters:
/// an `attach` or `detach` issued from `accept` deadlocks on the channel's
/// own lock. Hand the event off (a channel, or the [`stream`] pair) and act
/// on it from another task.
pub trait EventSink: Send {
    /// Receive one event in the host encoding.
    ///
    /// Must not call into the bridge; see the trait docs.
    fn accept(&mut self, event: Value);

    /// The bridge will send nothing further.
    fn close(&mut self);
}

/// Attachment point for zero or one subscriber.
#[derive(Default)]
pub struct SinkSlot {
    subscriber: Option<Box<dyn EventSink>>,
}

impl SinkSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `subscriber`, returning the one it displaces.
    pub fn set(&mut self, subscriber: Box<dyn EventSink>) -> Option<Box<dyn EventSink>> {
        self.subscriber.replace(subscriber)
    }

    /// Remove and return the current subscriber.
    pub fn clear(&mut self) -> Option<Box<dyn EventSink>> {
        self.subscriber.take()
    }

    /// Deliver `event` if a subscriber is present. Returns whether it was delivered.
    pub fn push(&mut self, event: Value) -> bool {
        match self.subscriber.as_mut() {
            Some(subscriber) => {
                subscriber.accept(event);
                true
            }
            None => false,
        }
    }

    /// Whether no subscriber is attached.
    pub fn is_empty(&self) -> bool {
        self.subscriber.is_none()
    }
}

/// Build a push/pull pair with room for `capacity` undelivered events.
///
/// A `capacity` of zero is raised to one.
pub fn stream(channel: Channel, capacity: usize) -> (StreamSink, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        StreamSink {
            channel,
            tx: Some(tx),
        },
        EventStream {
            channel,
            inner: ReceiverStream::new(rx),
        },
    )
}

/// Push half of [`stream`]. Never blocks: a full buffer drops the event.
pub struct StreamSink {
    channel: Channel,
    tx: Option<mpsc::Sender<Value>>,
}

impl EventSink for StreamSink {
    fn accept(&mut self, event: Value) {
        let Some(tx) = self.tx.as_ref() else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(channel = %self.channel, "event stream buffer full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(channel = %self.channel, "event stream reader gone, dropping event");
                self.tx = None;
            }
        }
    }

    fn close(&mut self) {
        self.tx = None;
    }
}

/// Pull half of [`stream`]. Ends once the push half is closed and drained.
pub struct EventStream {
    channel: Channel,
    inner: ReceiverStream<Value>,
}

impl EventStream {
    /// Channel this stream carries.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Wait for the next event; `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<Value> {
        self.inner.next().await
    }

    /// Take an already buffered event without waiting.
    pub fn try_next_event(&mut self) -> Option<Value> {
        self.inner.as_mut().try_recv().ok()
    }
}

impl Stream for EventStream {
    type Item = Value;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Value>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

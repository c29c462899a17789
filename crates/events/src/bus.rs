//! Publish/subscribe abstraction for stock-change notifications.
//!
//! Delivery contract:
//! - **Best-effort fan-out**: every *connected* subscriber gets a copy of
//!   each published message, at most once.
//! - **No replay**: a subscriber that connects late or disconnects simply
//!   misses messages. The stock store is the source of truth to re-poll.
//! - **Per-publisher order**: messages from one publisher arrive at each
//!   subscriber in publish order. No cross-subscriber ordering is implied.
//!
//! Publication must stay off the fulfillment processor's critical path: a
//! slow subscriber must never block a stock mutation, which is why
//! subscriptions are buffered channels rather than callbacks into the
//! publisher's thread.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A live subscription to a notification stream.
///
/// Designed for single-threaded consumption: one subscription per consumer
/// thread. The typical consumer loop uses `recv_timeout` so it can observe a
/// shutdown flag between messages.
pub struct Subscription<M> {
    receiver: Receiver<M>,
    // Held so transport-backed buses can detect the subscription's drop:
    // the forwarding side keeps a `Weak` to whatever lives in here.
    _transport: Option<Box<dyn Send>>,
}

impl<M> core::fmt::Debug for Subscription<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Subscription")
            .field("receiver", &self.receiver)
            .field("transport", &self._transport.is_some())
            .finish()
    }
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self {
            receiver,
            _transport: None,
        }
    }

    /// A subscription that owns a transport guard. Dropping the subscription
    /// drops the guard, which is how connection-backed buses learn the
    /// consumer went away.
    pub fn with_transport(receiver: Receiver<M>, transport: Box<dyn Send>) -> Self {
        Self {
            receiver,
            _transport: Some(transport),
        }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Transport-agnostic notification bus.
///
/// Implementations must tolerate concurrent publishes and concurrent
/// subscribe/disconnect; the subscriber set is the only shared state and a
/// dropped subscription must never fail subsequent publishes.
pub trait NotificationBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> NotificationBus<M> for Arc<B>
where
    B: NotificationBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}

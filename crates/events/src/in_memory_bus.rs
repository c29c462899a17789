//! In-memory notification bus for tests/dev and single-process deployments.

use std::sync::{Mutex, mpsc};

use tracing::trace;

use crate::bus::{NotificationBus, Subscription};

#[derive(Debug)]
pub enum InMemoryBusError {
    /// Publish failed due to internal lock poisoning.
    Poisoned,
}

/// In-memory pub/sub bus.
///
/// - No IO / no async
/// - Best-effort fan-out
/// - Disconnected subscribers are dropped on the next publish
#[derive(Debug)]
pub struct InMemoryNotificationBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryNotificationBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryNotificationBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> NotificationBus<M> for InMemoryNotificationBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subs = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        // Drop any dead subscribers while publishing.
        let before = subs.len();
        subs.retain(|tx| tx.send(message.clone()).is_ok());
        if subs.len() < before {
            trace!(dropped = before - subs.len(), "dropped dead subscribers");
        }

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // If the lock is poisoned, we still return a subscription;
        // it just won't receive messages until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn fan_out_delivers_to_every_subscriber() {
        let bus: InMemoryNotificationBus<u64> = InMemoryNotificationBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(7).unwrap();

        assert_eq!(a.recv_timeout(Duration::from_secs(1)).unwrap(), 7);
        assert_eq!(b.recv_timeout(Duration::from_secs(1)).unwrap(), 7);
    }

    #[test]
    fn per_publisher_order_is_preserved() {
        let bus: InMemoryNotificationBus<u64> = InMemoryNotificationBus::new();
        let sub = bus.subscribe();

        for i in 0..10 {
            bus.publish(i).unwrap();
        }
        for i in 0..10 {
            assert_eq!(sub.recv_timeout(Duration::from_secs(1)).unwrap(), i);
        }
    }

    #[test]
    fn dropped_subscriber_does_not_fail_publish() {
        let bus: InMemoryNotificationBus<u64> = InMemoryNotificationBus::new();
        let sub = bus.subscribe();
        drop(sub);

        assert!(bus.publish(1).is_ok());

        // Late subscriber misses earlier messages (no replay).
        let late = bus.subscribe();
        bus.publish(2).unwrap();
        assert_eq!(late.recv_timeout(Duration::from_secs(1)).unwrap(), 2);
        assert!(late.try_recv().is_err());
    }
}

//! Redis pub/sub-backed notification bus.
//!
//! Redis pub/sub is not durable: messages published while a subscriber is
//! offline are simply lost. That is exactly the contract stock-change
//! notifications want — subscribers re-read the stock store on reconnect.

use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use redis::Commands;

use stockflow_events::{NotificationBus, Subscription};
use stockflow_orders::StockChangeEvent;

/// Default pub/sub channel for stock changes.
const DEFAULT_CHANNEL: &str = "stockflow:stock_changes";

/// How often the forwarding thread wakes from a quiet channel to check
/// whether its subscription is still alive.
const SUBSCRIBER_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum RedisBusError {
    Redis(String),
    Serialize(String),
}

/// Redis pub/sub bus for stock-change events.
#[derive(Debug, Clone)]
pub struct RedisNotificationBus {
    client: redis::Client,
    channel: String,
}

impl RedisNotificationBus {
    pub fn new(
        redis_url: impl AsRef<str>,
        channel: Option<String>,
    ) -> Result<Self, RedisBusError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;
        Ok(Self {
            client,
            channel: channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
        })
    }
}

impl NotificationBus<StockChangeEvent> for RedisNotificationBus {
    type Error = RedisBusError;

    fn publish(&self, message: StockChangeEvent) -> Result<(), Self::Error> {
        let payload = serde_json::to_string(&message)
            .map_err(|e| RedisBusError::Serialize(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        let _: i64 = conn
            .publish(&self.channel, payload)
            .map_err(|e| RedisBusError::Redis(e.to_string()))?;

        Ok(())
    }

    fn subscribe(&self) -> Subscription<StockChangeEvent> {
        let (tx, rx) = mpsc::channel();

        // The subscription owns this token; the forwarding thread holds only
        // a `Weak` so it can notice the drop even when the channel is quiet.
        let alive = Arc::new(());
        let watch: Weak<()> = Arc::downgrade(&alive);

        let client = self.client.clone();
        let channel = self.channel.clone();

        // Background thread that receives pub/sub messages and forwards them.
        thread::spawn(move || {
            let mut conn = match client.get_connection() {
                Ok(c) => c,
                Err(_) => return,
            };
            if conn
                .set_read_timeout(Some(SUBSCRIBER_POLL_INTERVAL))
                .is_err()
            {
                return;
            }

            let mut pubsub = conn.as_pubsub();
            if pubsub.subscribe(channel).is_err() {
                return;
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(e) if e.is_timeout() => {
                        if watch.upgrade().is_none() {
                            return;
                        }
                        continue;
                    }
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let event: StockChangeEvent = match serde_json::from_str(&payload) {
                    Ok(e) => e,
                    Err(_) => continue,
                };

                if tx.send(event).is_err() {
                    return;
                }
            }
        });

        Subscription::with_transport(rx, Box::new(alive))
    }
}

//! Notification fan-out mechanics.
//!
//! The bus abstraction is transport-agnostic and carries no persistence: it
//! distributes stock-change notifications to whoever is connected right now.
//! The authoritative state lives in the stock store; a subscriber that
//! misses events re-reads the store to resynchronize.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{NotificationBus, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryNotificationBus};

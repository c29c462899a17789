//! Infrastructure notification bus implementations.
//!
//! The bus abstraction lives in `stockflow-events` as pure mechanics; this
//! module provides infrastructure-backed implementations (e.g. Redis).

#[cfg(feature = "redis")]
pub mod redis_pubsub;

#[cfg(feature = "redis")]
pub use redis_pubsub::{RedisBusError, RedisNotificationBus};

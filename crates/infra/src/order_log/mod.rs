//! Append-only order log boundary.
//!
//! The log assigns a strictly increasing [`LogPosition`] to each appended
//! entry and is never mutated in place, so a read restarted from the same
//! position reproduces the same entries. The log does **not** deduplicate:
//! a producer retrying an append may write the same payload at a fresh
//! position, and the consumer deduplicates by `order_id`.

use std::sync::Arc;

use thiserror::Error;

use stockflow_orders::{LogPosition, OrderRequest};

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryOrderLog;
#[cfg(feature = "redis")]
pub use redis::RedisOrderLog;

/// Order log operation error. Only storage unavailability fails an append;
/// there are no business failures at this boundary.
#[derive(Debug, Error)]
pub enum OrderLogError {
    #[error("order log unavailable: {0}")]
    Unavailable(String),

    #[error("order log entry corrupt: {0}")]
    Corrupt(String),
}

pub trait OrderLog: Send + Sync {
    /// Append an entry; the log assigns and returns its position.
    fn append(&self, request: OrderRequest) -> Result<LogPosition, OrderLogError>;

    /// Read up to `limit` entries strictly after `after`, in position order.
    ///
    /// Returns an empty vector when the log is drained. Restartable: the
    /// same `after` always yields the same prefix of entries.
    fn read_after(
        &self,
        after: LogPosition,
        limit: usize,
    ) -> Result<Vec<(LogPosition, OrderRequest)>, OrderLogError>;
}

impl<L> OrderLog for Arc<L>
where
    L: OrderLog + ?Sized,
{
    fn append(&self, request: OrderRequest) -> Result<LogPosition, OrderLogError> {
        (**self).append(request)
    }

    fn read_after(
        &self,
        after: LogPosition,
        limit: usize,
    ) -> Result<Vec<(LogPosition, OrderRequest)>, OrderLogError> {
        (**self).read_after(after, limit)
    }
}

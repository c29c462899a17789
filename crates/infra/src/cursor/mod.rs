//! Fulfillment cursor persistence.
//!
//! The cursor is a worker's private bookmark of the last order-log position
//! it has durably processed. It is owned exclusively by that worker (keyed
//! by worker name) and is never read or written by producers or
//! subscribers. Persisting it is what prevents reprocessing across
//! restarts: a worker resumes strictly after its stored cursor instead of
//! replaying the log from the head.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use stockflow_orders::LogPosition;

#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "redis")]
pub use redis::RedisCursorStore;

#[derive(Debug, Error)]
pub enum CursorStoreError {
    #[error("cursor store unavailable: {0}")]
    Unavailable(String),
}

pub trait CursorStore: Send + Sync {
    /// Last durably processed position for a worker, if any.
    fn get(&self, worker: &str) -> Result<Option<LogPosition>, CursorStoreError>;

    /// Advance the worker's cursor. Positions only ever move forward.
    fn set(&self, worker: &str, position: LogPosition) -> Result<(), CursorStoreError>;
}

impl<C> CursorStore for Arc<C>
where
    C: CursorStore + ?Sized,
{
    fn get(&self, worker: &str) -> Result<Option<LogPosition>, CursorStoreError> {
        (**self).get(worker)
    }

    fn set(&self, worker: &str, position: LogPosition) -> Result<(), CursorStoreError> {
        (**self).set(worker, position)
    }
}

/// In-memory cursor store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCursorStore {
    cursors: RwLock<HashMap<String, LogPosition>>,
}

impl InMemoryCursorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CursorStore for InMemoryCursorStore {
    fn get(&self, worker: &str) -> Result<Option<LogPosition>, CursorStoreError> {
        let cursors = self
            .cursors
            .read()
            .map_err(|_| CursorStoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(cursors.get(worker).copied())
    }

    fn set(&self, worker: &str, position: LogPosition) -> Result<(), CursorStoreError> {
        let mut cursors = self
            .cursors
            .write()
            .map_err(|_| CursorStoreError::Unavailable("lock poisoned".to_string()))?;
        cursors.insert(worker.to_string(), position);
        Ok(())
    }
}

//! Dead-letter parking for poisoned order entries.
//!
//! An entry that still fails after its retry budget is parked here and the
//! cursor stops in front of it. Skipping it instead would corrupt the
//! fulfilled/failed accounting, so parked entries stay operator-visible
//! until resolved.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockflow_orders::{LogPosition, OrderRequest};

/// An order entry removed from normal processing after exhausting retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkedOrder {
    pub position: LogPosition,
    pub request: OrderRequest,
    pub attempts: u32,
    pub reason: String,
    pub parked_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DeadLetterError {
    #[error("dead-letter store unavailable: {0}")]
    Unavailable(String),
}

pub trait DeadLetterStore: Send + Sync {
    fn park(&self, entry: ParkedOrder) -> Result<(), DeadLetterError>;

    /// All currently parked entries, oldest first.
    fn list(&self) -> Result<Vec<ParkedOrder>, DeadLetterError>;
}

impl<D> DeadLetterStore for Arc<D>
where
    D: DeadLetterStore + ?Sized,
{
    fn park(&self, entry: ParkedOrder) -> Result<(), DeadLetterError> {
        (**self).park(entry)
    }

    fn list(&self) -> Result<Vec<ParkedOrder>, DeadLetterError> {
        (**self).list()
    }
}

/// In-memory dead-letter store.
#[derive(Debug, Default)]
pub struct InMemoryDeadLetterStore {
    parked: Mutex<Vec<ParkedOrder>>,
}

impl InMemoryDeadLetterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeadLetterStore for InMemoryDeadLetterStore {
    fn park(&self, entry: ParkedOrder) -> Result<(), DeadLetterError> {
        let mut parked = self
            .parked
            .lock()
            .map_err(|_| DeadLetterError::Unavailable("lock poisoned".to_string()))?;
        parked.push(entry);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ParkedOrder>, DeadLetterError> {
        let parked = self
            .parked
            .lock()
            .map_err(|_| DeadLetterError::Unavailable("lock poisoned".to_string()))?;
        Ok(parked.clone())
    }
}

//! Redis-backed cursor store (one string key per worker).

use std::sync::Arc;

use redis::Commands;

use stockflow_orders::LogPosition;

use super::{CursorStore, CursorStoreError};

/// Default key prefix for worker cursors.
const DEFAULT_KEY_PREFIX: &str = "stockflow:cursor";

#[derive(Debug, Clone)]
pub struct RedisCursorStore {
    client: Arc<redis::Client>,
    key_prefix: String,
}

impl RedisCursorStore {
    pub fn new(
        redis_url: impl AsRef<str>,
        key_prefix: Option<String>,
    ) -> Result<Self, CursorStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| CursorStoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            key_prefix: key_prefix.unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        })
    }

    fn key(&self, worker: &str) -> String {
        format!("{}:{}", self.key_prefix, worker)
    }
}

impl CursorStore for RedisCursorStore {
    fn get(&self, worker: &str) -> Result<Option<LogPosition>, CursorStoreError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| CursorStoreError::Unavailable(e.to_string()))?;

        let raw: Option<String> = conn
            .get(self.key(worker))
            .map_err(|e| CursorStoreError::Unavailable(e.to_string()))?;

        raw.map(|s| {
            s.parse::<LogPosition>()
                .map_err(|e| CursorStoreError::Unavailable(format!("corrupt cursor: {e}")))
        })
        .transpose()
    }

    fn set(&self, worker: &str, position: LogPosition) -> Result<(), CursorStoreError> {
        let mut conn = self
            .client
            .get_connection()
            .map_err(|e| CursorStoreError::Unavailable(e.to_string()))?;

        conn.set(self.key(worker), position.to_string())
            .map_err(|e| CursorStoreError::Unavailable(e.to_string()))
    }
}

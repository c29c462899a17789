//! Redis Streams-backed order log.
//!
//! Entries live in a single stream; XADD assigns the `ms-seq` id that we
//! surface as the [`LogPosition`]. Reads use XRANGE with an exclusive start
//! (`(ms-seq`, Redis 6.2+) so "strictly after the cursor" holds without
//! consumer groups; the cursor itself is the processor's, not Redis's.

use std::collections::HashMap;
use std::sync::Arc;

use stockflow_orders::{LogPosition, OrderRequest};

use super::{OrderLog, OrderLogError};

/// Default stream key for order requests.
const DEFAULT_STREAM_KEY: &str = "stockflow:orders";

#[derive(Debug, Clone)]
pub struct RedisOrderLog {
    client: Arc<redis::Client>,
    stream_key: String,
}

impl RedisOrderLog {
    /// Create a new Redis-backed order log.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `stream_key` - stream key (default: "stockflow:orders")
    pub fn new(
        redis_url: impl AsRef<str>,
        stream_key: Option<String>,
    ) -> Result<Self, OrderLogError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| OrderLogError::Unavailable(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            stream_key: stream_key.unwrap_or_else(|| DEFAULT_STREAM_KEY.to_string()),
        })
    }

    fn connection(&self) -> Result<redis::Connection, OrderLogError> {
        self.client
            .get_connection()
            .map_err(|e| OrderLogError::Unavailable(e.to_string()))
    }
}

impl OrderLog for RedisOrderLog {
    fn append(&self, request: OrderRequest) -> Result<LogPosition, OrderLogError> {
        let payload = serde_json::to_string(&request)
            .map_err(|e| OrderLogError::Corrupt(format!("payload serialization failed: {e}")))?;

        let mut conn = self.connection()?;

        // XADD with auto-generated id (*); order_id kept as a plain field for
        // ad-hoc inspection alongside the JSON payload.
        let id: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("order_id")
            .arg(request.order_id.to_string())
            .arg("payload")
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| OrderLogError::Unavailable(format!("XADD failed: {e}")))?;

        id.parse::<LogPosition>()
            .map_err(|e| OrderLogError::Corrupt(format!("bad stream id '{id}': {e}")))
    }

    fn read_after(
        &self,
        after: LogPosition,
        limit: usize,
    ) -> Result<Vec<(LogPosition, OrderRequest)>, OrderLogError> {
        let mut conn = self.connection()?;

        let entries: Vec<(String, HashMap<String, String>)> = redis::cmd("XRANGE")
            .arg(&self.stream_key)
            .arg(format!("({after}"))
            .arg("+")
            .arg("COUNT")
            .arg(limit)
            .query(&mut conn)
            .map_err(|e| OrderLogError::Unavailable(format!("XRANGE failed: {e}")))?;

        let mut out = Vec::with_capacity(entries.len());
        for (id, fields) in entries {
            let position = id
                .parse::<LogPosition>()
                .map_err(|e| OrderLogError::Corrupt(format!("bad stream id '{id}': {e}")))?;

            let payload = fields
                .get("payload")
                .ok_or_else(|| OrderLogError::Corrupt(format!("entry {id} missing payload")))?;

            let request: OrderRequest = serde_json::from_str(payload)
                .map_err(|e| OrderLogError::Corrupt(format!("entry {id}: {e}")))?;

            out.push((position, request));
        }

        Ok(out)
    }
}

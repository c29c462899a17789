//! Redis-backed stock store.
//!
//! Each product is a JSON document at `stockflow:product:{id}`. The CAS
//! primitive is a WATCH transaction on that key: the stored version is
//! compared inside the transaction, and Redis aborts the EXEC if another
//! writer touched the key in between (the helper then re-runs the closure
//! against fresh state).

use std::sync::Arc;

use chrono::Utc;
use redis::Commands;

use stockflow_catalog::{Product, ProductPatch};
use stockflow_core::{ExpectedVersion, ProductId};

use super::{StockStore, StockStoreError, check_expectation};

/// Default key prefix for product documents.
const DEFAULT_KEY_PREFIX: &str = "stockflow:product";

#[derive(Debug, Clone)]
pub struct RedisStockStore {
    client: Arc<redis::Client>,
    key_prefix: String,
}

impl RedisStockStore {
    /// Create a new Redis-backed stock store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `key_prefix` - product key prefix (default: "stockflow:product")
    pub fn new(
        redis_url: impl AsRef<str>,
        key_prefix: Option<String>,
    ) -> Result<Self, StockStoreError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| StockStoreError::Unavailable(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            key_prefix: key_prefix.unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string()),
        })
    }

    fn key(&self, product_id: ProductId) -> String {
        format!("{}:{}", self.key_prefix, product_id)
    }

    fn connection(&self) -> Result<redis::Connection, StockStoreError> {
        self.client
            .get_connection()
            .map_err(|e| StockStoreError::Unavailable(e.to_string()))
    }

    fn decode(raw: &str) -> Result<Product, StockStoreError> {
        serde_json::from_str(raw)
            .map_err(|e| StockStoreError::Unavailable(format!("corrupt product document: {e}")))
    }

    fn encode(product: &Product) -> Result<String, StockStoreError> {
        serde_json::to_string(product)
            .map_err(|e| StockStoreError::Unavailable(format!("serialization failed: {e}")))
    }

    /// Version-checked read-modify-write of one product document.
    ///
    /// `mutate` receives the current record and produces the replacement
    /// (`None` deletes the key). Runs under WATCH so concurrent writers
    /// force a re-read rather than a lost update.
    fn checked_write(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        mutate: impl Fn(&Product) -> Result<Option<Product>, StockStoreError>,
    ) -> Result<Option<Product>, StockStoreError> {
        let key = self.key(product_id);
        let mut conn = self.connection()?;

        let outcome: Result<Option<Product>, StockStoreError> =
            redis::transaction(&mut conn, &[&key], |conn, pipe| {
                let raw: Option<String> = conn.get(&key)?;
                let Some(raw) = raw else {
                    return Ok(Some(Err(StockStoreError::NotFound)));
                };

                let current = match Self::decode(&raw) {
                    Ok(p) => p,
                    Err(e) => return Ok(Some(Err(e))),
                };

                if let Err(conflict) = check_expectation(expected, current.version) {
                    return Ok(Some(Err(conflict)));
                }

                let next = match mutate(&current) {
                    Ok(n) => n,
                    Err(e) => return Ok(Some(Err(e))),
                };

                let applied: Option<()> = match &next {
                    Some(updated) => {
                        let payload = match Self::encode(updated) {
                            Ok(p) => p,
                            Err(e) => return Ok(Some(Err(e))),
                        };
                        pipe.set(&key, payload).ignore().query(conn)?
                    }
                    None => pipe.del(&key).ignore().query(conn)?,
                };

                // None means the EXEC was aborted by a concurrent write;
                // the transaction helper re-runs the closure.
                Ok(applied.map(|()| Ok(next)))
            })
            .map_err(|e| StockStoreError::Unavailable(e.to_string()))?;

        outcome
    }
}

impl StockStore for RedisStockStore {
    fn get(&self, product_id: ProductId) -> Result<Option<Product>, StockStoreError> {
        let mut conn = self.connection()?;
        let raw: Option<String> = conn
            .get(self.key(product_id))
            .map_err(|e| StockStoreError::Unavailable(e.to_string()))?;

        raw.as_deref().map(Self::decode).transpose()
    }

    fn list(&self) -> Result<Vec<Product>, StockStoreError> {
        let mut conn = self.connection()?;
        let keys: Vec<String> = conn
            .keys(format!("{}:*", self.key_prefix))
            .map_err(|e| StockStoreError::Unavailable(e.to_string()))?;

        let mut products = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = conn
                .get(&key)
                .map_err(|e| StockStoreError::Unavailable(e.to_string()))?;
            if let Some(raw) = raw {
                products.push(Self::decode(&raw)?);
            }
        }
        Ok(products)
    }

    fn create(&self, product: Product) -> Result<Product, StockStoreError> {
        let payload = Self::encode(&product)?;
        let mut conn = self.connection()?;

        let inserted: bool = conn
            .set_nx(self.key(product.id), payload)
            .map_err(|e| StockStoreError::Unavailable(e.to_string()))?;

        if !inserted {
            return Err(StockStoreError::AlreadyExists);
        }
        Ok(product)
    }

    fn compare_and_set_stock(
        &self,
        product_id: ProductId,
        expected_version: u64,
        new_stock: u64,
    ) -> Result<Product, StockStoreError> {
        let updated = self.checked_write(
            product_id,
            ExpectedVersion::Exact(expected_version),
            |current| Ok(Some(current.with_stock(new_stock, Utc::now()))),
        )?;

        // The mutation always produces a record on this path.
        updated.ok_or(StockStoreError::NotFound)
    }

    fn update(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        patch: &ProductPatch,
    ) -> Result<Product, StockStoreError> {
        let updated = self.checked_write(product_id, expected, |current| {
            Ok(Some(patch.apply_to(current, Utc::now())?))
        })?;

        updated.ok_or(StockStoreError::NotFound)
    }

    fn delete(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
    ) -> Result<(), StockStoreError> {
        self.checked_write(product_id, expected, |_| Ok(None))?;
        Ok(())
    }
}

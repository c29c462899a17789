//! Durable product state with optimistic-concurrency update.
//!
//! `compare_and_set_stock` is the **only** stock mutation primitive; the
//! administrative create/update/delete operations go through the same
//! version check, so the processor's CAS detects concurrent administrative
//! edits and vice versa. Every successful mutation bumps `version`.

use std::sync::Arc;

use thiserror::Error;

use stockflow_catalog::{Product, ProductPatch};
use stockflow_core::{ExpectedVersion, ProductId};

pub mod in_memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use in_memory::InMemoryStockStore;
#[cfg(feature = "redis")]
pub use redis::RedisStockStore;

/// Stock store operation error.
///
/// `VersionConflict` is transient: the processor retries it with backoff,
/// administrative callers surface it as a user-retryable conflict.
#[derive(Debug, Error)]
pub enum StockStoreError {
    #[error("product not found")]
    NotFound,

    #[error("product already exists")]
    AlreadyExists,

    #[error("version conflict (expected {expected}, actual {actual})")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("invalid mutation: {0}")]
    Invalid(#[from] stockflow_core::DomainError),

    #[error("stock store unavailable: {0}")]
    Unavailable(String),
}

pub trait StockStore: Send + Sync {
    fn get(&self, product_id: ProductId) -> Result<Option<Product>, StockStoreError>;

    /// All products (read-only display boundary).
    fn list(&self) -> Result<Vec<Product>, StockStoreError>;

    /// Insert a freshly validated record (version 1). Fails on an existing id.
    fn create(&self, product: Product) -> Result<Product, StockStoreError>;

    /// Conditionally set the stock level: succeeds only when the stored
    /// version equals `expected_version`, and bumps the version.
    fn compare_and_set_stock(
        &self,
        product_id: ProductId,
        expected_version: u64,
        new_stock: u64,
    ) -> Result<Product, StockStoreError>;

    /// Administrative partial update. `Exact` expectations are checked like
    /// CAS; `Any` opts out (bulk seeding, operator overrides).
    fn update(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        patch: &ProductPatch,
    ) -> Result<Product, StockStoreError>;

    /// Administrative delete, with the same expectation semantics as
    /// [`StockStore::update`].
    fn delete(&self, product_id: ProductId, expected: ExpectedVersion)
    -> Result<(), StockStoreError>;
}

/// Shared expectation check for store implementations.
pub(crate) fn check_expectation(
    expected: ExpectedVersion,
    actual: u64,
) -> Result<(), StockStoreError> {
    match expected {
        ExpectedVersion::Exact(v) if !expected.matches(actual) => {
            Err(StockStoreError::VersionConflict {
                expected: v,
                actual,
            })
        }
        _ => Ok(()),
    }
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn get(&self, product_id: ProductId) -> Result<Option<Product>, StockStoreError> {
        (**self).get(product_id)
    }

    fn list(&self) -> Result<Vec<Product>, StockStoreError> {
        (**self).list()
    }

    fn create(&self, product: Product) -> Result<Product, StockStoreError> {
        (**self).create(product)
    }

    fn compare_and_set_stock(
        &self,
        product_id: ProductId,
        expected_version: u64,
        new_stock: u64,
    ) -> Result<Product, StockStoreError> {
        (**self).compare_and_set_stock(product_id, expected_version, new_stock)
    }

    fn update(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        patch: &ProductPatch,
    ) -> Result<Product, StockStoreError> {
        (**self).update(product_id, expected, patch)
    }

    fn delete(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
    ) -> Result<(), StockStoreError> {
        (**self).delete(product_id, expected)
    }
}

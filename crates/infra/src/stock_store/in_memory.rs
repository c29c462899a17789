use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use stockflow_catalog::{Product, ProductPatch};
use stockflow_core::{ExpectedVersion, ProductId};

use super::{StockStore, StockStoreError, check_expectation};

/// In-memory stock store.
///
/// Mutations take the write lock for the whole check-and-write, so the
/// version check and the write are one atomic unit relative to concurrent
/// writers on the same product.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> StockStoreError {
        StockStoreError::Unavailable("lock poisoned".to_string())
    }
}

impl StockStore for InMemoryStockStore {
    fn get(&self, product_id: ProductId) -> Result<Option<Product>, StockStoreError> {
        let products = self.products.read().map_err(|_| Self::poisoned())?;
        Ok(products.get(&product_id).cloned())
    }

    fn list(&self) -> Result<Vec<Product>, StockStoreError> {
        let products = self.products.read().map_err(|_| Self::poisoned())?;
        Ok(products.values().cloned().collect())
    }

    fn create(&self, product: Product) -> Result<Product, StockStoreError> {
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;

        if products.contains_key(&product.id) {
            return Err(StockStoreError::AlreadyExists);
        }

        products.insert(product.id, product.clone());
        Ok(product)
    }

    fn compare_and_set_stock(
        &self,
        product_id: ProductId,
        expected_version: u64,
        new_stock: u64,
    ) -> Result<Product, StockStoreError> {
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;

        let current = products.get(&product_id).ok_or(StockStoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StockStoreError::VersionConflict {
                expected: expected_version,
                actual: current.version,
            });
        }

        let updated = current.with_stock(new_stock, Utc::now());
        products.insert(product_id, updated.clone());
        Ok(updated)
    }

    fn update(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        patch: &ProductPatch,
    ) -> Result<Product, StockStoreError> {
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;

        let current = products.get(&product_id).ok_or(StockStoreError::NotFound)?;
        check_expectation(expected, current.version)?;

        let updated = patch.apply_to(current, Utc::now())?;
        products.insert(product_id, updated.clone());
        Ok(updated)
    }

    fn delete(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
    ) -> Result<(), StockStoreError> {
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;

        let current = products.get(&product_id).ok_or(StockStoreError::NotFound)?;
        check_expectation(expected, current.version)?;

        products.remove(&product_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_catalog::NewProduct;

    fn seeded(stock: u64) -> (InMemoryStockStore, Product) {
        let store = InMemoryStockStore::new();
        let product = NewProduct {
            id: ProductId::new(),
            name: "Bluetooth Speaker".to_string(),
            description: "Waterproof portable speaker".to_string(),
            price_cents: 8999,
            initial_stock: stock,
        }
        .into_product(Utc::now())
        .unwrap();
        let product = store.create(product).unwrap();
        (store, product)
    }

    #[test]
    fn create_rejects_duplicate_id() {
        let (store, product) = seeded(10);
        assert!(matches!(
            store.create(product),
            Err(StockStoreError::AlreadyExists)
        ));
    }

    #[test]
    fn cas_succeeds_on_matching_version_and_bumps_it() {
        let (store, product) = seeded(10);
        let updated = store
            .compare_and_set_stock(product.id, product.version, 6)
            .unwrap();
        assert_eq!(updated.stock, 6);
        assert_eq!(updated.version, product.version + 1);
    }

    #[test]
    fn cas_detects_stale_version() {
        let (store, product) = seeded(10);
        store
            .compare_and_set_stock(product.id, product.version, 6)
            .unwrap();

        let err = store
            .compare_and_set_stock(product.id, product.version, 3)
            .unwrap_err();
        assert!(matches!(
            err,
            StockStoreError::VersionConflict { expected: 1, actual: 2 }
        ));

        // The losing writer must not have observed pre-decrement stock.
        assert_eq!(store.get(product.id).unwrap().unwrap().stock, 6);
    }

    #[test]
    fn cas_on_missing_product_is_not_found() {
        let store = InMemoryStockStore::new();
        assert!(matches!(
            store.compare_and_set_stock(ProductId::new(), 1, 5),
            Err(StockStoreError::NotFound)
        ));
    }

    #[test]
    fn administrative_update_bumps_version_too() {
        let (store, product) = seeded(10);
        let patch = ProductPatch {
            stock: Some(99),
            ..ProductPatch::default()
        };
        let updated = store
            .update(product.id, ExpectedVersion::Exact(product.version), &patch)
            .unwrap();
        assert_eq!(updated.stock, 99);
        assert_eq!(updated.version, product.version + 1);

        // A CAS holding the pre-update version now conflicts.
        assert!(matches!(
            store.compare_and_set_stock(product.id, product.version, 0),
            Err(StockStoreError::VersionConflict { .. })
        ));
    }

    #[test]
    fn any_expectation_skips_the_version_check() {
        let (store, product) = seeded(10);
        let patch = ProductPatch {
            stock: Some(4),
            ..ProductPatch::default()
        };
        let updated = store
            .update(product.id, ExpectedVersion::Any, &patch)
            .unwrap();
        assert_eq!(updated.stock, 4);
        assert_eq!(updated.version, product.version + 1);
    }

    #[test]
    fn delete_is_version_checked() {
        let (store, product) = seeded(10);
        assert!(matches!(
            store.delete(product.id, ExpectedVersion::Exact(product.version + 7)),
            Err(StockStoreError::VersionConflict { .. })
        ));
        store
            .delete(product.id, ExpectedVersion::Exact(product.version))
            .unwrap();
        assert!(store.get(product.id).unwrap().is_none());
    }
}

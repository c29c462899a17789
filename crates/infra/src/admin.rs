//! Administrative catalog operations.
//!
//! All mutations go through the same version check the fulfillment
//! processor uses, so an admin edit racing a decrement loses cleanly:
//! `VersionConflict` surfaces to the caller, who re-reads and retries. A
//! stock-touching update emits a manual-update notification after the write
//! lands.

use chrono::Utc;
use tracing::{info, warn};

use stockflow_catalog::{NewProduct, Product, ProductPatch};
use stockflow_core::{ExpectedVersion, ProductId};
use stockflow_events::NotificationBus;
use stockflow_orders::StockChangeEvent;

use crate::stock_store::{StockStore, StockStoreError};

#[derive(Debug)]
pub struct ProductAdmin<S, B> {
    stock: S,
    bus: B,
}

impl<S, B> ProductAdmin<S, B>
where
    S: StockStore,
    B: NotificationBus<StockChangeEvent>,
{
    pub fn new(stock: S, bus: B) -> Self {
        Self { stock, bus }
    }

    pub fn create(&self, command: NewProduct) -> Result<Product, StockStoreError> {
        let product = command.into_product(Utc::now())?;
        let created = self.stock.create(product)?;
        info!(product_id = %created.id, stock = created.stock, "product created");

        self.publish_manual_update(created.id, created.stock);
        Ok(created)
    }

    pub fn get(&self, product_id: ProductId) -> Result<Option<Product>, StockStoreError> {
        self.stock.get(product_id)
    }

    pub fn list(&self) -> Result<Vec<Product>, StockStoreError> {
        self.stock.list()
    }

    /// Version-checked partial update. A stale `Exact` expectation returns
    /// `VersionConflict`; re-read and retry with fresh state. `Any` skips
    /// the check for operator overrides.
    pub fn update(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
        patch: ProductPatch,
    ) -> Result<Product, StockStoreError> {
        let touches_stock = patch.touches_stock();
        let updated = self.stock.update(product_id, expected, &patch)?;
        info!(
            product_id = %updated.id,
            version = updated.version,
            "product updated"
        );

        if touches_stock {
            self.publish_manual_update(updated.id, updated.stock);
        }
        Ok(updated)
    }

    pub fn delete(
        &self,
        product_id: ProductId,
        expected: ExpectedVersion,
    ) -> Result<(), StockStoreError> {
        self.stock.delete(product_id, expected)?;
        info!(product_id = %product_id, "product deleted");
        Ok(())
    }

    fn publish_manual_update(&self, product_id: ProductId, new_stock: u64) {
        let event = StockChangeEvent::manual_update(product_id, new_stock, Utc::now());
        if let Err(e) = self.bus.publish(event) {
            warn!(product_id = %product_id, error = ?e, "stock-change publish failed");
        }
    }
}

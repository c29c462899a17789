use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, ProductId};

/// Product record owned by the stock store.
///
/// `version` starts at 1 on create and bumps on **every** mutation, whether
/// it comes from the fulfillment processor's decrement or from an
/// administrative edit. That is what lets compare-and-set detect concurrent
/// writers of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Price in the smallest currency unit (cents). Always positive.
    pub price_cents: u64,
    /// Current stock on hand. Never negative by construction (unsigned).
    pub stock: u64,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether an order for `quantity` units can currently be fulfilled.
    pub fn can_fulfill(&self, quantity: u32) -> bool {
        self.stock >= u64::from(quantity)
    }

    /// Copy of this record with new stock and a bumped version.
    ///
    /// This is the shape every store mutation must produce; stores never
    /// write a record without bumping `version`.
    pub fn with_stock(&self, new_stock: u64, now: DateTime<Utc>) -> Product {
        Product {
            stock: new_stock,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Administrative command: create a product record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price_cents: u64,
    pub initial_stock: u64,
}

impl NewProduct {
    /// Validate and build the initial record (version 1).
    pub fn into_product(self, now: DateTime<Utc>) -> DomainResult<Product> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("product name is required"));
        }
        if self.price_cents == 0 {
            return Err(DomainError::validation("price must be positive"));
        }

        Ok(Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price_cents: self.price_cents,
            stock: self.initial_stock,
            version: 1,
            updated_at: now,
        })
    }
}

/// Administrative command: partial update of a product record.
///
/// `None` fields are left untouched. Applying a patch always bumps the
/// version, even when the resulting fields are identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<u64>,
    pub stock: Option<u64>,
}

impl ProductPatch {
    /// Whether this patch changes the stock level (and therefore warrants a
    /// stock-change notification).
    pub fn touches_stock(&self) -> bool {
        self.stock.is_some()
    }

    /// Validate and apply onto an existing record.
    pub fn apply_to(&self, product: &Product, now: DateTime<Utc>) -> DomainResult<Product> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("product name is required"));
            }
        }
        if self.price_cents == Some(0) {
            return Err(DomainError::validation("price must be positive"));
        }

        Ok(Product {
            id: product.id,
            name: self.name.clone().unwrap_or_else(|| product.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| product.description.clone()),
            price_cents: self.price_cents.unwrap_or(product.price_cents),
            stock: self.stock.unwrap_or(product.stock),
            version: product.version + 1,
            updated_at: now,
        })
    }
}

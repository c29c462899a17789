use serde::{Deserialize, Serialize};

use stockflow_core::{DomainError, DomainResult, OrderId, ProductId};

/// An order request appended to the order log.
///
/// Immutable once appended. Identified uniquely by `order_id` independent of
/// log position: a producer retrying an append may duplicate the payload at a
/// fresh position, and the processor deduplicates by `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl OrderRequest {
    /// Build a validated request (`quantity` must be positive).
    pub fn new(order_id: OrderId, product_id: ProductId, quantity: u32) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self {
            order_id,
            product_id,
            quantity,
        })
    }
}
